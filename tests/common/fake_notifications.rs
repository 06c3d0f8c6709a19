//! In-memory notification store
//!
//! Behaves like the REST store: writes change the server-side list, reads
//! return it with a consistent unread count.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use studysync::client::gateway::NotificationApi;
use studysync::client::{ClientError, ClientResult};
use studysync::shared::notification::{
    ListNotificationsResponse, Notification, NotificationKind, NotificationSettings, Priority,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyCall {
    List,
    UnreadCount,
    MarkRead(String),
    MarkAllRead,
    Delete(String),
    GetSettings,
    UpdateSettings(NotificationSettings),
}

#[derive(Default)]
pub struct FakeNotifications {
    store: Mutex<Vec<Notification>>,
    settings: Mutex<NotificationSettings>,
    calls: Mutex<Vec<NotifyCall>>,
    pub fail_mark_read: AtomicBool,
    pub fail_mark_all: AtomicBool,
    pub fail_settings: AtomicBool,
    fail_delete: Mutex<HashSet<String>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    mark_all_gate: Mutex<Option<Arc<Notify>>>,
    /// Signalled whenever a list request reaches the server
    pub list_started: Notify,
    /// Signalled whenever a mark-all-read request reaches the server
    pub mark_all_started: Notify,
}

impl FakeNotifications {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_store(items: Vec<Notification>) -> Arc<Self> {
        let fake = Self::default();
        *fake.store.lock().unwrap() = items;
        Arc::new(fake)
    }

    /// Server-side creation, as happens right before a push
    pub fn insert(&self, notification: Notification) {
        let mut store = self.store.lock().unwrap();
        store.retain(|n| n.id != notification.id);
        store.push(notification);
    }

    /// Flip a read flag on the server only, as another device would
    pub fn set_read(&self, id: &str) {
        for n in self.store.lock().unwrap().iter_mut().filter(|n| n.id == id) {
            n.read = true;
        }
    }

    pub fn stored(&self) -> Vec<Notification> {
        self.store.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.fail_delete.lock().unwrap().insert(id.to_string());
    }

    /// Hold every following list request until the gate is notified
    pub fn hold_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold every following mark-all-read request until the gate is notified
    pub fn hold_mark_all(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.mark_all_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn release_list(&self) {
        *self.list_gate.lock().unwrap() = None;
    }

    fn record(&self, call: NotifyCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(flag: &AtomicBool) -> ClientResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(ClientError::transport(Some(503), "503 Service Unavailable"));
        }
        Ok(())
    }
}

/// Notification created at 09:`minute` on a fixed day
pub fn notification(id: &str, minute: u32, title: &str) -> Notification {
    Notification {
        id: id.to_string(),
        kind: NotificationKind::Message,
        title: title.to_string(),
        body: format!("body of {}", id),
        priority: Priority::Normal,
        read: false,
        actions: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2024, 9, 2, 9, minute, 0).unwrap(),
    }
}

#[async_trait]
impl NotificationApi for FakeNotifications {
    async fn list_notifications(&self) -> ClientResult<ListNotificationsResponse> {
        self.record(NotifyCall::List);
        self.list_started.notify_one();
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let notifications = self.stored();
        let unread_count = notifications.iter().filter(|n| !n.read).count() as u32;
        Ok(ListNotificationsResponse {
            notifications,
            unread_count,
        })
    }

    async fn unread_count(&self) -> ClientResult<u32> {
        self.record(NotifyCall::UnreadCount);
        Ok(self.stored().iter().filter(|n| !n.read).count() as u32)
    }

    async fn mark_read(&self, id: &str) -> ClientResult<()> {
        self.record(NotifyCall::MarkRead(id.to_string()));
        Self::check(&self.fail_mark_read)?;
        for n in self.store.lock().unwrap().iter_mut().filter(|n| n.id == id) {
            n.read = true;
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> ClientResult<()> {
        self.record(NotifyCall::MarkAllRead);
        self.mark_all_started.notify_one();
        let gate = self.mark_all_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Self::check(&self.fail_mark_all)?;
        for n in self.store.lock().unwrap().iter_mut() {
            n.read = true;
        }
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> ClientResult<()> {
        self.record(NotifyCall::Delete(id.to_string()));
        if self.fail_delete.lock().unwrap().contains(id) {
            return Err(ClientError::transport(Some(500), "500 Internal Server Error"));
        }
        self.store.lock().unwrap().retain(|n| n.id != id);
        Ok(())
    }

    async fn get_settings(&self) -> ClientResult<NotificationSettings> {
        self.record(NotifyCall::GetSettings);
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn update_settings(&self, settings: &NotificationSettings) -> ClientResult<()> {
        self.record(NotifyCall::UpdateSettings(settings.clone()));
        Self::check(&self.fail_settings)?;
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}
