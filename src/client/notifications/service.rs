//! Notification Service
//!
//! Owns the cached notification list, the unread counter and the user's
//! settings. Entries reach the list from two sources that race each other:
//! REST snapshots and push events. Both go through the reconciliation
//! primitives, so the list converges to the same newest-first, duplicate-free
//! state whichever arrives first.
//!
//! Read toggles and settings updates are applied locally first and rolled
//! back if the server rejects them. The unread counter never goes below zero.

use crate::client::error::ClientResult;
use crate::client::gateway::NotificationApi;
use crate::client::sync::{dedup_merge, merge_snapshot, MergeOutcome, TokenSlot};
use crate::shared::event::PushEvent;
use crate::shared::notification::{Notification, NotificationSettings, SettingsPatch};
use chrono::NaiveTime;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Result of a snapshot fetch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The merged list was applied; carries its length
    Applied(usize),
    /// A newer fetch took over
    Superseded,
}

#[derive(Debug, Default)]
struct NotificationState {
    items: Vec<Notification>,
    unread: u32,
    settings: NotificationSettings,
    /// Ids delivered by push since the last applied snapshot
    pushed: HashSet<String>,
    snapshot_slot: TokenSlot,
    /// Bumped by every applied snapshot
    generation: u64,
}

/// Notification synchronization service for one session
pub struct NotificationService {
    api: Arc<dyn NotificationApi>,
    state: RwLock<NotificationState>,
}

impl NotificationService {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self {
            api,
            state: RwLock::new(NotificationState::default()),
        }
    }

    // ========== Accessors ==========

    /// Newest-first copy of the list
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.items.clone()
    }

    pub async fn unread_count(&self) -> u32 {
        self.state.read().await.unread
    }

    pub async fn settings(&self) -> NotificationSettings {
        self.state.read().await.settings.clone()
    }

    /// Whether `notification` should raise an alert at local time `now`
    pub async fn should_alert(&self, notification: &Notification, now: NaiveTime) -> bool {
        self.state
            .read()
            .await
            .settings
            .allows_alert(notification, now)
    }

    // ========== Synchronization ==========

    /// Fetch the authoritative list and merge in entries pushed meanwhile
    pub async fn fetch_snapshot(&self) -> ClientResult<SnapshotOutcome> {
        let token = self.state.write().await.snapshot_slot.issue();

        let result = tokio::select! {
            _ = token.cancelled() => return Ok(SnapshotOutcome::Superseded),
            result = self.api.list_notifications() => result,
        };

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if !state.snapshot_slot.is_current(&token) {
            tracing::debug!("[NOTIFY] dropping superseded snapshot");
            return Ok(SnapshotOutcome::Superseded);
        }
        state.snapshot_slot.release(&token);
        let response = result?;

        let server_unread: HashMap<String, bool> = response
            .notifications
            .iter()
            .map(|n| (n.id.clone(), !n.read))
            .collect();
        let merged = merge_snapshot(response.notifications, &state.items, &state.pushed);

        // Start from the server's count and correct it for every entry whose
        // merged copy disagrees with the snapshot (or is missing from it).
        let delta: i64 = merged
            .iter()
            .map(|n| {
                let local = i64::from(!n.read);
                let server = server_unread.get(&n.id).copied().map(i64::from).unwrap_or(0);
                local - server
            })
            .sum();
        let unread = (i64::from(response.unread_count) + delta).clamp(0, i64::from(u32::MAX));

        tracing::info!(
            "[NOTIFY] snapshot applied: {} entries ({} from push), {} unread",
            merged.len(),
            merged.iter().filter(|n| !server_unread.contains_key(&n.id)).count(),
            unread
        );
        state.items = merged;
        state.unread = u32::try_from(unread).unwrap_or(u32::MAX);
        state.pushed.clear();
        state.generation += 1;
        Ok(SnapshotOutcome::Applied(state.items.len()))
    }

    /// Count-only refresh for badges
    pub async fn fetch_unread_count(&self) -> ClientResult<u32> {
        let count = self.api.unread_count().await?;
        self.state.write().await.unread = count;
        tracing::debug!("[NOTIFY] unread count refreshed: {}", count);
        Ok(count)
    }

    /// Merge one pushed notification
    pub async fn on_push_event(&self, notification: Notification) -> MergeOutcome<Notification> {
        let id = notification.id.clone();
        let unread = !notification.read;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.pushed.insert(id.clone());
        let outcome = dedup_merge(&mut state.items, notification);
        match &outcome {
            MergeOutcome::Inserted => {
                if unread {
                    state.unread = state.unread.saturating_add(1);
                }
                tracing::info!("[NOTIFY] new notification {}", id);
            }
            MergeOutcome::Replaced(previous) => {
                match (previous.read, unread) {
                    (true, true) => state.unread = state.unread.saturating_add(1),
                    (false, false) => state.unread = state.unread.saturating_sub(1),
                    _ => {}
                }
                tracing::debug!("[NOTIFY] notification {} replaced by newer push", id);
            }
            MergeOutcome::Ignored => {
                tracing::debug!("[NOTIFY] duplicate push for {} ignored", id);
            }
        }
        outcome
    }

    /// Apply push events until the channel closes; returns how many changed the list
    pub async fn consume(&self, mut events: mpsc::Receiver<PushEvent>) -> usize {
        let mut applied = 0;
        while let Some(event) = events.recv().await {
            match event.notification() {
                Ok(Some(notification)) => {
                    if self.on_push_event(notification).await != MergeOutcome::Ignored {
                        applied += 1;
                    }
                }
                Ok(None) => {
                    tracing::debug!("[NOTIFY] ignoring '{}' event", event.event_type.name());
                }
                Err(e) => tracing::warn!("[NOTIFY] malformed push payload: {}", e),
            }
        }
        tracing::info!("[NOTIFY] push channel closed after {} updates", applied);
        applied
    }

    // ========== Read state ==========

    /// Mark one notification read; a second call on the same entry is a no-op
    pub async fn mark_read(&self, id: &str) -> ClientResult<()> {
        let (flipped, generation) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let flipped = match state.items.iter_mut().find(|n| n.id == id) {
                Some(n) if n.read => return Ok(()),
                Some(n) => {
                    n.read = true;
                    state.unread = state.unread.saturating_sub(1);
                    true
                }
                None => false,
            };
            (flipped, state.generation)
        };

        if let Err(err) = self.api.mark_read(id).await {
            tracing::error!("[NOTIFY] mark_read {} failed: {}", id, err);
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            // A snapshot applied meanwhile already carries the server's flag
            if flipped && state.generation == generation {
                if let Some(n) = state.items.iter_mut().find(|n| n.id == id && n.read) {
                    n.read = false;
                    state.unread = state.unread.saturating_add(1);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    pub async fn mark_all_read(&self) -> ClientResult<()> {
        let (flipped, previous_unread, generation) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let flipped: HashSet<String> = state
                .items
                .iter_mut()
                .filter(|n| !n.read)
                .map(|n| {
                    n.read = true;
                    n.id.clone()
                })
                .collect();
            (flipped, std::mem::take(&mut state.unread), state.generation)
        };

        if let Err(err) = self.api.mark_all_read().await {
            tracing::error!("[NOTIFY] mark_all_read failed: {}", err);
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            if state.generation != generation {
                tracing::debug!("[NOTIFY] snapshot applied meanwhile, nothing to restore");
                return Err(err);
            }
            let mut restored = 0u32;
            for n in state.items.iter_mut().filter(|n| n.read && flipped.contains(&n.id)) {
                n.read = false;
                restored += 1;
            }
            // Unread entries the counter knew about but the list never held
            let unlisted = previous_unread.saturating_sub(u32::try_from(flipped.len()).unwrap_or(u32::MAX));
            state.unread = state.unread.saturating_add(restored).saturating_add(unlisted);
            return Err(err);
        }
        tracing::info!("[NOTIFY] marked {} notifications read", flipped.len());
        Ok(())
    }

    // ========== Deletion ==========

    /// Delete remotely, then drop the local entry
    pub async fn delete_notification(&self, id: &str) -> ClientResult<()> {
        self.api.delete_notification(id).await?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(pos) = state.items.iter().position(|n| n.id == id) {
            let removed = state.items.remove(pos);
            if !removed.read {
                state.unread = state.unread.saturating_sub(1);
            }
        }
        state.pushed.remove(id);
        Ok(())
    }

    /// Delete every cached notification one by one
    ///
    /// Stops at the first failure; entries deleted before it stay removed.
    /// Returns the number deleted.
    pub async fn clear_all(&self) -> ClientResult<usize> {
        let ids: Vec<String> = self
            .state
            .read()
            .await
            .items
            .iter()
            .map(|n| n.id.clone())
            .collect();

        let mut deleted = 0;
        for id in &ids {
            if let Err(err) = self.delete_notification(id).await {
                tracing::error!(
                    "[NOTIFY] clear_all stopped after {} of {}: {}",
                    deleted,
                    ids.len(),
                    err
                );
                return Err(err);
            }
            deleted += 1;
        }
        tracing::info!("[NOTIFY] cleared {} notifications", deleted);
        Ok(deleted)
    }

    // ========== Settings ==========

    /// `GET /notifications/settings`
    pub async fn load_settings(&self) -> ClientResult<NotificationSettings> {
        let settings = self.api.get_settings().await?;
        self.state.write().await.settings = settings.clone();
        Ok(settings)
    }

    /// Merge `patch` and persist; the previous settings return on failure
    pub async fn update_settings(&self, patch: SettingsPatch) -> ClientResult<NotificationSettings> {
        let (previous, updated) = {
            let mut state = self.state.write().await;
            let previous = state.settings.clone();
            let updated = previous.merged(&patch);
            state.settings = updated.clone();
            (previous, updated)
        };

        if let Err(err) = self.api.update_settings(&updated).await {
            tracing::error!("[NOTIFY] settings update failed: {}", err);
            let mut state = self.state.write().await;
            // A later update may have replaced ours meanwhile
            if state.settings == updated {
                state.settings = previous;
            }
            return Err(err);
        }
        tracing::info!("[NOTIFY] settings updated");
        Ok(updated)
    }
}
