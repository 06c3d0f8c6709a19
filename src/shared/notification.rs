//! Notification Data Structures
//!
//! Server-originated notifications, their user-facing settings and the REST
//! envelopes used to fetch and update them.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Category of a notification
///
/// Hyphenated spellings (`course-update`) are accepted on input. Names this
/// client does not know decode as `Unknown` instead of failing the payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Request,
    Accept,
    Message,
    Mention,
    Reaction,
    Invite,
    #[serde(alias = "course-update")]
    CourseUpdate,
    #[serde(alias = "task-assigned")]
    TaskAssigned,
    #[serde(alias = "task-due")]
    TaskDue,
    Achievement,
    System,
    #[serde(other)]
    Unknown,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 11] = [
        NotificationKind::Request,
        NotificationKind::Accept,
        NotificationKind::Message,
        NotificationKind::Mention,
        NotificationKind::Reaction,
        NotificationKind::Invite,
        NotificationKind::CourseUpdate,
        NotificationKind::TaskAssigned,
        NotificationKind::TaskDue,
        NotificationKind::Achievement,
        NotificationKind::System,
    ];
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Button or link attached to a notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationAction {
    pub label: String,
    /// Action identifier understood by the UI (e.g. `accept`, `open`)
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    pub created_at: DateTime<Utc>,
}

/// Unrecognised priorities fall back to `Normal`
fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(Priority::deserialize(raw).unwrap_or_default())
}

/// Daily window during which non-urgent alerts are held back
///
/// A window whose `start` is after its `end` wraps past midnight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl QuietHours {
    /// Whether `time` falls inside an enabled window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if !self.enabled || self.start == self.end {
            return false;
        }
        if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// User notification preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Per-category toggles; categories absent from the map are enabled
    #[serde(default)]
    pub categories: BTreeMap<NotificationKind, bool>,
    #[serde(default = "enabled")]
    pub push_enabled: bool,
    #[serde(default)]
    pub email_enabled: bool,
    #[serde(default)]
    pub quiet_hours: QuietHours,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            categories: NotificationKind::ALL.iter().map(|kind| (*kind, true)).collect(),
            push_enabled: true,
            email_enabled: false,
            quiet_hours: QuietHours::default(),
        }
    }
}

impl NotificationSettings {
    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        self.categories.get(&kind).copied().unwrap_or(true)
    }

    /// Whether `notification` should raise an alert at local time `now`
    ///
    /// Urgent notifications ignore quiet hours but not the category toggle.
    pub fn allows_alert(&self, notification: &Notification, now: NaiveTime) -> bool {
        if !self.push_enabled || !self.is_enabled(notification.kind) {
            return false;
        }
        notification.priority == Priority::Urgent || !self.quiet_hours.contains(now)
    }

    /// Return a copy with `patch` applied
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        for (kind, on) in &patch.categories {
            next.categories.insert(*kind, *on);
        }
        if let Some(push) = patch.push_enabled {
            next.push_enabled = push;
        }
        if let Some(email) = patch.email_enabled {
            next.email_enabled = email;
        }
        if let Some(quiet) = patch.quiet_hours {
            next.quiet_hours = quiet;
        }
        next
    }
}

/// Partial settings update; unset fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<NotificationKind, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
}

impl SettingsPatch {
    pub fn category(mut self, kind: NotificationKind, on: bool) -> Self {
        self.categories.insert(kind, on);
        self
    }

    pub fn quiet_hours(mut self, quiet: QuietHours) -> Self {
        self.quiet_hours = Some(quiet);
        self
    }

    pub fn push_enabled(mut self, on: bool) -> Self {
        self.push_enabled = Some(on);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &SettingsPatch::default()
    }
}

/// Response of `GET /notifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Response of `GET /notifications/unread-count`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u32,
}
