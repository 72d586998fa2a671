//! Notification entity and the live-event boundary payload.
//!
//! Wire contract: camelCase JSON with the category under the `type` key.
//! REST backfill rows carry `id` and `timestamp`; push payloads may omit
//! both, in which case the client synthesises them (see
//! [`NotificationEvent::into_notification`]).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::store::FeedItem;
use super::wire;

/// Unique notification identifier.
///
/// The backend emits identifiers as either JSON numbers or strings; both
/// decode to the normalised string form. Client-synthesised identifiers are
/// random UUIDs, so they never collide with backend-issued ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(#[serde(deserialize_with = "wire::flexible_id")] String);

impl NotificationId {
    /// Wrap a backend-issued identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh client-side identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification category.
///
/// Unrecognised categories decode as [`NotificationKind::System`] so a new
/// backend category never fails the whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A donation landed on one of the user's campaigns.
    Donation,
    /// Volunteer activity on a campaign the user follows.
    Volunteer,
    /// A campaign milestone was reached.
    Milestone,
    /// Campaign lifecycle updates (approval, closure, moderation).
    Campaign,
    /// Someone commented on the user's campaign or donation.
    Comment,
    /// Platform announcements and everything unrecognised.
    #[default]
    #[serde(other)]
    System,
}

/// A single notification in the feed.
///
/// ## Invariants
/// - `read` transitions `false → true` only; the field is private and the
///   sole mutator is [`Notification::mark_read`].
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use client::domain::{Notification, NotificationId, NotificationKind};
///
/// let mut notification = Notification::new(
///     NotificationId::new("n-1"),
///     NotificationKind::Donation,
///     "New donation",
///     "Alex donated 25 EUR",
///     Utc::now(),
/// );
/// assert!(!notification.is_read());
/// assert!(notification.mark_read());
/// assert!(!notification.mark_read(), "already read is a no-op");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    id: NotificationId,
    #[serde(rename = "type", default)]
    kind: NotificationKind,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    read: bool,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl Notification {
    /// Construct an unread notification.
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            read: false,
            timestamp,
            action_url: None,
            metadata: None,
        }
    }

    /// Attach a navigation target for the rendered notification.
    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Attach free-form backend metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Notification category.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Short headline.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Body text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Whether the user has seen this notification.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// Server event time, or the client receive time for synthesised items.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Navigation target, when the backend supplied one.
    #[must_use]
    pub fn action_url(&self) -> Option<&str> {
        self.action_url.as_deref()
    }

    /// Free-form backend metadata, when supplied.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// Flip the read flag to `true`.
    ///
    /// Returns `true` when the flag actually changed so callers can skip the
    /// network confirmation for repeated invocations. The flag never
    /// transitions back to `false`.
    pub const fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}

impl FeedItem for Notification {
    type Id = NotificationId;

    fn id(&self) -> NotificationId {
        self.id.clone()
    }
}

/// Push-channel notification payload.
///
/// Matches [`Notification`] minus `id` and `timestamp`, both of which the
/// backend may omit from live events. Every field decodes defensively so a
/// partial payload degrades to defaults instead of being dropped wholesale.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(default)]
    id: Option<NotificationId>,
    #[serde(rename = "type", default)]
    kind: NotificationKind,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    read: bool,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    action_url: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

impl NotificationEvent {
    /// Promote the payload to a [`Notification`], synthesising the
    /// identifier and timestamp when the backend omitted them.
    #[must_use]
    pub fn into_notification(self, received_at: DateTime<Utc>) -> Notification {
        Notification {
            id: self.id.unwrap_or_else(NotificationId::random),
            kind: self.kind,
            title: self.title,
            message: self.message,
            read: self.read,
            timestamp: self.timestamp.unwrap_or(received_at),
            action_url: self.action_url,
            metadata: self.metadata,
        }
    }
}
