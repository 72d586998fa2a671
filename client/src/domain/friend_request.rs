//! Friend request entity.
//!
//! Wire contract: camelCase JSON. The pending feed only ever holds requests
//! with `status == "pending"`; resolved requests are retired locally and the
//! store's tombstone set keeps them from reappearing through backfill.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::store::FeedItem;
use super::user::UserId;
use super::wire;

/// Unique friend request identifier, normalised to string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FriendRequestId(#[serde(deserialize_with = "wire::flexible_id")] String);

impl FriendRequestId {
    /// Wrap a backend-issued identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for FriendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    /// Awaiting a decision from the recipient.
    Pending,
    /// Accepted by the recipient.
    Accepted,
    /// Declined by the recipient.
    Declined,
}

impl FriendRequestStatus {
    /// Whether the request still awaits a decision.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Minimal reference to the user who sent the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Sender's user identifier.
    pub id: UserId,
    /// Sender's display name; defaults to empty on partial payloads.
    #[serde(default)]
    pub display_name: String,
    /// Sender's avatar location, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserRef {
    /// Construct a reference with a display name and no avatar.
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// A friend request as held by the pending feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    friend_request_id: FriendRequestId,
    status: FriendRequestStatus,
    sender: UserRef,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Construct a pending request.
    #[must_use]
    pub const fn new(id: FriendRequestId, sender: UserRef, created_at: DateTime<Utc>) -> Self {
        Self {
            friend_request_id: id,
            status: FriendRequestStatus::Pending,
            sender,
            created_at,
            updated_at: created_at,
        }
    }

    /// Unique identifier.
    #[must_use]
    pub const fn id(&self) -> &FriendRequestId {
        &self.friend_request_id
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn status(&self) -> FriendRequestStatus {
        self.status
    }

    /// Whether the request still awaits a decision.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// The user who sent the request.
    #[must_use]
    pub const fn sender(&self) -> &UserRef {
        &self.sender
    }

    /// When the request was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the request last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl FeedItem for FriendRequest {
    type Id = FriendRequestId;

    fn id(&self) -> FriendRequestId {
        self.friend_request_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_camel_case_row_with_numeric_id() {
        let request: FriendRequest = serde_json::from_value(json!({
            "friendRequestId": 31,
            "status": "pending",
            "sender": { "id": 9, "displayName": "Robin" },
            "createdAt": "2026-02-01T08:00:00Z",
            "updatedAt": "2026-02-01T08:00:00Z"
        }))
        .expect("row decodes");

        assert_eq!(request.id().as_str(), "31");
        assert!(request.is_pending());
        assert_eq!(request.sender().display_name, "Robin");
        assert_eq!(request.sender().id, UserId::new(9));
    }

    #[test]
    fn tolerates_partial_sender_payload() {
        let request: FriendRequest = serde_json::from_value(json!({
            "friendRequestId": "fr-2",
            "status": "accepted",
            "sender": { "id": 4 }
        }))
        .expect("partial row decodes");

        assert!(!request.is_pending());
        assert_eq!(request.sender().display_name, "");
        assert!(request.sender().avatar_url.is_none());
    }

    #[test]
    fn serialises_camel_case() {
        let created = Utc
            .with_ymd_and_hms(2026, 2, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp");
        let request = FriendRequest::new(
            FriendRequestId::new("fr-7"),
            UserRef::new(UserId::new(12), "Sam"),
            created,
        );

        let value = serde_json::to_value(&request).expect("serialises");
        assert_eq!(
            value,
            json!({
                "friendRequestId": "fr-7",
                "status": "pending",
                "sender": { "id": 12, "displayName": "Sam" },
                "createdAt": "2026-02-01T08:00:00Z",
                "updatedAt": "2026-02-01T08:00:00Z"
            })
        );
    }
}
