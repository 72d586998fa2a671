//! REST backfill and mutation ports.
//!
//! The backend exposes paginated reads plus fire-and-forget mutations; both
//! gateways return [`GatewayError`] so the feeds can log failures uniformly
//! without inspecting adapter internals. Mutation confirmations carry no
//! body, so the operations resolve to `()` on success. Page exhaustion is
//! judged from the returned row count alone; totals come from dedicated
//! endpoints where the domain needs them.

use async_trait::async_trait;

use super::macros::define_port_error;
use crate::domain::friend_request::{FriendRequest, FriendRequestId};
use crate::domain::notification::{Notification, NotificationId};

define_port_error! {
    /// Errors surfaced by REST gateway adapters.
    pub enum GatewayError {
        /// Connection-level failure (DNS, TLS, reset, 5xx).
        Transport { message: String } =>
            "backend request failed: {message}",
        /// The request or the server exceeded its deadline.
        Timeout { message: String } =>
            "backend request timed out: {message}",
        /// The backend throttled this client.
        RateLimited { message: String } =>
            "backend rate limited the request: {message}",
        /// The request was rejected as malformed or unauthorised.
        InvalidRequest { message: String } =>
            "backend rejected the request: {message}",
        /// The response body did not decode into the expected shape.
        Decode { message: String } =>
            "backend response failed to decode: {message}",
    }
}

/// Port for notification backfill and read-state confirmation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Fetch one page of notifications, newest first within the page,
    /// in the order the backend returned them.
    async fn fetch_page(&self, page: u32, limit: usize)
    -> Result<Vec<Notification>, GatewayError>;

    /// Confirm a single notification as read.
    async fn mark_read(&self, id: &NotificationId) -> Result<(), GatewayError>;

    /// Confirm every notification as read.
    async fn mark_all_read(&self) -> Result<(), GatewayError>;
}

/// Port for friend-request backfill, the independent pending counter, and
/// accept/decline confirmations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FriendRequestGateway: Send + Sync {
    /// Fetch one page of friend requests in the order the backend returned
    /// them.
    async fn fetch_page(&self, page: u32, limit: usize)
    -> Result<Vec<FriendRequest>, GatewayError>;

    /// Fetch the total pending count from the dedicated count endpoint.
    async fn fetch_pending_count(&self) -> Result<u64, GatewayError>;

    /// Confirm acceptance of a friend request.
    async fn accept(&self, id: &FriendRequestId) -> Result<(), GatewayError>;

    /// Confirm declination of a friend request.
    async fn decline(&self, id: &FriendRequestId) -> Result<(), GatewayError>;
}
