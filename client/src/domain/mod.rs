//! Domain entities and services for the synchronization layer.
//!
//! Purpose: define the strongly typed feed items, the generic reconciling
//! store, the two feed instances, and the push-channel state machine. Keep
//! invariants unrepresentable by construction where possible (monotonic read
//! flags, retired identifiers) and document serialisation contracts (serde)
//! in each type's Rustdoc.
//!
//! Public surface:
//! - `Notification` / `FriendRequest` — feed item entities.
//! - `ReconcilingStore` — generic dedup/ordering/backfill collection.
//! - `NotificationFeed` / `FriendRequestFeed` — the two store instances.
//! - `PushChannelClient` / `ChannelStateMachine` — push channel supervision.
//! - `ports` — driven-port traits for REST and transport adapters.

pub mod channel;
pub mod friend_request;
pub mod friend_request_feed;
pub mod notification;
pub mod notification_feed;
pub mod ports;
pub mod store;
pub mod user;
pub(crate) mod wire;

pub use self::channel::{ChannelStateMachine, LiveEvent, PushChannelClient};
pub use self::friend_request::{FriendRequest, FriendRequestId, FriendRequestStatus, UserRef};
pub use self::friend_request_feed::FriendRequestFeed;
pub use self::notification::{Notification, NotificationEvent, NotificationId, NotificationKind};
pub use self::notification_feed::NotificationFeed;
pub use self::store::{FeedItem, ReconcilingStore, StoreSnapshot};
pub use self::user::UserId;
