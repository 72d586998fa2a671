//! Client-side synchronization layer for the crowdfunding platform's
//! real-time notification and friend-request feeds.
//!
//! The crate merges three input sources into consistent, deduplicated,
//! recency-ordered collections: paginated REST backfill, push-channel live
//! events, and optimistic local user actions. Presentation layers consume
//! the collections through a watch-based subscription contract and never
//! observe a hard error; transient backend failures are logged and absorbed.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod session;

pub use config::ClientConfig;
pub use session::FeedSession;
