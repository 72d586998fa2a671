//! Domain ports defining the edges of the hexagon.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (the REST backend and the push-channel transport). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants instead of leaking transport-library types into the domain.

pub(crate) mod macros;
pub mod push_transport;
pub mod rest;

pub use self::push_transport::{
    FixturePushTransport, OutboundFrame, PushFrame, PushTransport, PushTransportError,
};
pub use self::rest::{FriendRequestGateway, GatewayError, NotificationGateway};
