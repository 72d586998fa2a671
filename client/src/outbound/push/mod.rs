//! WebSocket push-channel adapter.

mod socket;

pub use socket::WebSocketTransport;
