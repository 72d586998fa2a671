//! Driven adapters for backend ports.

pub mod http;
pub mod push;
