//! Mist - host-based HTTP reverse proxy
//!
//! Routes each HTTP/1.x request to a backend chosen by its Host header and
//! relays the backend's response over the same client connection.

pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod server;
