//! HTTP/1.x protocol handling for the proxy.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-client session implementing the proxy state machine
//! - **`parser`**: Parses requests and responses, including body framing
//! - **`headers`**: Ordered, case-preserving header storage
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes messages and writes them to a socket
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the next request (read deadline armed)
//!        └──────┬──────┘
//!               │ Request received
//!               ▼
//!        ┌──────────────────┐
//!        │    Routing       │ ← Match Host against the pattern table
//!        └──────┬───────────┘
//!               │ Backend address
//!               ▼
//!        ┌──────────────────┐
//!        │    Dialing       │ ← Reuse or open the backend connection
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │   Forwarding     │ ← Send request, await response (read deadline armed)
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │    Relaying      │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```
//!
//! Any failure moves the session to `Failed`, which writes an error page
//! when the failure calls for one and then closes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mist::http::connection::Connection;
//! use mist::proxy::HostMatcher;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut matcher = HostMatcher::new();
//!     matcher.add_mapping("*.example.com", "127.0.0.1:9000");
//!     let matcher = Arc::new(matcher);
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let matcher = Arc::clone(&matcher);
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, matcher, Duration::from_secs(5));
//!             let _ = conn.run().await;
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
