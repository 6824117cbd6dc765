//! Reverse proxy functionality
//!
//! Host routing, backend connections and the error pages shown when an
//! exchange cannot be completed.

pub mod error_page;
pub mod matcher;
pub mod upstream;

pub use error_page::error_response;
pub use matcher::HostMatcher;
pub use upstream::BackendConnection;
