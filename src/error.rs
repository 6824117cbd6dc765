//! Failure kinds of a proxied exchange.
//!
//! Every failure ends the client session. [`ProxyError::status`] says what the
//! client sees before the connection is closed.

use std::io;
use std::time::Duration;

use crate::http::parser::ParseError;
use crate::http::response::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] ParseError),

    #[error("error reading request: {0}")]
    ClientRead(#[source] io::Error),

    #[error("timed out reading request")]
    ClientTimeout,

    #[error("no backend configured for host {0:?}")]
    NoRoute(String),

    #[error("failed to connect to backend {addr}: {source}")]
    BackendUnreachable {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("backend {addr} failed: {source}")]
    BackendIo {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("backend {addr} sent an invalid response: {source}")]
    BackendResponse {
        addr: String,
        #[source]
        source: ParseError,
    },

    #[error("backend {addr} did not respond within {timeout:?}")]
    BackendTimeout { addr: String, timeout: Duration },

    #[error("error writing response: {0}")]
    ClientWrite(#[source] io::Error),
}

impl ProxyError {
    /// The error page status for this failure, or `None` when the session
    /// ends without writing anything.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProxyError::MalformedRequest(_) => Some(StatusCode::BadRequest),
            ProxyError::ClientWrite(_) => None,
            _ => Some(StatusCode::ServiceUnavailable),
        }
    }
}
