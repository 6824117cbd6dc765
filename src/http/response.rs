use crate::http::headers::{self, Headers};

/// HTTP status codes the proxy generates itself.
///
/// Responses relayed from a backend keep whatever code and reason phrase the
/// backend sent; this enum only covers the synthetic ones:
/// - `BadRequest` (400): Malformed request
/// - `ServiceUnavailable` (503): Routing or backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 400 Bad Request
    BadRequest,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use mist::http::response::StatusCode;
    /// assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    /// assert_eq!(StatusCode::ServiceUnavailable.as_u16(), 503);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::BadRequest => 400,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::BadRequest => "Bad Request",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Represents a complete HTTP response.
///
/// Either parsed from a backend or synthesized by the proxy. `body` holds the
/// body exactly as framed on the wire.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP version of the status line
    pub version: String,
    /// Numeric status code
    pub status: u16,
    /// Reason phrase, possibly empty
    pub reason: String,
    /// Response headers in arrival order
    pub headers: Headers,
    /// Framed response body
    pub body: Vec<u8>,
    /// The body was delimited by the sender closing its connection, so the
    /// connection cannot carry another message.
    pub close_delimited: bool,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::BadRequest)
///     .header("Content-Type", "text/html")
///     .body(b"<html></html>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    version: String,
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Sets the protocol version of the status line.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Automatically adds the Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        self.headers
            .insert_if_absent("Content-Length", self.body.len().to_string());

        Response {
            version: self.version,
            status: self.status.as_u16(),
            reason: self.status.reason_phrase().to_string(),
            headers: self.headers,
            body: self.body,
            close_delimited: false,
        }
    }
}

impl Response {
    /// Whether the connection this response arrived on may carry another
    /// exchange.
    pub fn keep_alive(&self) -> bool {
        !self.close_delimited && headers::is_persistent(&self.version, &self.headers)
    }

    /// Interim 1xx responses precede the final one. `101 Switching
    /// Protocols` is final.
    pub fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    /// Marks the response as the last one on its connection.
    ///
    /// Adds `Connection: close` when it is not already listed; an existing
    /// `keep-alive` value is replaced. Does nothing when `close` is false.
    pub fn set_close(&mut self, close: bool) {
        if close && !self.headers.has_token("Connection", "close") {
            self.headers.insert("Connection", "close");
        }
    }
}
