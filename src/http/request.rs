use crate::http::headers::{self, Headers};

/// HTTP request methods.
///
/// The common methods get their own variant; any other syntactically valid
/// method token is carried through as `Extension` so it can be forwarded
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other method token, e.g. `PROPFIND`
    Extension(String),
}

/// Represents a parsed HTTP request from a client.
///
/// `body` holds the message body exactly as framed on the wire: for a
/// chunked request that includes the chunk-size lines and trailers.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent, origin-form (`/index.html`) or
    /// absolute-form (`http://host/index.html`)
    pub path: String,
    /// HTTP version (`HTTP/1.0` or `HTTP/1.1`)
    pub version: String,
    /// Request headers in arrival order
    pub headers: Headers,
    /// Framed request body
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Method names are case-sensitive. Unknown names are accepted as
    /// `Extension` when they are a valid token; anything else is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// # use mist::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("MKCOL"), Some(Method::Extension("MKCOL".into())));
    /// assert_eq!(Method::from_str("GE T"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        let method = match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            _ if is_token(s) => Method::Extension(s.to_string()),
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Extension(name) => name,
        }
    }
}

/// RFC 9110 `token`: one or more tchar.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    ///
    /// # Returns
    ///
    /// `Some(&str)` with the first matching value, `None` otherwise.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// Determines whether the client wants the connection kept open after
    /// the response.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent;
    /// HTTP/1.0 closes unless `Connection: keep-alive` is sent.
    pub fn keep_alive(&self) -> bool {
        headers::is_persistent(&self.version, &self.headers)
    }

    /// The host this request is addressed to, lowercased and without any
    /// port.
    ///
    /// An absolute-form target (`GET http://a.example/ HTTP/1.1`) takes
    /// precedence over the Host header, as RFC 9112 requires. The Host value
    /// is otherwise matched as sent: only a trailing `:port` is removed.
    /// Returns `None` when neither names a host.
    pub fn host(&self) -> Option<String> {
        if let Ok(target) = url::Url::parse(&self.path) {
            if let Some(host) = target.host_str() {
                return Some(host.to_string());
            }
        }

        let raw = self.header("Host")?.trim();
        if raw.is_empty() {
            return None;
        }

        Some(strip_port(raw).to_ascii_lowercase())
    }
}

/// Removes a trailing `:port` from a Host value.
///
/// The port must be all digits, and a bracketed IPv6 literal keeps its inner
/// colons: `[::1]:8080` becomes `[::1]`, `[::1]` is left alone.
pub fn strip_port(host: &str) -> &str {
    let Some((name, port)) = host.rsplit_once(':') else {
        return host;
    };
    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return host;
    }
    if name.starts_with('[') && !name.ends_with(']') {
        return host;
    }
    name
}
