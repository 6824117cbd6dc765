//! Synthetic error responses.

use std::borrow::Cow;
use std::fmt::Display;

use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Status line version used when no request could be parsed.
pub const DEFAULT_VERSION: &str = "HTTP/1.0";

/// Builds the error page response for a failed exchange.
///
/// The status line echoes the version of `request` so the client can read
/// the reply; without a request it falls back to [`DEFAULT_VERSION`]. Error
/// pages always close the connection.
pub fn error_response(request: Option<&Request>, status: StatusCode, payload: impl Display) -> Response {
    let body = render_error_page(&payload.to_string());
    let version = request.map_or(DEFAULT_VERSION, |r| r.version.as_str());

    ResponseBuilder::new(status)
        .version(version)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Connection", "close")
        .body(body.into_bytes())
        .build()
}

pub fn render_error_page(message: &str) -> String {
    format!(
        r#"
	<html>
		<head>
			<title>Mist Error</title>
		</head>
		<body>
			<h1>Error while proxying request.</h1>
			<p>{}</p>
		</body>
	</html>
"#,
        escape_html(message)
    )
}

fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("plain"), "plain");
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&#34;x&#34; &amp; &#39;y&#39;&lt;/b&gt;");
    }
}
