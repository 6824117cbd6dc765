use crate::http::headers::Headers;
use crate::http::request::{is_token, Method, Request};
use crate::http::response::Response;

/// Largest accepted header section (request/status line plus headers).
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("incomplete message")]
    Incomplete,
    #[error("malformed request line")]
    InvalidRequest,
    #[error("invalid method")]
    InvalidMethod,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("unsupported Transfer-Encoding")]
    UnsupportedTransferEncoding,
    #[error("malformed chunked encoding")]
    InvalidChunk,
    #[error("header section too large")]
    HeadersTooLarge,
    #[error("missing required Host header")]
    MissingHost,
    #[error("malformed status line")]
    InvalidStatusLine,
}

/// How the end of a message body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

/// Parses one request from the front of `buf`.
///
/// Returns the request and the number of bytes it occupied, or
/// `ParseError::Incomplete` when `buf` does not yet hold the whole message.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    // Stray CRLFs between pipelined messages are ignored (RFC 9112 §2.2).
    let skipped = leading_crlf_len(buf);
    let buf = &buf[skipped..];

    let (head, body_start) = split_head(buf)?;
    let mut lines = head.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split(' ');

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() || path.is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    if !is_http1(version) {
        return Err(ParseError::InvalidVersion);
    }

    let headers = parse_headers(lines)?;
    if version != "HTTP/1.0" && !headers.contains_key("Host") {
        return Err(ParseError::MissingHost);
    }

    let body_bytes = &buf[body_start..];
    let body_len = match request_framing(&headers)? {
        Framing::Empty => 0,
        Framing::Length(n) if body_bytes.len() < n => return Err(ParseError::Incomplete),
        Framing::Length(n) => n,
        Framing::Chunked => chunked_body_len(body_bytes)?,
        Framing::UntilClose => return Err(ParseError::UnsupportedTransferEncoding),
    };

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: body_bytes[..body_len].to_vec(),
    };

    Ok((request, skipped + body_start + body_len))
}

/// Parses one response from the front of `buf`.
///
/// `method` is the method of the request being answered (a HEAD response has
/// no body). `eof` tells the parser the sender has closed its side, which is
/// how a body without a length ends; until then such a body is reported as
/// `Incomplete`.
pub fn parse_http_response(
    buf: &[u8],
    method: &Method,
    eof: bool,
) -> Result<(Response, usize), ParseError> {
    let (head, body_start) = split_head(buf)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if !is_http1(version) {
        return Err(ParseError::InvalidStatusLine);
    }

    let code = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidStatusLine);
    }
    let status: u16 = code.parse().map_err(|_| ParseError::InvalidStatusLine)?;
    let reason = parts.next().unwrap_or("");

    let headers = parse_headers(lines)?;

    let body_bytes = &buf[body_start..];
    let framing = response_framing(status, method, &headers)?;
    let body_len = match framing {
        Framing::Empty => 0,
        Framing::Length(n) if body_bytes.len() < n => return Err(ParseError::Incomplete),
        Framing::Length(n) => n,
        Framing::Chunked => chunked_body_len(body_bytes)?,
        Framing::UntilClose if !eof => return Err(ParseError::Incomplete),
        Framing::UntilClose => body_bytes.len(),
    };

    let response = Response {
        version: version.to_string(),
        status,
        reason: reason.to_string(),
        headers,
        body: body_bytes[..body_len].to_vec(),
        close_delimited: framing == Framing::UntilClose,
    };

    Ok((response, body_start + body_len))
}

/// Splits off the header section. Returns it without the final blank line,
/// plus the offset where the body starts.
fn split_head(buf: &[u8]) -> Result<(&str, usize), ParseError> {
    let headers_end = match find_headers_end(buf) {
        Some(end) if end > MAX_HEAD_SIZE => return Err(ParseError::HeadersTooLarge),
        Some(end) => end,
        None if buf.len() > MAX_HEAD_SIZE => return Err(ParseError::HeadersTooLarge),
        None => return Err(ParseError::Incomplete),
    };

    let head = std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidHeader)?;
    Ok((head, headers_end + 4))
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Headers, ParseError> {
    let mut headers = Headers::new();

    for line in lines {
        // Obsolete line folding is rejected rather than unfolded.
        if line.starts_with(' ') || line.starts_with('\t') {
            return Err(ParseError::InvalidHeader);
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        if !is_token(key) {
            return Err(ParseError::InvalidHeader);
        }

        headers.append(key, value.trim());
    }

    Ok(headers)
}

fn request_framing(headers: &Headers) -> Result<Framing, ParseError> {
    if headers.contains_key("Transfer-Encoding") {
        if headers.contains_key("Content-Length") {
            return Err(ParseError::InvalidContentLength);
        }
        return if ends_with_chunked(headers) {
            Ok(Framing::Chunked)
        } else {
            Err(ParseError::UnsupportedTransferEncoding)
        };
    }

    match content_length(headers)? {
        Some(0) | None => Ok(Framing::Empty),
        Some(n) => Ok(Framing::Length(n)),
    }
}

fn response_framing(status: u16, method: &Method, headers: &Headers) -> Result<Framing, ParseError> {
    if *method == Method::HEAD || (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(Framing::Empty);
    }

    // Transfer-Encoding overrides Content-Length on responses.
    if headers.contains_key("Transfer-Encoding") {
        return Ok(if ends_with_chunked(headers) {
            Framing::Chunked
        } else {
            Framing::UntilClose
        });
    }

    match content_length(headers)? {
        Some(0) => Ok(Framing::Empty),
        Some(n) => Ok(Framing::Length(n)),
        None => Ok(Framing::UntilClose),
    }
}

/// Reads Content-Length. Repeated fields or list values must all agree.
fn content_length(headers: &Headers) -> Result<Option<usize>, ParseError> {
    let mut length = None;

    for value in headers.get_all("Content-Length").flat_map(|v| v.split(',')) {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength);
        }
        let n: usize = value.parse().map_err(|_| ParseError::InvalidContentLength)?;

        match length {
            Some(previous) if previous != n => return Err(ParseError::InvalidContentLength),
            _ => length = Some(n),
        }
    }

    Ok(length)
}

fn ends_with_chunked(headers: &Headers) -> bool {
    headers
        .get_all("Transfer-Encoding")
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|coding| !coding.is_empty())
        .last()
        .is_some_and(|coding| coding.eq_ignore_ascii_case("chunked"))
}

/// Measures a chunked body at the front of `buf`, last chunk and trailer
/// section included, without decoding it.
///
/// Callers rescan from the start after every read. Chunk data is skipped by
/// its declared size, so a rescan costs one step per chunk line rather than
/// per body byte; an upload of many tiny chunks is bounded by the read
/// deadline.
fn chunked_body_len(buf: &[u8]) -> Result<usize, ParseError> {
    let mut pos = 0;

    loop {
        let line_end = find_crlf(buf, pos).ok_or(ParseError::Incomplete)?;
        let line = std::str::from_utf8(&buf[pos..line_end]).map_err(|_| ParseError::InvalidChunk)?;
        let size_str = line.split(';').next().unwrap_or("").trim();
        if size_str.is_empty() || size_str.len() > 16 || !size_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidChunk);
        }
        let size = usize::from_str_radix(size_str, 16).map_err(|_| ParseError::InvalidChunk)?;
        pos = line_end + 2;

        if size == 0 {
            return trailers_end(buf, pos);
        }

        let data_end = pos.checked_add(size).ok_or(ParseError::InvalidChunk)?;
        if buf.len() < data_end + 2 {
            return Err(ParseError::Incomplete);
        }
        if &buf[data_end..data_end + 2] != b"\r\n" {
            return Err(ParseError::InvalidChunk);
        }
        pos = data_end + 2;
    }
}

fn trailers_end(buf: &[u8], mut pos: usize) -> Result<usize, ParseError> {
    loop {
        let line_end = find_crlf(buf, pos).ok_or(ParseError::Incomplete)?;
        if line_end == pos {
            return Ok(pos + 2);
        }
        if !buf[pos..line_end].contains(&b':') {
            return Err(ParseError::InvalidChunk);
        }
        pos = line_end + 2;
    }
}

fn is_http1(version: &str) -> bool {
    matches!(version, "HTTP/1.0" | "HTTP/1.1")
}

fn leading_crlf_len(buf: &[u8]) -> usize {
    buf.chunks(2).take_while(|pair| *pair == b"\r\n").count() * 2
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.headers.get("Host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn chunked_length_includes_trailers() {
        let body = b"4\r\nWiki\r\n0\r\nExpires: never\r\n\r\nNEXT";
        assert_eq!(chunked_body_len(body), Ok(body.len() - 4));
    }

    #[test]
    fn chunked_length_waits_for_last_chunk() {
        assert_eq!(chunked_body_len(b"4\r\nWiki\r\n"), Err(ParseError::Incomplete));
        assert_eq!(chunked_body_len(b"4\r\nWikiXX"), Err(ParseError::InvalidChunk));
        assert_eq!(chunked_body_len(b"zz\r\n"), Err(ParseError::InvalidChunk));
    }

    #[test]
    fn leading_crlf_is_counted_in_pairs() {
        assert_eq!(leading_crlf_len(b"\r\n\r\nGET"), 4);
        assert_eq!(leading_crlf_len(b"\r\rGET"), 0);
    }
}
