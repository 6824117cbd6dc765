use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::Response;

fn serialize_head(buf: &mut Vec<u8>, start_line: &str, headers: &Headers) {
    buf.extend_from_slice(start_line.as_bytes());
    buf.extend_from_slice(b"\r\n");

    for (k, v) in headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + resp.body.len());

    let status_line = if resp.reason.is_empty() {
        format!("{} {}", resp.version, resp.status)
    } else {
        format!("{} {} {}", resp.version, resp.status, resp.reason)
    };
    serialize_head(&mut buf, &status_line, &resp.headers);
    buf.extend_from_slice(&resp.body);

    buf
}

/// Serializes a request for forwarding. Target, version, headers and body
/// are written as they were received.
pub fn serialize_request(req: &Request) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + req.body.len());

    let request_line = format!("{} {} {}", req.method.as_str(), req.path, req.version);
    serialize_head(&mut buf, &request_line, &req.headers);
    buf.extend_from_slice(&req.body);

    buf
}

/// A serialized message together with how much of it has been written.
pub struct MessageWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl MessageWriter {
    pub fn for_response(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn for_request(request: &Request) -> Self {
        Self {
            buffer: serialize_request(request),
            written: 0,
        }
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }

        stream.flush().await
    }
}
