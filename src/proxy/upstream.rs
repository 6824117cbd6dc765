//! Backend connection and request forwarding
//!
//! A [`BackendConnection`] is opened by a client session and kept for as
//! long as that session keeps talking to the same backend address.

use crate::error::ProxyError;
use crate::http::parser::{parse_http_response, ParseError};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::MessageWriter;
use bytes::{Buf, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// An open connection to one backend.
#[derive(Debug)]
pub struct BackendConnection {
    /// Address this connection was dialed to (`host:port`)
    addr: String,

    stream: TcpStream,

    /// Bytes read from the backend but not yet consumed
    buffer: BytesMut,

    /// Bound on waiting for each response
    read_timeout: Duration,
}

impl BackendConnection {
    /// Dial `addr` using the operating system's connect timeout.
    pub async fn connect(addr: &str, read_timeout: Duration) -> Result<Self, ProxyError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ProxyError::BackendUnreachable {
                addr: addr.to_string(),
                source,
            })?;

        tracing::debug!(backend = addr, "Connected to backend");

        Ok(Self {
            addr: addr.to_string(),
            stream,
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            read_timeout,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Forward `request` and wait for the backend's final response.
    ///
    /// Returns `Ok(None)` when the backend closed the connection before
    /// sending any part of a response. Interim 1xx responses are dropped.
    pub async fn exchange(&mut self, request: &Request) -> Result<Option<Response>, ProxyError> {
        let mut writer = MessageWriter::for_request(request);
        if let Err(source) = writer.write_to_stream(&mut self.stream).await {
            return Err(self.io_error(source));
        }

        tracing::trace!(backend = %self.addr, "Request sent to backend");

        let deadline = Instant::now() + self.read_timeout;
        loop {
            let Some(response) = self.read_response(&request.method, deadline).await? else {
                return Ok(None);
            };

            if response.is_interim() {
                tracing::debug!(backend = %self.addr, status = response.status, "Dropping interim response");
                continue;
            }

            return Ok(Some(response));
        }
    }

    async fn read_response(
        &mut self,
        method: &Method,
        deadline: Instant,
    ) -> Result<Option<Response>, ProxyError> {
        let mut eof = false;

        loop {
            match parse_http_response(&self.buffer, method, eof) {
                Ok((response, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(response));
                }
                Err(ParseError::Incomplete) if eof => {
                    return Err(self.io_error(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before complete response received",
                    )));
                }
                Err(ParseError::Incomplete) => {}
                Err(source) => {
                    return Err(ProxyError::BackendResponse {
                        addr: self.addr.clone(),
                        source,
                    });
                }
            }

            self.buffer.reserve(BUFFER_SIZE);
            let read = timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await;
            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(source)) => return Err(self.io_error(source)),
                Err(_) => {
                    return Err(ProxyError::BackendTimeout {
                        addr: self.addr.clone(),
                        timeout: self.read_timeout,
                    });
                }
            };

            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                eof = true;
            }
        }
    }

    fn io_error(&self, source: io::Error) -> ProxyError {
        ProxyError::BackendIo {
            addr: self.addr.clone(),
            source,
        }
    }
}
