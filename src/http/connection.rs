use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::ProxyError;
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::MessageWriter;
use crate::proxy::error_page::error_response;
use crate::proxy::matcher::HostMatcher;
use crate::proxy::upstream::BackendConnection;

const READ_CHUNK: usize = 4096;

/// One client session.
///
/// Owns the client socket and, once a request has been routed, the backend
/// socket. Both are closed when the `Connection` is dropped, whichever state
/// the session ended in.
pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    matcher: Arc<HostMatcher>,
    read_timeout: Duration,
    backend: Option<BackendConnection>,
    /// Close after the current exchange.
    terminate: bool,
}

pub enum ConnectionState {
    Reading,
    Routing(Request),
    Dialing(Request, String),
    Forwarding(Request),
    Relaying(Request, Response),
    Failed(Option<Request>, ProxyError),
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, matcher: Arc<HostMatcher>, read_timeout: Duration) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            matcher,
            read_timeout,
            backend: None,
            terminate: false,
        }
    }

    /// Drive the session until it closes.
    ///
    /// Failures are answered with an error page inside the loop. The only
    /// error returned is a failed write to the client, after which nothing
    /// more can be sent.
    pub async fn run(&mut self) -> Result<(), ProxyError> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match self.read_request().await {
                    Ok(Some(req)) => {
                        if !req.keep_alive() {
                            self.terminate = true;
                        }
                        ConnectionState::Routing(req)
                    }
                    Ok(None) => ConnectionState::Closed,
                    Err(e) => ConnectionState::Failed(None, e),
                },

                ConnectionState::Routing(req) => {
                    let host = req.host().unwrap_or_default();
                    match self.matcher.resolve(&host) {
                        Some(addr) => {
                            debug!(host = %host, backend = addr, "Routed request");
                            let addr = addr.to_string();
                            ConnectionState::Dialing(req, addr)
                        }
                        None => ConnectionState::Failed(Some(req), ProxyError::NoRoute(host)),
                    }
                }

                ConnectionState::Dialing(req, addr) => match self.ensure_backend(&addr).await {
                    Ok(()) => ConnectionState::Forwarding(req),
                    Err(e) => ConnectionState::Failed(Some(req), e),
                },

                ConnectionState::Forwarding(req) => match self.forward(&req).await {
                    Ok(Some(resp)) => {
                        if !self.response_persists(&req, &resp) {
                            self.terminate = true;
                        }
                        ConnectionState::Relaying(req, resp)
                    }
                    Ok(None) => {
                        debug!("Backend closed the connection without responding");
                        self.terminate = true;
                        ConnectionState::Closed
                    }
                    Err(e) => ConnectionState::Failed(Some(req), e),
                },

                ConnectionState::Relaying(req, mut resp) => {
                    resp.set_close(self.terminate);

                    let mut writer = MessageWriter::for_response(&resp);
                    writer
                        .write_to_stream(&mut self.stream)
                        .await
                        .map_err(ProxyError::ClientWrite)?;

                    info!(
                        method = req.method.as_str(),
                        path = %req.path,
                        status = resp.status,
                        backend = self.backend.as_ref().map(BackendConnection::addr),
                        "Request forwarded"
                    );

                    if self.terminate {
                        ConnectionState::Closed
                    } else {
                        ConnectionState::Reading
                    }
                }

                ConnectionState::Failed(req, err) => {
                    self.respond_with_error(req.as_ref(), &err).await;
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    /// Read the next request, waiting at most `read_timeout` for all of it.
    ///
    /// Returns `Ok(None)` when the client closed the connection, or went idle,
    /// without starting another request.
    pub async fn read_request(&mut self) -> Result<Option<Request>, ProxyError> {
        let deadline = Instant::now() + self.read_timeout;

        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(e.into()),
            }

            self.buffer.reserve(READ_CHUNK);
            let read = timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await;
            let n = match read {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(ProxyError::ClientRead(e)),
                Err(_) if self.is_idle() => {
                    debug!("Client idle past read timeout");
                    return Ok(None);
                }
                Err(_) => return Err(ProxyError::ClientTimeout),
            };

            if n == 0 {
                if self.is_idle() {
                    return Ok(None);
                }
                return Err(ParseError::Incomplete.into());
            }
        }
    }

    /// Nothing but blank lines has arrived since the last request.
    fn is_idle(&self) -> bool {
        self.buffer.iter().all(|b| matches!(b, b'\r' | b'\n'))
    }

    /// Keep the current backend connection when it already goes to `addr`,
    /// otherwise replace it with a fresh one.
    async fn ensure_backend(&mut self, addr: &str) -> Result<(), ProxyError> {
        if self.backend.as_ref().is_some_and(|b| b.addr() == addr) {
            return Ok(());
        }

        // Release the old backend before dialing the new one.
        self.backend = None;
        self.backend = Some(BackendConnection::connect(addr, self.read_timeout).await?);
        Ok(())
    }

    async fn forward(&mut self, req: &Request) -> Result<Option<Response>, ProxyError> {
        match self.backend.as_mut() {
            Some(backend) => backend.exchange(req).await,
            None => Err(ProxyError::BackendIo {
                addr: String::new(),
                source: std::io::ErrorKind::NotConnected.into(),
            }),
        }
    }

    /// An HTTP/1.0 client only keeps the connection when the response says
    /// so explicitly, since it cannot assume HTTP/1.1 defaults.
    fn response_persists(&self, req: &Request, resp: &Response) -> bool {
        if !resp.keep_alive() {
            return false;
        }
        req.version != "HTTP/1.0" || resp.headers.has_token("Connection", "keep-alive")
    }

    async fn respond_with_error(&mut self, req: Option<&Request>, err: &ProxyError) {
        let Some(status) = err.status() else {
            return;
        };

        warn!(status = status.as_u16(), error = %err, "Failed to proxy request");

        let response = error_response(req, status, err);
        let mut writer = MessageWriter::for_response(&response);
        if let Err(e) = writer.write_to_stream(&mut self.stream).await {
            debug!(error = %e, "Failed to write error response");
        }
    }
}
