//! Shared helpers for end-to-end proxy tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use mist::http::parser::{parse_http_request, parse_http_response, ParseError};
use mist::http::request::{Method, Request};
use mist::http::response::Response;
use mist::proxy::HostMatcher;
use mist::server::listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A backend that answers every request through a callback.
pub struct MockBackend {
    pub addr: SocketAddr,
    /// Connections accepted so far
    pub connections: Arc<AtomicUsize>,
    /// Connections that have ended
    pub closed: Arc<AtomicUsize>,
    /// Every request received, in order
    pub requests: Arc<Mutex<Vec<Request>>>,
}

impl MockBackend {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a backend that replies with whatever `respond` returns as raw bytes.
///
/// `None` closes the connection without answering. A reply that is HTTP/1.0
/// or carries `Connection: close` closes the connection after it is written.
pub async fn start_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let connections = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let backend = MockBackend {
        addr,
        connections: Arc::clone(&connections),
        closed: Arc::clone(&closed),
        requests: Arc::clone(&requests),
    };

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            connections.fetch_add(1, Ordering::SeqCst);
            let closed = Arc::clone(&closed);
            let requests = Arc::clone(&requests);
            let respond = Arc::clone(&respond);

            tokio::spawn(async move {
                let mut buf = BytesMut::new();
                'conn: loop {
                    let request = loop {
                        match parse_http_request(&buf) {
                            Ok((request, consumed)) => {
                                let _ = buf.split_to(consumed);
                                break request;
                            }
                            Err(ParseError::Incomplete) => {}
                            Err(_) => break 'conn,
                        }
                        match socket.read_buf(&mut buf).await {
                            Ok(0) | Err(_) => break 'conn,
                            Ok(_) => {}
                        }
                    };

                    requests.lock().unwrap().push(request.clone());

                    let Some(reply) = respond(&request) else {
                        break 'conn;
                    };
                    if socket.write_all(reply.as_bytes()).await.is_err() {
                        break 'conn;
                    }
                    if reply.starts_with("HTTP/1.0") || reply.contains("Connection: close") {
                        let _ = socket.shutdown().await;
                        break 'conn;
                    }
                }
                closed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    backend
}

/// Start a backend that reads requests but never answers.
pub async fn start_silent_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let connections = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let backend = MockBackend {
        addr,
        connections: Arc::clone(&connections),
        closed: Arc::clone(&closed),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            connections.fetch_add(1, Ordering::SeqCst);
            let closed = Arc::clone(&closed);
            tokio::spawn(async move {
                let mut sink = [0u8; 1024];
                while let Ok(n) = socket.read(&mut sink).await {
                    if n == 0 {
                        break;
                    }
                }
                closed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    backend
}

/// Start the proxy on an ephemeral port with the given pattern table.
pub async fn start_proxy(mappings: &[(&str, String)], read_timeout: Duration) -> SocketAddr {
    let mut matcher = HostMatcher::new();
    for (pattern, address) in mappings {
        matcher.add_mapping(pattern, address.as_str());
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(listener::serve(listener, Arc::new(matcher), read_timeout));

    addr
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn ok_response(body: &str) -> String {
    format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}", body.len(), body)
}

/// Read one response for a GET from `stream`. Returns `None` if the stream
/// ends before any byte arrives.
pub async fn read_response(stream: &mut TcpStream, buf: &mut BytesMut) -> Option<Response> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut eof = false;
        loop {
            match parse_http_response(&buf[..], &Method::GET, eof) {
                Ok((response, consumed)) => {
                    let _ = buf.split_to(consumed);
                    return Some(response);
                }
                Err(ParseError::Incomplete) if eof => return None,
                Err(ParseError::Incomplete) => {}
                Err(e) => panic!("invalid response from proxy: {e}"),
            }
            let n = stream.read_buf(buf).await.unwrap();
            if n == 0 {
                if buf.is_empty() {
                    return None;
                }
                eof = true;
            }
        }
    })
    .await
    .expect("timed out waiting for a response")
}

/// Read until the peer closes and return everything received.
pub async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut out))
        .await
        .expect("connection was not closed")
        .unwrap();
    out
}

/// Poll `cond` until it holds or `limit` passes.
pub async fn wait_until(cond: impl Fn() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
