use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, Instrument};

use crate::http::connection::Connection;
use crate::proxy::matcher::HostMatcher;

/// Bind `addr` and serve until accepting fails.
pub async fn run(addr: &str, matcher: Arc<HostMatcher>, read_timeout: Duration) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, matcher, read_timeout).await
}

/// Accept connections on `listener`, one task each.
///
/// An accept error ends the loop and is returned; sessions already running
/// are left to finish on their own.
pub async fn serve(
    listener: TcpListener,
    matcher: Arc<HostMatcher>,
    read_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await.context("failed to accept connection")?;
        debug!("Accepted connection from {}", peer);

        let matcher = Arc::clone(&matcher);
        let span = tracing::info_span!("connection", %peer);
        tokio::spawn(
            async move {
                let mut conn = Connection::new(socket, matcher, read_timeout);
                if let Err(e) = conn.run().await {
                    debug!("Connection ended with error: {}", e);
                }
            }
            .instrument(span),
        );
    }
}
