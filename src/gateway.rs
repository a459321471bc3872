//! WebSocket gateway: the transport entry point.
//!
//! The gateway binds a TCP listener and turns each accepted connection into
//! a stream session. The stream id is carried in the upgrade request path:
//!
//! ```text
//! ws://127.0.0.1:{port}/ws/stream/{stream_id}
//! ```
//!
//! Paths that do not name a valid stream id are refused during the
//! handshake with HTTP 404; no session is created for them. Everything
//! after the upgrade (duplicate rejection, command handling, cleanup) is
//! owned by [`SessionManager`] and the session itself.
//!
//! # Example
//!
//! ```no_run
//! use camgate::{Gateway, TestPatternSource};
//!
//! # async fn example() -> camgate::Result<()> {
//! let gateway = Gateway::builder()
//!     .bind_addr(([127, 0, 0, 1], 0))
//!     .frame_source(TestPatternSource::default())
//!     .build()
//!     .await?;
//!
//! println!("connect to {}", gateway.ws_url());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::StreamId;
use crate::session::SessionManager;
use crate::source::FrameSource;

// ============================================================================
// Constants
// ============================================================================

/// Accept poll interval; bounds how long shutdown waits for the loop.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Path prefix that addresses one stream's socket.
const STREAM_PATH_PREFIX: &str = "/ws/stream/";

// ============================================================================
// GatewayBuilder
// ============================================================================

/// Builder for configuring a [`Gateway`] instance.
///
/// Use [`Gateway::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct GatewayBuilder {
    /// Address to bind; defaults to `127.0.0.1:0`.
    bind_addr: Option<SocketAddr>,
    /// Decode engine for every session.
    source: Option<Arc<dyn FrameSource>>,
}

impl fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("bind_addr", &self.bind_addr)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl GatewayBuilder {
    /// Creates a new gateway builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the listener to.
    ///
    /// Port 0 asks the OS for a random free port.
    #[inline]
    #[must_use]
    pub fn bind_addr(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Sets the frame source handed to every session.
    #[inline]
    #[must_use]
    pub fn frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no frame source was set
    /// - [`Error::Io`] if binding fails
    pub async fn build(self) -> Result<Gateway> {
        let source = self
            .source
            .ok_or_else(|| Error::config("a frame source is required"))?;
        let addr = self
            .bind_addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "gateway listening");

        let inner = Arc::new(GatewayInner {
            manager: SessionManager::new(source),
            addr,
            shutdown: AtomicBool::new(false),
        });

        tokio::spawn(accept_loop(Arc::clone(&inner), listener));

        Ok(Gateway { inner })
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// A running stream gateway.
///
/// Cheap to clone; all clones share the listener and the session manager.
/// Dropping every clone does not stop the gateway; call
/// [`Gateway::shutdown`] for that.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    manager: SessionManager,
    addr: SocketAddr,
    shutdown: AtomicBool,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("addr", &self.inner.addr)
            .field("session_count", &self.session_count())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Creates a builder for a new gateway.
    #[inline]
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Returns the port the listener is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.addr.port()
    }

    /// Returns the local socket address the listener is bound to.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.addr
    }

    /// Returns the base WebSocket URL.
    ///
    /// Format: `ws://{addr}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.inner.addr)
    }

    /// Returns the WebSocket URL addressing one stream.
    #[inline]
    #[must_use]
    pub fn stream_url(&self, stream_id: StreamId) -> String {
        format!("{}{STREAM_PATH_PREFIX}{stream_id}", self.ws_url())
    }

    /// Returns the session manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &SessionManager {
        &self.inner.manager
    }

    /// Returns the number of live sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.manager.session_count()
    }

    /// Stops accepting connections and detaches every live session.
    ///
    /// Sessions run their own cleanup when the detach signal lands; the
    /// accept loop exits within one poll interval.
    pub fn shutdown(&self) {
        info!("gateway shutting down");
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.manager.detach_all();
    }
}

// ============================================================================
// Accept Loop
// ============================================================================

/// Background task that accepts and dispatches connections.
async fn accept_loop(inner: Arc<GatewayInner>, listener: TcpListener) {
    debug!("accept loop started");

    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            debug!("accept loop shutting down");
            break;
        }

        // Accept with timeout to allow checking the shutdown flag.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, addr))) => {
                let manager = inner.manager.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(manager, stream, addr).await {
                        warn!(error = %e, ?addr, "connection handling failed");
                    }
                });
            }
            Ok(Err(e)) => {
                error!(error = %e, "accept failed");
            }
            Err(_) => {
                // Timeout, re-check the shutdown flag.
                continue;
            }
        }
    }

    debug!("accept loop terminated");
}

/// Upgrades a single connection and runs its session to completion.
async fn handle_connection(
    manager: SessionManager,
    stream: TcpStream,
    addr: SocketAddr,
) -> Result<()> {
    debug!(?addr, "new TCP connection");

    // The stream id rides on the upgrade request path; invalid paths are
    // refused before the WebSocket exists.
    let mut requested_id = None;
    let callback = |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
        match parse_stream_path(request.uri().path()) {
            Ok(stream_id) => {
                requested_id = Some(stream_id);
                Ok(response)
            }
            Err(err) => {
                warn!(?addr, path = request.uri().path(), "refusing upgrade");
                Err(refusal(&err))
            }
        }
    };

    let transport = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let stream_id = requested_id
        .ok_or_else(|| Error::protocol("upgrade completed without a stream path"))?;

    info!(stream_id = %stream_id, ?addr, "WebSocket connection established");

    // A duplicate connect is reported and closed inside `connect`; the
    // error here only marks this handler task as done.
    let session = manager.connect(stream_id, transport).await?;
    session.run().await;
    Ok(())
}

/// Builds the HTTP response refusing an upgrade.
fn refusal(err: &Error) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(err.to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Extracts the stream id from an upgrade request path.
///
/// Accepts `/ws/stream/{uuid}` with an optional trailing slash.
///
/// # Errors
///
/// Returns [`Error::InvalidStreamPath`] for any other shape.
pub fn parse_stream_path(path: &str) -> Result<StreamId> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let id = trimmed
        .strip_prefix(STREAM_PATH_PREFIX)
        .ok_or_else(|| Error::invalid_stream_path(path))?;

    if id.is_empty() || id.contains('/') {
        return Err(Error::invalid_stream_path(path));
    }

    StreamId::parse_str(id).map_err(|_| Error::invalid_stream_path(path))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use uuid::Uuid;

    use crate::source::TestPatternSource;

    #[test]
    fn test_parse_stream_path() {
        let id = StreamId::new(Uuid::new_v4());

        let parsed = parse_stream_path(&format!("/ws/stream/{id}")).expect("parse");
        assert_eq!(parsed, id);

        let parsed = parse_stream_path(&format!("/ws/stream/{id}/")).expect("trailing slash");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_stream_path_rejects_bad_shapes() {
        let id = Uuid::new_v4();
        let cases = [
            "/".to_string(),
            "/ws/stream/".to_string(),
            "/ws/stream".to_string(),
            format!("/ws/stream/{id}/extra"),
            format!("/other/{id}"),
            "/ws/stream/not-a-uuid".to_string(),
        ];

        for path in cases {
            let err = parse_stream_path(&path).unwrap_err();
            assert!(
                matches!(err, Error::InvalidStreamPath { .. }),
                "{path} must be refused"
            );
        }
    }

    #[test]
    fn test_gateway_is_clone_and_debug() {
        fn assert_clone<T: Clone>() {}
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_clone::<Gateway>();
        assert_debug::<Gateway>();
        assert_debug::<GatewayBuilder>();
    }

    #[tokio::test]
    async fn test_build_requires_a_frame_source() {
        let err = Gateway::builder().build().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_gateway_binds_random_port() {
        let gateway = Gateway::builder()
            .frame_source(TestPatternSource::default())
            .build()
            .await
            .expect("build");

        assert!(gateway.port() > 0);
        assert!(gateway.ws_url().starts_with("ws://127.0.0.1:"));
        assert_eq!(gateway.session_count(), 0);

        let id = StreamId::new(Uuid::new_v4());
        assert_eq!(
            gateway.stream_url(id),
            format!("ws://127.0.0.1:{}/ws/stream/{id}", gateway.port())
        );

        gateway.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_path_is_refused_at_handshake() {
        let gateway = Gateway::builder()
            .frame_source(TestPatternSource::default())
            .build()
            .await
            .expect("build");

        let url = format!("{}/not/a/stream", gateway.ws_url());
        let result = tokio_tungstenite::connect_async(&url).await;

        assert!(result.is_err(), "upgrade must be refused");
        assert_eq!(gateway.session_count(), 0);

        gateway.shutdown();
    }
}
