//! The per-stream session task.
//!
//! A [`Session`] owns one WebSocket and, while playing, one frame source
//! subscription. It runs a single event loop that races three waits: the
//! next inbound message, the next produced frame, and the manager's detach
//! signal. Commands are processed strictly in arrival order and every event
//! is emitted in order relative to the command that caused it, because
//! nothing here leaves this one task.
//!
//! Exactly one cleanup runs per session, at the end of [`Session::run`],
//! regardless of which trigger ended the loop: it closes the subscription,
//! closes the transport, and releases the manager registration.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identifiers::StreamId;
use crate::protocol::{Command, Event, Inbound, decode};
use crate::source::{Frame, FrameSource, FrameSubscription};

use super::manager::SessionManager;
use super::state::{ConnectionState, PlaybackState, StreamSession};

// ============================================================================
// Types
// ============================================================================

/// The transport carrying one stream's commands and events.
pub type StreamSocket = WebSocketStream<TcpStream>;

/// Why the session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// The client closed the socket or it ended.
    RemoteClosed,
    /// A send or receive on the socket failed.
    TransportFailed,
    /// The frame source failed fatally.
    SourceFailed,
    /// The manager detached this session.
    Detached,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RemoteClosed => "remote closed",
            Self::TransportFailed => "transport failed",
            Self::SourceFailed => "source failed",
            Self::Detached => "detached",
        };
        f.write_str(name)
    }
}

/// One resolved wait of the event loop.
enum Step {
    /// Inbound transport message (or stream end / error).
    Transport(Option<std::result::Result<Message, WsError>>),
    /// Next subscription item: frame, end, or failure.
    Source(Result<Option<Frame>>),
    /// The manager dropped or signalled this session's registration.
    Detached,
}

// ============================================================================
// Session
// ============================================================================

/// One live stream session.
///
/// Created by [`SessionManager::connect`]; the caller drives it to
/// completion with [`Session::run`], usually on a dedicated task.
pub struct Session {
    stream_id: StreamId,
    session_uuid: Uuid,
    state: StreamSession,
    transport: StreamSocket,
    subscription: Option<Box<dyn FrameSubscription>>,
    source: Arc<dyn FrameSource>,
    manager: SessionManager,
    detach_rx: oneshot::Receiver<()>,
}

impl Session {
    /// Creates a session for an already-registered stream id.
    pub(crate) fn new(
        stream_id: StreamId,
        session_uuid: Uuid,
        transport: StreamSocket,
        source: Arc<dyn FrameSource>,
        manager: SessionManager,
        detach_rx: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            stream_id,
            session_uuid,
            state: StreamSession::new(stream_id),
            transport,
            subscription: None,
            source,
            manager,
            detach_rx,
        }
    }

    /// Returns the stream id this session serves.
    #[inline]
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Rejects a duplicate transport: reports the state error and closes.
    ///
    /// Used when a stream id already has a live session; the existing
    /// session is not touched.
    pub(crate) async fn reject(mut transport: StreamSocket, stream_id: StreamId) {
        warn!(stream_id = %stream_id, "rejecting connect: session already active");
        let err = Error::session_active(stream_id);
        if let Ok(json) = Event::error(stream_id, &err).encode() {
            let _ = transport.send(Message::Text(json.into())).await;
        }
        let _ = transport.close(None).await;
    }

    /// Runs the session to completion.
    ///
    /// Consumes the session; when this returns, the subscription and the
    /// transport are released and the manager registration is gone.
    pub async fn run(mut self) {
        info!(stream_id = %self.stream_id, "session opened");
        self.state.open_transport();

        let established = Event::ConnectionEstablished {
            stream_id: self.stream_id,
        };
        let reason = match self.emit(established).await {
            Ok(()) => self.drive().await,
            Err(err) => {
                error!(stream_id = %self.stream_id, error = %err, "failed to greet client");
                CloseReason::TransportFailed
            }
        };

        self.shutdown(reason).await;
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Races the three session waits until one of them ends the session.
    async fn drive(&mut self) -> CloseReason {
        loop {
            let step = tokio::select! {
                message = self.transport.next() => Step::Transport(message),
                item = next_subscription_item(&mut self.subscription) => Step::Source(item),
                _ = &mut self.detach_rx => Step::Detached,
            };

            let ended = match step {
                Step::Transport(message) => self.handle_transport(message).await,
                Step::Source(item) => self.handle_source_item(item).await,
                Step::Detached => {
                    debug!(stream_id = %self.stream_id, "detach requested");
                    Some(CloseReason::Detached)
                }
            };

            if let Some(reason) = ended {
                return reason;
            }
        }
    }

    /// Handles one inbound transport message.
    async fn handle_transport(
        &mut self,
        message: Option<std::result::Result<Message, WsError>>,
    ) -> Option<CloseReason> {
        match message {
            Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
            Some(Ok(Message::Binary(_))) => {
                let err = Error::protocol("binary frames are not supported");
                self.report(&err).await
            }
            Some(Ok(Message::Close(_))) => {
                debug!(stream_id = %self.stream_id, "client sent close frame");
                Some(CloseReason::RemoteClosed)
            }
            // Ping/pong are handled by the transport layer itself.
            Some(Ok(_)) => None,
            Some(Err(err)) => {
                error!(stream_id = %self.stream_id, error = %err, "transport receive failed");
                Some(CloseReason::TransportFailed)
            }
            None => {
                debug!(stream_id = %self.stream_id, "transport ended");
                Some(CloseReason::RemoteClosed)
            }
        }
    }

    /// Decodes one text frame and dispatches it.
    async fn handle_text(&mut self, text: &str) -> Option<CloseReason> {
        match decode(text) {
            Ok(Inbound::Command(command)) => self.handle_command(command).await,
            Ok(Inbound::Unknown { kind }) => {
                warn!(stream_id = %self.stream_id, kind, "ignoring unknown message type");
                None
            }
            Err(err) => {
                warn!(stream_id = %self.stream_id, error = %err, "undecodable message");
                self.report(&err).await
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Validates a command against the current state and applies it.
    async fn handle_command(&mut self, command: Command) -> Option<CloseReason> {
        debug!(
            stream_id = %self.stream_id,
            command = command.wire_name(),
            connection = %self.state.connection(),
            playback = %self.state.playback(),
            "handling command"
        );

        match command {
            Command::StartStream { rtsp_url } => self.handle_start_stream(rtsp_url).await,
            Command::Play => self.handle_play().await,
            Command::Pause => self.handle_pause().await,
            Command::StopStream => self.handle_stop_stream().await,
            Command::SetSpeed { speed } => self.handle_set_speed(speed).await,
        }
    }

    /// `start_stream`: valid exactly once, while `Connecting`.
    async fn handle_start_stream(&mut self, rtsp_url: String) -> Option<CloseReason> {
        match self.state.connection() {
            ConnectionState::Connecting => self.open_subscription(rtsp_url).await,
            _ => {
                let err = Error::stream_already_started(self.stream_id);
                self.report(&err).await
            }
        }
    }

    /// `play`: resume from `Paused`, reopen from `Stopped`, no-op while
    /// `Playing`.
    async fn handle_play(&mut self) -> Option<CloseReason> {
        match (self.state.connection(), self.state.playback()) {
            (ConnectionState::Connected, PlaybackState::Paused) => {
                self.state.resume();
                info!(stream_id = %self.stream_id, "stream resumed");
                self.emit_or_fail(Event::StreamResumed {
                    stream_id: self.stream_id,
                })
                .await
            }
            (ConnectionState::Connected, PlaybackState::Stopped) => {
                let Some(url) = self.state.source_url().map(str::to_string) else {
                    return self.report_invalid("play").await;
                };
                self.open_subscription(url).await
            }
            (ConnectionState::Connected, PlaybackState::Playing) => {
                debug!(stream_id = %self.stream_id, "already playing, ignoring play");
                None
            }
            _ => self.report_invalid("play").await,
        }
    }

    /// `pause`: suspend delivery, keep the subscription open.
    async fn handle_pause(&mut self) -> Option<CloseReason> {
        match (self.state.connection(), self.state.playback()) {
            (ConnectionState::Connected, PlaybackState::Playing) => {
                self.state.pause();
                info!(stream_id = %self.stream_id, "stream paused");
                self.emit_or_fail(Event::StreamPaused {
                    stream_id: self.stream_id,
                })
                .await
            }
            (ConnectionState::Connected, PlaybackState::Paused) => {
                debug!(stream_id = %self.stream_id, "already paused, ignoring pause");
                None
            }
            _ => self.report_invalid("pause").await,
        }
    }

    /// `stop_stream`: release the subscription; the connection stays open.
    async fn handle_stop_stream(&mut self) -> Option<CloseReason> {
        if !self.state.is_connected() {
            return self.report_invalid("stop_stream").await;
        }

        self.release_subscription().await;
        self.state.stop();
        info!(stream_id = %self.stream_id, "stream stopped");
        self.emit_or_fail(Event::StreamStopped {
            stream_id: self.stream_id,
        })
        .await
    }

    /// `set_speed`: validate, store, forward to the live subscription.
    async fn handle_set_speed(&mut self, speed: f64) -> Option<CloseReason> {
        if !self.state.is_connected() {
            return self.report_invalid("set_speed").await;
        }

        if let Err(err) = self.state.set_speed(speed) {
            warn!(stream_id = %self.stream_id, speed, "rejecting speed factor");
            return self.report(&err).await;
        }

        if let Some(subscription) = self.subscription.as_deref_mut() {
            subscription.set_rate(speed).await;
        }

        debug!(stream_id = %self.stream_id, speed, "playback speed changed");
        self.emit_or_fail(Event::SpeedChanged {
            stream_id: self.stream_id,
            speed,
        })
        .await
    }

    // ========================================================================
    // Frame Handling
    // ========================================================================

    /// Handles one subscription item: frame, end of stream, or failure.
    async fn handle_source_item(&mut self, item: Result<Option<Frame>>) -> Option<CloseReason> {
        match item {
            Ok(Some(frame)) => {
                if self.state.playback() == PlaybackState::Playing {
                    self.state.record_frame(frame.timestamp_ms);
                    let event = Event::frame(self.stream_id, &frame);
                    self.emit_or_fail(event).await
                } else {
                    trace!(stream_id = %self.stream_id, "discarding frame while not playing");
                    None
                }
            }
            Ok(None) => {
                info!(stream_id = %self.stream_id, "frame source ended");
                self.release_subscription().await;
                self.state.stop();
                self.emit_or_fail(Event::StreamStopped {
                    stream_id: self.stream_id,
                })
                .await
            }
            Err(err) => {
                error!(stream_id = %self.stream_id, error = %err, "frame source failed");
                let _ = self.report(&err).await;
                self.state.fail();
                Some(CloseReason::SourceFailed)
            }
        }
    }

    // ========================================================================
    // Subscription Management
    // ========================================================================

    /// Opens a subscription for `url` and acknowledges with
    /// `stream_started`. A failed open is fatal to the session.
    async fn open_subscription(&mut self, url: String) -> Option<CloseReason> {
        match self.source.open(&url).await {
            Ok(mut subscription) => {
                if self.state.speed() != 1.0 {
                    subscription.set_rate(self.state.speed()).await;
                }
                self.subscription = Some(subscription);
                self.state.stream_started(url.clone());
                info!(stream_id = %self.stream_id, url, "stream started");
                self.emit_or_fail(Event::StreamStarted {
                    stream_id: self.stream_id,
                    rtsp_url: url,
                })
                .await
            }
            Err(err) => {
                error!(stream_id = %self.stream_id, url, error = %err, "failed to open source");
                let _ = self.report(&err).await;
                self.state.fail();
                Some(CloseReason::SourceFailed)
            }
        }
    }

    /// Closes and drops the subscription, if one is held. Safe to call
    /// repeatedly.
    async fn release_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close().await;
            debug!(stream_id = %self.stream_id, "subscription released");
        }
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Encodes and sends one event.
    async fn emit(&mut self, event: Event) -> Result<()> {
        let json = event.encode()?;
        self.transport.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Sends one event, converting a send failure into a fatal close.
    async fn emit_or_fail(&mut self, event: Event) -> Option<CloseReason> {
        let kind = event.kind();
        match self.emit(event).await {
            Ok(()) => None,
            Err(err) => {
                error!(
                    stream_id = %self.stream_id,
                    event = kind,
                    error = %err,
                    "transport send failed"
                );
                Some(CloseReason::TransportFailed)
            }
        }
    }

    /// Reports a recoverable error to the client as an `error` event.
    async fn report(&mut self, err: &Error) -> Option<CloseReason> {
        self.emit_or_fail(Event::error(self.stream_id, err)).await
    }

    /// Reports the command as invalid for the current state.
    async fn report_invalid(&mut self, command: &str) -> Option<CloseReason> {
        let err = self.state.invalid(command);
        warn!(stream_id = %self.stream_id, error = %err, "rejecting command");
        self.report(&err).await
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// The single cleanup path, reached from every loop exit.
    ///
    /// Awaits subscription release before returning, closes the transport,
    /// and drops the manager registration (a no-op if the registration was
    /// already taken over or removed).
    async fn shutdown(mut self, reason: CloseReason) {
        self.release_subscription().await;
        let _ = self.transport.close(None).await;
        self.state.close();
        self.manager.release(self.stream_id, self.session_uuid);
        info!(stream_id = %self.stream_id, %reason, "session closed");
    }
}

/// Waits for the next item of the active subscription, or forever when no
/// subscription is held (other loop branches stay responsive).
async fn next_subscription_item(
    subscription: &mut Option<Box<dyn FrameSubscription>>,
) -> Result<Option<Frame>> {
    match subscription.as_deref_mut() {
        Some(active) => active.next_frame().await,
        None => std::future::pending().await,
    }
}
