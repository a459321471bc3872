//! End-to-end stream watching over the wire protocol.
//!
//! Demonstrates:
//! - Spawning a gateway and connecting a WebSocket client to one stream
//! - Driving playback: start_stream, set_speed, pause, play, stop_stream
//! - Decoding the pushed events and counting received frames
//!
//! Usage:
//!   cargo run --example 002_watch_stream
//!   cargo run --example 002_watch_stream -- --debug
//!   cargo run --example 002_watch_stream -- --fps 10

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

use common::Args;

use camgate::{Event, Gateway, StreamId};

// ============================================================================
// Constants
// ============================================================================

const CAMERA_URL: &str = "rtsp://demo.local:554/lobby";

/// How long to watch each playback phase.
const WATCH_WINDOW: Duration = Duration::from_secs(2);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 002: Watch Stream ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    println!(
        "[Setup] Starting gateway ({} FPS pattern) and connecting...",
        args.fps
    );

    let gateway = Gateway::builder()
        .frame_source(common::pattern_source(&args))
        .build()
        .await?;

    let stream_id = StreamId::new(Uuid::new_v4());
    let (mut socket, _) = connect_async(gateway.stream_url(stream_id))
        .await
        .context("connecting to the gateway")?;

    let greeting = recv_event(&mut socket).await?;
    println!("        ✓ Connected ({})\n", greeting.kind());

    // ========================================================================
    // Start Stream
    // ========================================================================

    println!("[1] start_stream {CAMERA_URL}...");
    send(&mut socket, &json!({ "type": "start_stream", "rtsp_url": CAMERA_URL })).await?;

    match recv_event(&mut socket).await? {
        Event::StreamStarted { rtsp_url, .. } => println!("    ✓ Started ({rtsp_url})"),
        other => bail!("expected stream_started, got {}", other.kind()),
    }

    let (frames, bytes) = watch(&mut socket, WATCH_WINDOW).await?;
    println!("    Received {frames} frames ({bytes} payload bytes) in {WATCH_WINDOW:?}\n");

    // ========================================================================
    // Speed Up
    // ========================================================================

    println!("[2] set_speed 2.0...");
    send(&mut socket, &json!({ "type": "set_speed", "speed": 2.0 })).await?;

    match wait_for(&mut socket, "speed_changed").await? {
        Event::SpeedChanged { speed, .. } => println!("    ✓ Speed changed to {speed}"),
        other => bail!("expected speed_changed, got {}", other.kind()),
    }

    let (fast_frames, _) = watch(&mut socket, WATCH_WINDOW).await?;
    println!("    Received {fast_frames} frames in the same window (was {frames})\n");

    // ========================================================================
    // Pause / Resume
    // ========================================================================

    println!("[3] pause...");
    send(&mut socket, &json!({ "type": "pause" })).await?;

    let paused = wait_for(&mut socket, "stream_paused").await?;
    println!("    ✓ {}", paused.kind());

    let (paused_frames, _) = watch(&mut socket, WATCH_WINDOW).await?;
    println!("    Received {paused_frames} frames while paused (expected 0)\n");

    println!("[4] play...");
    send(&mut socket, &json!({ "type": "play" })).await?;

    let resumed = recv_event(&mut socket).await?;
    println!("    ✓ {}", resumed.kind());

    let (resumed_frames, _) = watch(&mut socket, WATCH_WINDOW).await?;
    println!("    Received {resumed_frames} frames after resume\n");

    // ========================================================================
    // Stop
    // ========================================================================

    println!("[5] stop_stream...");
    send(&mut socket, &json!({ "type": "stop_stream" })).await?;

    let stopped = wait_for(&mut socket, "stream_stopped").await?;
    println!("    ✓ {}\n", stopped.kind());

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("[Cleanup] Closing socket and gateway...");
    socket.close(None).await.ok();
    gateway.shutdown();
    println!("          ✓ Done");

    println!("\n=== Stream watched successfully ===");
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

async fn send(socket: &mut Socket, command: &serde_json::Value) -> Result<()> {
    socket
        .send(Message::Text(command.to_string().into()))
        .await
        .context("sending command")
}

/// Receives the next event pushed by the gateway.
async fn recv_event(socket: &mut Socket) -> Result<Event> {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .context("waiting for an event")?
            .context("socket closed")??;

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).context("decoding event");
        }
    }
}

/// Receives events until one matches `kind`, skipping frames in between.
async fn wait_for(socket: &mut Socket, kind: &str) -> Result<Event> {
    loop {
        let event = recv_event(socket).await?;
        if event.kind() == kind {
            return Ok(event);
        }
        if !matches!(event, Event::Frame { .. }) {
            bail!("expected {kind}, got {}", event.kind());
        }
    }
}

/// Counts frame events arriving within `window`.
async fn watch(socket: &mut Socket, window: Duration) -> Result<(usize, usize)> {
    let deadline = tokio::time::Instant::now() + window;
    let mut frames = 0;
    let mut bytes = 0;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return Ok((frames, bytes));
        }

        match timeout(remaining, socket.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                if let Ok(Event::Frame { frame, .. }) = serde_json::from_str(text.as_str()) {
                    frames += 1;
                    bytes += frame.len();
                }
            }
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(e))) => return Err(e).context("receiving frames"),
            Ok(None) => bail!("socket closed while watching"),
            Err(_) => return Ok((frames, bytes)),
        }
    }
}
