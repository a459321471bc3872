//! Shared utilities for demos.
//!
//! Provides the pieces every demo needs:
//! - Command-line argument parsing (gateway port, pattern rate, flags)
//! - Logging initialization
//! - The synthetic feed the demos serve
//! - Graceful exit handling

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

use camgate::TestPatternSource;

// ============================================================================
// Constants
// ============================================================================

/// Default port for demos that bind a fixed gateway address.
pub const DEFAULT_PORT: u16 = 9191;

/// Default pattern frame rate at speed 1.0.
pub const DEFAULT_FPS: f64 = 5.0;

/// Pattern dimensions shared by every demo feed.
const PATTERN_WIDTH: u32 = 320;
const PATTERN_HEIGHT: u32 = 240;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub no_wait: bool,
    /// Gateway port (`--port`); demos binding ephemeral ports ignore it.
    pub port: u16,
    /// Pattern frame rate (`--fps`).
    pub fps: f64,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// Unknown flags are ignored; missing or malformed values fall back to
    /// the defaults.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
            port: flag_value(&args, "--port").unwrap_or(DEFAULT_PORT),
            fps: flag_value(&args, "--fps").unwrap_or(DEFAULT_FPS),
        }
    }
}

/// Returns the parsed value following `flag`, if present and well-formed.
fn flag_value<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let position = args.iter().position(|a| a == flag)?;
    args.get(position + 1)?.parse().ok()
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug { "camgate=debug" } else { "camgate=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// The demo feed: a synthetic pattern at the configured rate.
pub fn pattern_source(args: &Args) -> TestPatternSource {
    TestPatternSource::new(PATTERN_WIDTH, PATTERN_HEIGHT, args.fps)
}

/// Wait for Ctrl+C or return immediately when `--no-wait` is set.
pub async fn wait_for_exit(no_wait: bool) {
    if no_wait {
        println!("[--no-wait] Skipping wait");
        return;
    }

    println!("Press Ctrl+C to stop the gateway...");
    tokio::signal::ctrl_c().await.ok();
}
