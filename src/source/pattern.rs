//! Synthetic test pattern source.
//!
//! Produces a moving RGB gradient encoded as JPEG, at a fixed frame rate
//! scaled by the playback speed factor. Useful for demos, integration tests,
//! and wiring checks when no camera is reachable: any source URL is
//! accepted and frames are synthesized locally.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::debug;

use crate::error::{Error, Result};

use super::{Frame, FrameSource, FrameSubscription, epoch_ms};

// ============================================================================
// Constants
// ============================================================================

/// Default pattern width in pixels.
const DEFAULT_WIDTH: u32 = 320;

/// Default pattern height in pixels.
const DEFAULT_HEIGHT: u32 = 240;

/// Default production rate in frames per second.
const DEFAULT_FPS: f64 = 5.0;

/// JPEG quality for encoded frames.
const JPEG_QUALITY: u8 = 80;

/// Fastest pacing period a rate change can produce.
const MIN_FRAME_PERIOD: Duration = Duration::from_nanos(1);

/// Slowest pacing period; out-of-range rates settle here.
const MAX_FRAME_PERIOD: Duration = Duration::from_secs(3600);

// ============================================================================
// TestPatternSource
// ============================================================================

/// Frame source that synthesizes a moving gradient.
///
/// Every `open` call yields an independent subscription with its own pacing
/// clock and frame counter.
#[derive(Debug, Clone)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    fps: f64,
}

impl TestPatternSource {
    /// Creates a pattern source with explicit dimensions and frame rate.
    ///
    /// Subscriptions pace themselves at `1/fps` seconds per frame, clamped
    /// to the supported pacing window; non-finite or non-positive rates
    /// settle on the slowest cadence.
    #[inline]
    #[must_use]
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self { width, height, fps }
    }
}

impl Default for TestPatternSource {
    /// 320×240 at 5 FPS, matching the typical demo feed.
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_FPS)
    }
}

#[async_trait]
impl FrameSource for TestPatternSource {
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSubscription>> {
        debug!(url, fps = self.fps, "opening test pattern subscription");
        Ok(Box::new(PatternSubscription::new(
            self.width,
            self.height,
            self.fps,
        )))
    }
}

// ============================================================================
// PatternSubscription
// ============================================================================

/// Live subscription producing paced gradient frames.
struct PatternSubscription {
    width: u32,
    height: u32,
    /// Tick period at rate factor 1.0.
    base_period: Duration,
    ticker: Interval,
    frame_index: u64,
    closed: bool,
}

impl PatternSubscription {
    fn new(width: u32, height: u32, fps: f64) -> Self {
        let base_period = bounded_period(1.0 / fps);
        Self {
            width,
            height,
            base_period,
            ticker: paced(base_period),
            frame_index: 0,
            closed: false,
        }
    }
}

#[async_trait]
impl FrameSubscription for PatternSubscription {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            return Ok(None);
        }

        self.ticker.tick().await;
        let image = render_pattern(self.width, self.height, self.frame_index);
        self.frame_index += 1;

        Ok(Some(Frame::new(encode_jpeg(&image)?, epoch_ms())))
    }

    async fn set_rate(&mut self, factor: f64) {
        self.ticker = paced(bounded_period(self.base_period.as_secs_f64() / factor));
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Converts seconds-per-frame into a period inside the pacing window.
///
/// Sub-nanosecond inputs settle on the fastest period; non-finite, negative,
/// and overflowing inputs on the slowest. [`Interval`] construction therefore
/// never sees a zero or unrepresentable duration, whatever rate arithmetic
/// produced it.
fn bounded_period(seconds: f64) -> Duration {
    match Duration::try_from_secs_f64(seconds) {
        Ok(period) => period.clamp(MIN_FRAME_PERIOD, MAX_FRAME_PERIOD),
        Err(_) => MAX_FRAME_PERIOD,
    }
}

fn paced(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders one pattern frame: a red/green gradient over the image plane with
/// a blue phase that advances per frame, so consecutive frames differ.
fn render_pattern(width: u32, height: u32, frame_index: u64) -> RgbImage {
    let phase = (frame_index * 8 % 256) as u32;
    RgbImage::from_fn(width, height, |x, y| {
        let r = (y * 255 / height.max(1)) as u8;
        let g = (x * 255 / width.max(1)) as u8;
        let b = (((x + y) * 255 / (width + height).max(1) + phase) % 256) as u8;
        image::Rgb([r, g, b])
    })
}

/// Encodes an RGB image as JPEG.
fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode_image(image)
        .map_err(|e| Error::source(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

// ============================================================================
// Tests
// ============================================================================
