//! Decoded video frames and frame streams.

use std::sync::Arc;
use tokio::sync::broadcast;

/// Default capacity for a video frame feed. Consumers that fall behind skip
/// ahead to the most recent frames rather than buffering unboundedly.
const FEED_CAPACITY: usize = 16;

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, the decoder's native output.
    I420,
    /// Packed 8-bit RGBA.
    Rgba,
}

/// A single decoded video frame.
///
/// The pixel buffer is shared, so cloning a frame is cheap and the cached
/// "latest frame" never copies pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Arc<Vec<u8>>,
    /// Capture timestamp in microseconds.
    pub timestamp_us: i64,
}

impl VideoFrame {
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        timestamp_us: i64,
    ) -> Self {
        Self {
            width,
            height,
            format,
            data: Arc::new(data),
            timestamp_us,
        }
    }

    /// Size of the pixel buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Publisher side of a video track's frame delivery.
///
/// The platform's media bridge pushes decoded frames in; any number of
/// consumers subscribe and receive them as a [`VideoStream`].
#[derive(Clone)]
pub struct VideoFeed {
    tx: broadcast::Sender<VideoFrame>,
}

impl VideoFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Deliver a frame to all current subscribers. Frames published with no
    /// subscribers are dropped.
    pub fn publish(&self, frame: VideoFrame) {
        let _ = self.tx.send(frame);
    }

    pub fn subscribe(&self) -> VideoStream {
        VideoStream {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for VideoFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFeed")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

/// A stream of decoded frames from one video track.
pub struct VideoStream {
    rx: broadcast::Receiver<VideoFrame>,
}

impl VideoStream {
    /// Receive the next frame, or `None` once the track's feed is gone.
    ///
    /// A slow consumer that lags behind the feed skips the missed frames;
    /// only the freshest frames matter to every current use.
    pub async fn next(&mut self) -> Option<VideoFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::trace!("video stream lagged, skipped {} frames", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
