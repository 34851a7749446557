//! PCM audio frames and streams.

use std::sync::Arc;
use tokio::sync::broadcast;

/// Default capacity for an audio feed. At 20 ms a frame this buffers a bit
/// over a second of audio for a slow consumer before it starts skipping.
const FEED_CAPACITY: usize = 64;

/// A chunk of decoded PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Signed 16-bit samples, interleaved if multi-channel.
    pub samples: Arc<Vec<i16>>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    /// A mono 16-bit frame, the format every speech service here consumes.
    pub fn mono16(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            channels: 1,
        }
    }

    /// Duration of this frame in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        (self.samples.len() as f32 / self.channels as f32) / self.sample_rate as f32
    }
}

/// Publisher side of an audio delivery channel.
#[derive(Clone)]
pub struct AudioFeed {
    tx: broadcast::Sender<AudioFrame>,
}

impl AudioFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Deliver a frame to all current subscribers.
    pub fn publish(&self, frame: AudioFrame) {
        let _ = self.tx.send(frame);
    }

    pub fn subscribe(&self) -> AudioStream {
        AudioStream {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for AudioFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AudioFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFeed")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

/// A stream of PCM frames.
pub struct AudioStream {
    rx: broadcast::Receiver<AudioFrame>,
}

impl AudioStream {
    /// Receive the next frame, or `None` once the feed is gone. A lagging
    /// consumer skips missed frames.
    pub async fn next(&mut self) -> Option<AudioFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::trace!("audio stream lagged, skipped {} frames", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let frame = AudioFrame::mono16(vec![0i16; 16000], 16000);
        assert!((frame.duration_secs() - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_feed_roundtrip() {
        let feed = AudioFeed::new();
        let mut stream = feed.subscribe();

        feed.publish(AudioFrame::mono16(vec![1, 2, 3], 16000));
        let got = stream.next().await.unwrap();
        assert_eq!(got.samples.as_slice(), &[1, 2, 3]);

        drop(feed);
        assert!(stream.next().await.is_none());
    }
}
