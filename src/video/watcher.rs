//! Watches the room for a remote video track and caches its frames.

use crate::agent::FrameStore;
use crate::rtc::{RemoteTrack, RemoteVideoTrack, RoomConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many one-second roster scans to make before giving up on finding a
/// video track.
pub const TRACK_SEARCH_ATTEMPTS: usize = 30;

const TRACK_SEARCH_INTERVAL: Duration = Duration::from_secs(1);

/// Backoff after a search that found nothing, before retrying the whole
/// search.
const NO_TRACK_BACKOFF: Duration = Duration::from_secs(2);

/// Backoff after the frame stream ends unexpectedly.
const STREAM_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Get the first subscribed video track from the room.
///
/// Scans the roster once per second for up to [`TRACK_SEARCH_ATTEMPTS`]
/// attempts, waiting for a participant to publish video. Returns `None`
/// once the budget is exhausted.
pub async fn find_video_track(room: &dyn RoomConnection) -> Option<RemoteVideoTrack> {
    for _ in 0..TRACK_SEARCH_ATTEMPTS {
        for participant in room.remote_participants() {
            for publication in participant.track_publications() {
                if let Some(RemoteTrack::Video(track)) = publication.track() {
                    info!("Using video track {}", track.sid());
                    return Some(track.clone());
                }
            }
        }
        tokio::time::sleep(TRACK_SEARCH_INTERVAL).await;
    }
    None
}

/// Background task that keeps the most recent decoded frame cached.
pub struct VideoWatcher {
    room: Arc<dyn RoomConnection>,
    frames: FrameStore,
}

impl VideoWatcher {
    pub fn new(room: Arc<dyn RoomConnection>, frames: FrameStore) -> Self {
        Self { room, frames }
    }

    /// Run until the room is no longer connected.
    ///
    /// Acquires a video track, consumes its frames into the cache, and
    /// treats every failure as transient: back off, then search again.
    pub async fn run(self) {
        while self.room.connection_state().is_connected() {
            let track = match find_video_track(self.room.as_ref()).await {
                Some(track) => track,
                None => {
                    debug!("No video track found, waiting...");
                    tokio::time::sleep(NO_TRACK_BACKOFF).await;
                    continue;
                }
            };

            info!("Starting video stream processing...");
            let mut stream = track.frames();
            while let Some(frame) = stream.next().await {
                self.frames.update(frame);
                if !self.room.connection_state().is_connected() {
                    break;
                }
            }

            if !self.room.connection_state().is_connected() {
                break;
            }
            warn!("video stream for track {} ended, retrying", track.sid());
            tokio::time::sleep(STREAM_RETRY_BACKOFF).await;
        }
        debug!("video watcher exiting, room no longer connected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolContext;
    use crate::rtc::{ConnectionState, LocalRoom, PixelFormat, VideoFrame};
    use tokio::time::Instant;

    fn frame(ts: i64) -> VideoFrame {
        VideoFrame::new(4, 4, PixelFormat::I420, vec![0u8; 24], ts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_returns_subscribed_track() {
        let room = LocalRoom::new("watch-test");
        room.publish_video_track("alice", "TR_cam");

        let track = find_video_track(&room).await;
        assert_eq!(track.map(|t| t.sid().to_string()), Some("TR_cam".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_ignores_unsubscribed_publications() {
        let room = LocalRoom::new("watch-test");
        // Published but not subscribed: no media is being delivered.
        room.add_video_publication("alice", "TR_cam");

        let started = Instant::now();
        assert!(find_video_track(&room).await.is_none());
        assert_eq!(started.elapsed().as_secs(), TRACK_SEARCH_ATTEMPTS as u64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_gives_up_after_thirty_one_second_attempts() {
        let room = LocalRoom::new("watch-test");

        let started = Instant::now();
        assert!(find_video_track(&room).await.is_none());
        assert_eq!(started.elapsed().as_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_picks_up_track_published_mid_search() {
        let room = Arc::new(LocalRoom::new("watch-test"));

        let searcher = {
            let room = Arc::clone(&room);
            tokio::spawn(async move { find_video_track(room.as_ref()).await })
        };

        // Let a few attempts elapse before the track appears.
        tokio::time::sleep(Duration::from_secs(5)).await;
        room.publish_video_track("bob", "TR_late");

        let track = searcher.await.unwrap();
        assert_eq!(track.map(|t| t.sid().to_string()), Some("TR_late".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_caches_latest_frame() {
        let room = Arc::new(LocalRoom::new("watch-test"));
        let feed = room.publish_video_track("alice", "TR_cam");

        let tools = ToolContext::new();
        let frames = tools.frame_store();
        let watcher = VideoWatcher::new(room.clone() as Arc<dyn RoomConnection>, frames.clone());
        let task = tokio::spawn(watcher.run());

        // Yield so the watcher can find the track and subscribe.
        tokio::time::sleep(Duration::from_millis(10)).await;

        feed.publish(frame(1));
        feed.publish(frame(2));
        feed.publish(frame(3));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(frames.latest().map(|f| f.timestamp_us), Some(3));

        task.abort();
        let _ = task.await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_exits_when_room_disconnects() {
        let room = Arc::new(LocalRoom::new("watch-test"));
        let feed = room.publish_video_track("alice", "TR_cam");

        let tools = ToolContext::new();
        let watcher =
            VideoWatcher::new(room.clone() as Arc<dyn RoomConnection>, tools.frame_store());
        let task = tokio::spawn(watcher.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        room.set_connection_state(ConnectionState::Disconnected);
        // One more frame lets the inner loop observe the state change.
        feed.publish(frame(4));

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("watcher should exit after disconnect")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_does_not_run_when_disconnected() {
        let room = Arc::new(LocalRoom::new("watch-test"));
        room.set_connection_state(ConnectionState::Disconnected);

        let tools = ToolContext::new();
        let watcher =
            VideoWatcher::new(room.clone() as Arc<dyn RoomConnection>, tools.frame_store());
        // Completes immediately; nothing to watch.
        watcher.run().await;
        assert!(!tools.frame_store().has_frame());
    }
}
