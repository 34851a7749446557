//! In-process loopback room.
//!
//! Used by tests and direct development runs: participants, tracks, and
//! media are injected programmatically instead of arriving from a hosted
//! platform.

use super::audio::{AudioFeed, AudioFrame, AudioStream};
use super::participant::{RemoteParticipant, RemoteTrack, RemoteVideoTrack, TrackPublication};
use super::room::RoomConnection;
use super::video::VideoFeed;
use super::{ConnectionState, TrackKind};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A loopback room whose state is driven by the caller.
pub struct LocalRoom {
    name: String,
    state: Mutex<ConnectionState>,
    participants: Mutex<Vec<RemoteParticipant>>,
    audio_in: AudioFeed,
    published_tx: mpsc::UnboundedSender<AudioFrame>,
    published_rx: Mutex<Option<mpsc::UnboundedReceiver<AudioFrame>>>,
}

impl LocalRoom {
    pub fn new(name: impl Into<String>) -> Self {
        let (published_tx, published_rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            state: Mutex::new(ConnectionState::Connected),
            participants: Mutex::new(Vec::new()),
            audio_in: AudioFeed::new(),
            published_tx,
            published_rx: Mutex::new(Some(published_rx)),
        }
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Add a participant with no publications yet.
    pub fn add_participant(&self, identity: impl Into<String>) {
        let identity = identity.into();
        let mut participants = lock(&self.participants);
        if !participants.iter().any(|p| p.identity == identity) {
            participants.push(RemoteParticipant::new(identity.clone(), identity));
        }
    }

    /// Add a video publication without a subscribed track.
    pub fn add_video_publication(&self, identity: &str, sid: &str) {
        self.add_publication(identity, TrackPublication::new(sid, "camera", TrackKind::Video));
    }

    /// Publish a subscribed video track for a participant and return the
    /// feed handle used to push frames into it.
    pub fn publish_video_track(&self, identity: &str, sid: &str) -> VideoFeed {
        let feed = VideoFeed::new();
        let track = RemoteTrack::Video(RemoteVideoTrack::new(sid, feed.clone()));
        self.add_publication(
            identity,
            TrackPublication::new(sid, "camera", TrackKind::Video).with_track(track),
        );
        feed
    }

    fn add_publication(&self, identity: &str, publication: TrackPublication) {
        let mut participants = lock(&self.participants);
        match participants.iter().position(|p| p.identity == identity) {
            Some(i) => {
                let existing = participants.remove(i);
                participants.insert(i, existing.with_publication(publication));
            }
            None => {
                participants.push(
                    RemoteParticipant::new(identity, identity).with_publication(publication),
                );
            }
        }
    }

    /// Handle for pushing remote speech into the room.
    pub fn audio_ingress(&self) -> AudioFeed {
        self.audio_in.clone()
    }

    /// Take the receiver collecting everything the agent publishes.
    /// Can only be taken once.
    pub fn take_published_audio(&self) -> Option<mpsc::UnboundedReceiver<AudioFrame>> {
        lock(&self.published_rx).take()
    }
}

#[async_trait]
impl RoomConnection for LocalRoom {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        lock(&self.participants).clone()
    }

    fn subscribe_audio(&self) -> AudioStream {
        self.audio_in.subscribe()
    }

    async fn publish_audio(&self, frame: AudioFrame) -> Result<()> {
        let _ = self.published_tx.send(frame);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.set_connection_state(ConnectionState::Disconnected);
        Ok(())
    }
}

/// Lock a mutex, recovering from poisoning. State behind these locks stays
/// valid even if a holder panicked mid-update.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::{PixelFormat, VideoFrame};

    #[tokio::test]
    async fn test_roster_snapshot() {
        let room = LocalRoom::new("test-room");
        room.add_participant("alice");
        room.add_video_publication("alice", "TR_1");

        let participants = room.remote_participants();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].track_publications().len(), 1);
        assert!(participants[0].track_publications()[0].track().is_none());
    }

    #[tokio::test]
    async fn test_publish_video_track_delivers_frames() {
        let room = LocalRoom::new("test-room");
        let feed = room.publish_video_track("bob", "TR_2");

        let participants = room.remote_participants();
        let track = participants[0].track_publications()[0]
            .track()
            .cloned()
            .expect("track should be subscribed");

        let mut frames = match track {
            RemoteTrack::Video(t) => t.frames(),
            RemoteTrack::Audio(_) => panic!("expected video"),
        };
        feed.publish(VideoFrame::new(2, 2, PixelFormat::Rgba, vec![0; 16], 5));
        assert_eq!(frames.next().await.map(|f| f.timestamp_us), Some(5));
    }

    #[tokio::test]
    async fn test_disconnect_changes_state() {
        let room = LocalRoom::new("test-room");
        assert!(room.connection_state().is_connected());
        room.disconnect().await.unwrap();
        assert_eq!(room.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_published_audio_is_collected() {
        let room = LocalRoom::new("test-room");
        let mut published = room.take_published_audio().unwrap();

        room.publish_audio(AudioFrame::mono16(vec![1, 2], 24000))
            .await
            .unwrap();

        let frame = published.recv().await.unwrap();
        assert_eq!(frame.samples.as_slice(), &[1, 2]);
    }
}
