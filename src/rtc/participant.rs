//! Remote participants and their track publications.

use super::audio::{AudioFeed, AudioStream};
use super::video::{VideoFeed, VideoStream};
use super::TrackKind;

/// A participant in the room other than the agent itself.
#[derive(Debug, Clone)]
pub struct RemoteParticipant {
    pub identity: String,
    pub name: String,
    publications: Vec<TrackPublication>,
}

impl RemoteParticipant {
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            publications: Vec::new(),
        }
    }

    pub fn with_publication(mut self, publication: TrackPublication) -> Self {
        self.publications.push(publication);
        self
    }

    /// The tracks this participant has made available in the room.
    pub fn track_publications(&self) -> &[TrackPublication] {
        &self.publications
    }
}

/// A media stream a participant has made available.
///
/// `track` is populated only while the publication is subscribed, i.e. the
/// platform is actually delivering its media to this process.
#[derive(Debug, Clone)]
pub struct TrackPublication {
    pub sid: String,
    pub name: String,
    pub kind: TrackKind,
    pub muted: bool,
    track: Option<RemoteTrack>,
}

impl TrackPublication {
    pub fn new(sid: impl Into<String>, name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            sid: sid.into(),
            name: name.into(),
            kind,
            muted: false,
            track: None,
        }
    }

    pub fn with_track(mut self, track: RemoteTrack) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// The subscribed track, if media is being delivered for it.
    pub fn track(&self) -> Option<&RemoteTrack> {
        self.track.as_ref()
    }
}

/// A subscribed remote track.
#[derive(Debug, Clone)]
pub enum RemoteTrack {
    Audio(RemoteAudioTrack),
    Video(RemoteVideoTrack),
}

impl RemoteTrack {
    pub fn sid(&self) -> &str {
        match self {
            RemoteTrack::Audio(t) => t.sid(),
            RemoteTrack::Video(t) => t.sid(),
        }
    }

    pub fn kind(&self) -> TrackKind {
        match self {
            RemoteTrack::Audio(_) => TrackKind::Audio,
            RemoteTrack::Video(_) => TrackKind::Video,
        }
    }
}

/// A subscribed remote video track; decoded frames arrive on its feed.
#[derive(Debug, Clone)]
pub struct RemoteVideoTrack {
    sid: String,
    feed: VideoFeed,
}

impl RemoteVideoTrack {
    pub fn new(sid: impl Into<String>, feed: VideoFeed) -> Self {
        Self {
            sid: sid.into(),
            feed,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Subscribe to this track's decoded frames.
    pub fn frames(&self) -> VideoStream {
        self.feed.subscribe()
    }
}

/// A subscribed remote audio track.
#[derive(Debug, Clone)]
pub struct RemoteAudioTrack {
    sid: String,
    feed: AudioFeed,
}

impl RemoteAudioTrack {
    pub fn new(sid: impl Into<String>, feed: AudioFeed) -> Self {
        Self {
            sid: sid.into(),
            feed,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Subscribe to this track's PCM audio.
    pub fn audio(&self) -> AudioStream {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::{PixelFormat, VideoFrame};

    #[test]
    fn test_publication_without_track() {
        let publication = TrackPublication::new("TR_video1", "camera", TrackKind::Video);
        assert!(publication.track().is_none());
        assert_eq!(publication.kind, TrackKind::Video);
    }

    #[tokio::test]
    async fn test_subscribed_video_track_delivers_frames() {
        let feed = VideoFeed::new();
        let track = RemoteVideoTrack::new("TR_video1", feed.clone());
        let publication = TrackPublication::new("TR_video1", "camera", TrackKind::Video)
            .with_track(RemoteTrack::Video(track));

        let mut frames = match publication.track() {
            Some(RemoteTrack::Video(t)) => t.frames(),
            _ => panic!("expected a video track"),
        };

        feed.publish(VideoFrame::new(4, 4, PixelFormat::I420, vec![0u8; 24], 42));
        assert_eq!(frames.next().await.map(|f| f.timestamp_us), Some(42));
    }
}
