//! Room contract for Blikk.
//!
//! Models the slice of the real-time platform the assistant consumes:
//! connection state, remote participants and their track publications, and
//! decoded media streams. The hosted implementation keeps its roster in sync
//! through the platform's room service; the local implementation is an
//! in-process loopback used by tests and direct development runs.

mod audio;
mod hosted;
mod local;
mod participant;
mod room;
mod video;

pub use audio::{AudioFeed, AudioFrame, AudioStream};
pub use hosted::HostedRoom;
pub use local::LocalRoom;
pub use participant::{
    RemoteAudioTrack, RemoteParticipant, RemoteTrack, RemoteVideoTrack, TrackPublication,
};
pub use room::RoomConnection;
pub use video::{PixelFormat, VideoFeed, VideoFrame, VideoStream};

/// Connection state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Whether the room is currently usable for media and roster queries.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Kind of a published track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}
