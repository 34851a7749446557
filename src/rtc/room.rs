//! The room connection seam.

use super::audio::{AudioFrame, AudioStream};
use super::participant::RemoteParticipant;
use super::ConnectionState;
use crate::error::Result;
use async_trait::async_trait;

/// A live connection to a room.
///
/// Roster queries return point-in-time snapshots; callers never observe
/// partially updated state and never hold a lock across an await.
#[async_trait]
pub trait RoomConnection: Send + Sync {
    /// The room's name.
    fn name(&self) -> String;

    /// Current connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Snapshot of the remote participants and their track publications.
    fn remote_participants(&self) -> Vec<RemoteParticipant>;

    /// Subscribe to the mixed remote audio heard in the room.
    fn subscribe_audio(&self) -> AudioStream;

    /// Publish a chunk of the agent's own audio into the room.
    async fn publish_audio(&self, frame: AudioFrame) -> Result<()>;

    /// Leave the room. Idempotent.
    async fn disconnect(&self) -> Result<()>;
}
