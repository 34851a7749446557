//! Hosted-platform room client.
//!
//! Joins a named room on the hosted real-time platform. The participant and
//! track roster is kept in sync by polling the platform's room service; the
//! media plane (decoded video frames, mixed remote audio, and the agent's
//! outgoing audio) flows through attachment handles that the platform's
//! media bridge drives. First-party code never touches transport or codecs.

use super::audio::{AudioFeed, AudioFrame, AudioStream};
use super::participant::{
    RemoteAudioTrack, RemoteParticipant, RemoteTrack, RemoteVideoTrack, TrackPublication,
};
use super::room::RoomConnection;
use super::video::VideoFeed;
use super::{ConnectionState, TrackKind};
use crate::config::RoomSettings;
use crate::error::{BlikkError, Result};
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::RoomClient;
use livekit_protocol as proto;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A connection to a room on the hosted platform.
pub struct HostedRoom {
    room_name: String,
    identity: String,
    token: String,
    state: Mutex<ConnectionState>,
    roster: Mutex<Vec<RemoteParticipant>>,
    video_feeds: Mutex<HashMap<String, VideoFeed>>,
    audio_in: AudioFeed,
    audio_out: AudioFeed,
    client: RoomClient,
    poll_interval: Duration,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl HostedRoom {
    /// Join `room_name` as `identity`.
    ///
    /// Mints a join token from the configured API key and secret, performs
    /// an initial roster fetch, then keeps the roster fresh in a background
    /// task until [`RoomConnection::disconnect`] is called.
    pub async fn connect(
        settings: &RoomSettings,
        room_name: &str,
        identity: &str,
    ) -> Result<Arc<Self>> {
        settings.validate()?;

        let token = join_token(settings, room_name, identity)?;
        let client = RoomClient::with_api_key(
            &settings.service_url(),
            &settings.api_key,
            &settings.api_secret,
        );

        let room = Arc::new(Self {
            room_name: room_name.to_string(),
            identity: identity.to_string(),
            token,
            state: Mutex::new(ConnectionState::Connecting),
            roster: Mutex::new(Vec::new()),
            video_feeds: Mutex::new(HashMap::new()),
            audio_in: AudioFeed::new(),
            audio_out: AudioFeed::new(),
            client,
            poll_interval: Duration::from_millis(settings.roster_poll_ms),
            refresh_task: Mutex::new(None),
        });

        room.refresh_roster().await?;
        *lock(&room.state) = ConnectionState::Connected;
        info!("connected to room '{}' as '{}'", room_name, identity);

        // The loop holds only a weak handle so dropping the room without an
        // explicit disconnect still winds the task down.
        let task = tokio::spawn(refresh_loop(
            Arc::downgrade(&room),
            room.poll_interval,
        ));
        *lock(&room.refresh_task) = Some(task);

        Ok(room)
    }

    /// The join token the media bridge uses to attach to this room.
    pub fn join_token(&self) -> &str {
        &self.token
    }

    /// Attachment point for decoded frames of one video track. The roster
    /// marks the publication as subscribed once a feed is attached.
    pub fn attach_video_feed(&self, track_sid: &str) -> VideoFeed {
        let mut feeds = lock(&self.video_feeds);
        feeds
            .entry(track_sid.to_string())
            .or_insert_with(VideoFeed::new)
            .clone()
    }

    /// Attachment point for the mixed remote audio heard in the room.
    pub fn audio_ingress(&self) -> AudioFeed {
        self.audio_in.clone()
    }

    /// Audio the agent publishes, for the media bridge to carry outward.
    pub fn published_audio(&self) -> AudioStream {
        self.audio_out.subscribe()
    }

    async fn refresh_roster(&self) -> Result<()> {
        let infos = self
            .client
            .list_participants(&self.room_name)
            .await
            .map_err(|e| BlikkError::RoomService(e.to_string()))?;

        let feeds = lock(&self.video_feeds).clone();
        let roster: Vec<RemoteParticipant> = infos
            .iter()
            .filter(|p| p.identity != self.identity)
            .map(|p| self.map_participant(p, &feeds))
            .collect();

        debug!(
            "room '{}' roster: {} remote participant(s)",
            self.room_name,
            roster.len()
        );
        *lock(&self.roster) = roster;
        Ok(())
    }

    fn map_participant(
        &self,
        info: &proto::ParticipantInfo,
        feeds: &HashMap<String, VideoFeed>,
    ) -> RemoteParticipant {
        let mut participant = RemoteParticipant::new(info.identity.clone(), info.name.clone());
        for track in &info.tracks {
            let kind = if track.r#type == proto::TrackType::Video as i32 {
                TrackKind::Video
            } else if track.r#type == proto::TrackType::Audio as i32 {
                TrackKind::Audio
            } else {
                continue;
            };

            let mut publication = TrackPublication::new(track.sid.clone(), track.name.clone(), kind)
                .with_muted(track.muted);
            publication = match kind {
                TrackKind::Video => match feeds.get(&track.sid) {
                    Some(feed) => publication.with_track(RemoteTrack::Video(
                        RemoteVideoTrack::new(track.sid.clone(), feed.clone()),
                    )),
                    None => publication,
                },
                // Remote audio arrives premixed; every subscribed audio
                // publication hands out the room-wide ingress feed.
                TrackKind::Audio => publication.with_track(RemoteTrack::Audio(
                    RemoteAudioTrack::new(track.sid.clone(), self.audio_in.clone()),
                )),
            };
            participant = participant.with_publication(publication);
        }
        participant
    }
}

#[async_trait]
impl RoomConnection for HostedRoom {
    fn name(&self) -> String {
        self.room_name.clone()
    }

    fn connection_state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        lock(&self.roster).clone()
    }

    fn subscribe_audio(&self) -> AudioStream {
        self.audio_in.subscribe()
    }

    async fn publish_audio(&self, frame: AudioFrame) -> Result<()> {
        if !self.connection_state().is_connected() {
            return Err(BlikkError::Room(format!(
                "cannot publish audio: room '{}' is {}",
                self.room_name,
                self.connection_state()
            )));
        }
        self.audio_out.publish(frame);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let previous = {
            let mut state = lock(&self.state);
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        };
        if previous != ConnectionState::Disconnected {
            info!("disconnecting from room '{}'", self.room_name);
        }
        if let Some(task) = lock(&self.refresh_task).take() {
            task.abort();
        }
        Ok(())
    }
}

/// Keep the roster fresh until the room disconnects or is dropped. Roster
/// errors are transient: the state drops to Reconnecting and polling
/// continues.
async fn refresh_loop(room: std::sync::Weak<HostedRoom>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(room) = room.upgrade() else {
            return;
        };
        if room.connection_state() == ConnectionState::Disconnected {
            return;
        }
        match room.refresh_roster().await {
            Ok(()) => {
                let mut state = lock(&room.state);
                if *state == ConnectionState::Reconnecting {
                    info!("room '{}' roster polling recovered", room.room_name);
                }
                if *state != ConnectionState::Disconnected {
                    *state = ConnectionState::Connected;
                }
            }
            Err(e) => {
                warn!("room '{}' roster refresh failed: {}", room.room_name, e);
                let mut state = lock(&room.state);
                if *state != ConnectionState::Disconnected {
                    *state = ConnectionState::Reconnecting;
                }
            }
        }
    }
}

/// Mint a join token granting this agent publish and subscribe access.
fn join_token(settings: &RoomSettings, room_name: &str, identity: &str) -> Result<String> {
    let token = AccessToken::with_api_key(&settings.api_key, &settings.api_secret)
        .with_identity(identity)
        .with_name(identity)
        .with_grants(VideoGrants {
            room_join: true,
            room: room_name.to_string(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            ..Default::default()
        })
        .with_ttl(Duration::from_secs(settings.token_ttl_seconds));

    Ok(token.to_jwt()?)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
