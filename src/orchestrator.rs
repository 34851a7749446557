//! Assistant orchestrator.
//!
//! The only place that knows every concrete backend: builds the speech
//! services from settings and runs the per-room lifecycle — connect, start
//! the session, greet, watch the video feed, idle until the room closes.

use crate::agent::{AgentSession, Assistant, ChatRunner, FrameStore, SessionHandle, ToolContext};
use crate::config::Settings;
use crate::error::Result;
use crate::rtc::RoomConnection;
use crate::services::{DeepgramStt, OpenaiTts, SileroDetector, SpeechGate, UtteranceBuffer};
use crate::video::VideoWatcher;
use crate::worker::{JobContext, JobHandler};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How often the idle loop re-checks the room's connection state.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Builds assistants and runs them against rooms.
pub struct Orchestrator {
    settings: Settings,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self { settings })
    }

    /// Wire the speech services into a session for one room.
    fn build_session(&self, tools: ToolContext) -> Result<AgentSession> {
        let settings = &self.settings;
        let assistant = Assistant::new(&settings.prompts.assistant.instructions);

        let detector = SileroDetector::new(settings.stt.sample_rate)?;
        let gate = SpeechGate::new(Box::new(detector), settings.stt.sample_rate, &settings.vad);

        let stt = Arc::new(DeepgramStt::new(&settings.stt)?);
        let llm = Arc::new(ChatRunner::new(
            &settings.llm,
            assistant.instructions(),
            tools,
        ));
        let tts = Arc::new(OpenaiTts::new(&settings.tts));

        let buffer = UtteranceBuffer::new(settings.stt.sample_rate, 1)
            .with_pre_speech_duration(settings.stt.pre_speech_secs)
            .with_max_duration(settings.stt.max_utterance_secs);

        Ok(AgentSession::new(gate, stt, llm, tts)
            .with_utterance_buffer(buffer)
            .with_min_utterance_secs(settings.stt.min_utterance_secs))
    }

    /// Run a started session against a room until the room closes.
    ///
    /// Greets the user, keeps the latest video frame cached in a background
    /// task, and idles until the connection drops; then cancels the
    /// background task and waits for it, ignoring the cancellation itself.
    pub async fn run_session(
        room: Arc<dyn RoomConnection>,
        handle: SessionHandle,
        frames: FrameStore,
        greeting: &str,
    ) -> Result<()> {
        handle.generate_reply(greeting).await?;

        let watcher = VideoWatcher::new(Arc::clone(&room), frames);
        let video_task = tokio::spawn(watcher.run());

        while room.connection_state().is_connected() {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
        info!("room '{}' no longer connected, winding down", room.name());

        video_task.abort();
        match video_task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!("video task failed: {}", e),
        }

        handle.close().await;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for Orchestrator {
    async fn handle(&self, ctx: JobContext) -> Result<()> {
        ctx.connect().await?;
        let room = ctx.room()?;
        info!("Room name: {}", room.name());

        let tools = ToolContext::new();
        let frames = tools.frame_store();

        let session = self.build_session(tools)?;
        let handle = session.start(Arc::clone(&room)).await?;

        Self::run_session(
            room,
            handle,
            frames,
            &self.settings.prompts.assistant.greeting,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ReplyGenerator;
    use crate::config::VadSettings;
    use crate::rtc::{AudioFrame, ConnectionState, LocalRoom, PixelFormat, VideoFrame};
    use crate::services::{SpeechDetector, SpeechSynthesizer, SpeechToText, Transcription};

    struct SilentDetector;

    impl SpeechDetector for SilentDetector {
        fn chunk_size(&self) -> usize {
            512
        }

        fn predict(&mut self, _chunk: &[i16]) -> Result<f32> {
            Ok(0.0)
        }
    }

    struct FixedStt;

    #[async_trait]
    impl SpeechToText for FixedStt {
        async fn transcribe(&self, _wav: &[u8]) -> Result<Transcription> {
            Ok(Transcription {
                text: String::new(),
                language: None,
                confidence: None,
            })
        }
    }

    struct FixedLlm;

    #[async_trait]
    impl ReplyGenerator for FixedLlm {
        async fn reply_to(&self, _user_text: &str) -> Result<String> {
            Ok("ok".to_string())
        }

        async fn reply_with_instructions(&self, _instructions: &str) -> Result<String> {
            Ok("hello there".to_string())
        }
    }

    struct ToneTts;

    #[async_trait]
    impl SpeechSynthesizer for ToneTts {
        async fn synthesize(&self, text: &str) -> Result<AudioFrame> {
            Ok(AudioFrame::mono16(vec![1i16; text.len()], 24000))
        }
    }

    fn mock_session() -> AgentSession {
        let settings = VadSettings {
            threshold: 0.5,
            min_speech_ms: 96,
            min_silence_ms: 96,
        };
        let gate = SpeechGate::new(Box::new(SilentDetector), 16000, &settings);
        AgentSession::new(gate, Arc::new(FixedStt), Arc::new(FixedLlm), Arc::new(ToneTts))
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_completes_after_disconnect() {
        let room = Arc::new(LocalRoom::new("job-room"));
        let mut published = room.take_published_audio().unwrap();

        let handle = mock_session()
            .start(room.clone() as Arc<dyn RoomConnection>)
            .await
            .unwrap();

        let lifecycle = {
            let room = room.clone() as Arc<dyn RoomConnection>;
            tokio::spawn(Orchestrator::run_session(
                room,
                handle,
                FrameStore::new(),
                "Greet the user warmly and let them know you can see and hear them.",
            ))
        };

        // The greeting goes out first.
        let greeting = published.recv().await.unwrap();
        assert!(!greeting.samples.is_empty());

        // Let the idle loop spin for a while, then close the room.
        tokio::time::sleep(Duration::from_secs(5)).await;
        room.set_connection_state(ConnectionState::Disconnected);

        // The lifecycle must cancel the watcher and complete without
        // hanging.
        tokio::time::timeout(Duration::from_secs(10), lifecycle)
            .await
            .expect("lifecycle should complete after disconnect")
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_caches_frames_from_video_track() {
        let room = Arc::new(LocalRoom::new("job-room"));
        let mut published = room.take_published_audio().unwrap();
        let feed = room.publish_video_track("viewer", "TR_cam");

        let handle = mock_session()
            .start(room.clone() as Arc<dyn RoomConnection>)
            .await
            .unwrap();

        let frames = FrameStore::new();
        let lifecycle = {
            let room = room.clone() as Arc<dyn RoomConnection>;
            let frames = frames.clone();
            tokio::spawn(Orchestrator::run_session(room, handle, frames, "hi"))
        };

        // Wait for the greeting so the watcher is definitely running.
        published.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        feed.publish(VideoFrame::new(2, 2, PixelFormat::Rgba, vec![0; 16], 11));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(frames.latest().map(|f| f.timestamp_us), Some(11));

        room.set_connection_state(ConnectionState::Disconnected);
        tokio::time::timeout(Duration::from_secs(10), lifecycle)
            .await
            .expect("lifecycle should complete")
            .unwrap()
            .unwrap();
    }
}
