//! The voice session pipeline.
//!
//! Wires the speech services together over a room connection: remote audio
//! is gated for speech, buffered into utterances, transcribed, answered
//! through the chat runner, synthesized, and published back into the room.

use super::runner::ReplyGenerator;
use crate::error::Result;
use crate::rtc::{AudioStream, RoomConnection};
use crate::services::{SpeechEvent, SpeechGate, SpeechSynthesizer, SpeechToText, UtteranceBuffer};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Minimum utterance length worth transcribing, in seconds.
const DEFAULT_MIN_UTTERANCE_SECS: f32 = 0.1;

/// A configured but not yet running voice session.
pub struct AgentSession {
    gate: SpeechGate,
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn ReplyGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
    utterance: UtteranceBuffer,
    min_utterance_secs: f32,
}

impl AgentSession {
    pub fn new(
        gate: SpeechGate,
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn ReplyGenerator>,
        tts: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            gate,
            stt,
            llm,
            tts,
            utterance: UtteranceBuffer::new(16000, 1),
            min_utterance_secs: DEFAULT_MIN_UTTERANCE_SECS,
        }
    }

    /// Replace the utterance buffer (pre-speech padding, max duration).
    pub fn with_utterance_buffer(mut self, buffer: UtteranceBuffer) -> Self {
        self.utterance = buffer;
        self
    }

    pub fn with_min_utterance_secs(mut self, secs: f32) -> Self {
        self.min_utterance_secs = secs;
        self
    }

    /// Start the pipeline over the room's remote audio and return a handle
    /// for speaking and shutdown.
    pub async fn start(self, room: Arc<dyn RoomConnection>) -> Result<SessionHandle> {
        let audio = room.subscribe_audio();
        let llm = Arc::clone(&self.llm);
        let tts = Arc::clone(&self.tts);
        let task = tokio::spawn(run_pipeline(self, audio, Arc::clone(&room)));
        Ok(SessionHandle {
            task,
            llm,
            tts,
            room,
        })
    }
}

/// Handle to a running session.
pub struct SessionHandle {
    task: JoinHandle<()>,
    llm: Arc<dyn ReplyGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
    room: Arc<dyn RoomConnection>,
}

impl SessionHandle {
    /// Generate a reply following one-off instructions and speak it.
    pub async fn generate_reply(&self, instructions: &str) -> Result<()> {
        let text = self.llm.reply_with_instructions(instructions).await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        self.speak(&text).await
    }

    /// Synthesize and publish a literal line of text.
    pub async fn say(&self, text: &str) -> Result<()> {
        self.speak(text).await
    }

    async fn speak(&self, text: &str) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        self.room.publish_audio(audio).await
    }

    /// Stop the pipeline task and wait for it to wind down.
    pub async fn close(self) {
        self.task.abort();
        match self.task.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!("session pipeline task failed: {}", e),
        }
    }
}

async fn run_pipeline(mut session: AgentSession, mut audio: AudioStream, room: Arc<dyn RoomConnection>) {
    info!("voice session pipeline started");

    while let Some(frame) = audio.next().await {
        if frame.sample_rate != session.utterance.sample_rate() {
            session.utterance.set_sample_rate(frame.sample_rate);
        }

        let events = session.gate.process(&frame.samples);
        session.utterance.append(&frame.samples);
        if !session.gate.is_speaking() && events.is_empty() {
            session.utterance.trim_to_pre_speech();
        }

        for event in events {
            match event {
                SpeechEvent::Started => debug!("user started speaking"),
                SpeechEvent::Stopped => {
                    // A failed turn is transient: log it and keep listening.
                    if let Err(e) = take_turn(&mut session, &room).await {
                        warn!("voice turn failed: {}", e);
                    }
                }
            }
        }
    }

    info!("audio stream ended, session pipeline exiting");
}

/// Transcribe the buffered utterance, generate a reply, speak it.
async fn take_turn(session: &mut AgentSession, room: &Arc<dyn RoomConnection>) -> Result<()> {
    if session.utterance.duration_secs() < session.min_utterance_secs {
        debug!("utterance too short, skipping transcription");
        session.utterance.clear();
        return Ok(());
    }

    let wav = session.utterance.take_as_wav();
    let transcription = session.stt.transcribe(&wav).await?;
    let text = transcription.text.trim().to_string();
    if text.is_empty() {
        debug!("empty transcription, skipping turn");
        return Ok(());
    }

    info!("user said: {}", text);
    let reply = session.llm.reply_to(&text).await?;
    if reply.trim().is_empty() {
        return Ok(());
    }

    debug!("speaking reply: {}", reply);
    let audio = session.tts.synthesize(&reply).await?;
    room.publish_audio(audio).await
}
