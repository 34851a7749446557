//! Speech service backends.
//!
//! Everything that performs actual inference lives behind an external
//! engine: the silero model for voice activity, Deepgram for recognition,
//! OpenAI for synthesis. This module holds the trait seams and the thin
//! clients over those engines.

pub mod deepgram;
pub mod stt;
pub mod tts;
pub mod vad;

pub use deepgram::DeepgramStt;
pub use stt::{SpeechToText, Transcription, UtteranceBuffer};
pub use tts::{OpenaiTts, SpeechSynthesizer};
pub use vad::{SileroDetector, SpeechDetector, SpeechEvent, SpeechGate};
