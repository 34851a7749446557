//! The voice assistant: persona, tool calling, and the session pipeline.
//!
//! An [`Assistant`] is an instruction set; a [`ToolContext`] carries the
//! vision tool and the cached video frame it reports on; an
//! [`AgentSession`] wires the speech services together over a room
//! connection and keeps the conversation going until the room closes.

mod runner;
mod session;
mod tools;

pub use runner::{ChatRunner, ReplyGenerator};
pub use session::{AgentSession, SessionHandle};
pub use tools::{
    parse_tool_call, tool_definitions, FrameStore, ToolCall, ToolContext,
    VISION_AVAILABLE_REPLY, VISION_UNAVAILABLE_REPLY,
};

/// The assistant's persona: a name and a set of standing instructions.
#[derive(Debug, Clone)]
pub struct Assistant {
    instructions: String,
}

impl Assistant {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}
