//! Tool definitions and implementations for the assistant.

use crate::error::{BlikkError, Result};
use crate::rtc::VideoFrame;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Reply when a frame from the video feed is cached.
pub const VISION_AVAILABLE_REPLY: &str =
    "I can see the current video feed. Let me analyze what's visible.";

/// Reply when no frame has been seen yet.
pub const VISION_UNAVAILABLE_REPLY: &str =
    "I don't currently have access to any images to analyze.";

/// Available tools for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Report on the current video feed.
    AnalyzeImage { user_msg: String },
}

/// Single-slot cell holding the most recent decoded video frame.
///
/// One writer (the video watcher) overwrites it on every frame; one reader
/// (the vision tool) checks it. No history is retained.
#[derive(Clone, Default)]
pub struct FrameStore {
    inner: Arc<Mutex<Option<VideoFrame>>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached frame. Last write wins.
    pub fn update(&self, frame: VideoFrame) {
        *self.lock() = Some(frame);
    }

    /// The most recent frame, if any has been seen.
    pub fn latest(&self) -> Option<VideoFrame> {
        self.lock().clone()
    }

    pub fn has_frame(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<VideoFrame>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("has_frame", &self.has_frame())
            .finish()
    }
}

/// Tool execution context with access to the cached video frame.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    frames: FrameStore,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the frame cell, for the video watcher to write into.
    pub fn frame_store(&self) -> FrameStore {
        self.frames.clone()
    }

    /// Cache a frame for later analysis.
    pub fn update_frame(&self, frame: VideoFrame) {
        self.frames.update(frame);
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::AnalyzeImage { user_msg } => self.execute_analyze_image(user_msg).await,
        }
    }

    async fn execute_analyze_image(&self, user_msg: &str) -> Result<String> {
        info!("Message triggering vision capabilities: {}", user_msg);
        if self.frames.has_frame() {
            Ok(VISION_AVAILABLE_REPLY.to_string())
        } else {
            Ok(VISION_UNAVAILABLE_REPLY.to_string())
        }
    }
}

/// Get OpenAI function/tool definitions for the assistant.
pub fn tool_definitions() -> Vec<async_openai::types::ChatCompletionTool> {
    use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};

    vec![ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: "analyze_image".to_string(),
            description: Some(
                "Called when asked to evaluate something that would require vision \
                capabilities, for example, an image, video, or the webcam feed. Call this \
                when user asks to look at something, describe what they see, or analyze \
                an image."
                    .to_string(),
            ),
            parameters: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "user_msg": {
                        "type": "string",
                        "description": "The user message that triggered this function"
                    }
                },
                "required": ["user_msg"]
            })),
            strict: None,
        },
    }]
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| BlikkError::Agent(format!("Invalid tool arguments: {}", e)))?;

    match name {
        "analyze_image" => {
            let user_msg = args["user_msg"]
                .as_str()
                .ok_or_else(|| BlikkError::Agent("Missing 'user_msg' argument".to_string()))?
                .to_string();
            Ok(ToolCall::AnalyzeImage { user_msg })
        }
        _ => Err(BlikkError::Agent(format!("Unknown tool: {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::PixelFormat;

    fn frame(ts: i64) -> VideoFrame {
        VideoFrame::new(2, 2, PixelFormat::Rgba, vec![0u8; 16], ts)
    }

    #[tokio::test]
    async fn test_analyze_image_without_frame() {
        let context = ToolContext::new();
        let result = context
            .execute(&ToolCall::AnalyzeImage {
                user_msg: "what do you see?".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result, VISION_UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn test_analyze_image_with_frame() {
        let context = ToolContext::new();
        context.update_frame(frame(1));

        let result = context
            .execute(&ToolCall::AnalyzeImage {
                user_msg: "describe the feed".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(result, VISION_AVAILABLE_REPLY);
    }

    #[test]
    fn test_frame_store_keeps_most_recent() {
        let store = FrameStore::new();
        store.update(frame(1));
        store.update(frame(2));
        store.update(frame(3));
        assert_eq!(store.latest().map(|f| f.timestamp_us), Some(3));
    }

    #[test]
    fn test_frame_store_idempotent_under_identical_frames() {
        let store = FrameStore::new();
        let f = frame(9);
        store.update(f.clone());
        let first = store.latest();
        store.update(f.clone());
        assert_eq!(store.latest(), first);
        assert_eq!(store.latest().map(|f| f.timestamp_us), Some(9));
    }

    #[test]
    fn test_parse_analyze_image_tool() {
        let tool = parse_tool_call("analyze_image", r#"{"user_msg": "look at this"}"#).unwrap();
        match tool {
            ToolCall::AnalyzeImage { user_msg } => assert_eq!(user_msg, "look at this"),
        }
    }

    #[test]
    fn test_parse_unknown_tool() {
        assert!(parse_tool_call("take_photo", "{}").is_err());
    }

    #[test]
    fn test_parse_missing_argument() {
        assert!(parse_tool_call("analyze_image", "{}").is_err());
    }
}
