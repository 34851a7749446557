//! Prompt templates for Blikk.
//!
//! Defaults can be overridden from the configuration file's `[prompts]`
//! section.

use serde::{Deserialize, Serialize};

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
}

/// Prompts defining the assistant's persona and greeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// Standing instructions sent with every model call.
    pub instructions: String,
    /// One-off instructions for the greeting spoken on session start.
    pub greeting: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            instructions: "Your name is Alloy. You are a funny, witty bot with vision \
                capabilities. Your interface with users will be voice and vision. \
                Respond with short and concise answers. Avoid using unpronounceable \
                punctuation or emojis. When users ask you to look at something or \
                describe what you see, call the analyze_image function to use your \
                vision capabilities."
                .to_string(),
            greeting: "Greet the user warmly and let them know you can see and hear them."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_voice_friendly() {
        let prompts = Prompts::default();
        assert!(prompts.assistant.instructions.contains("analyze_image"));
        assert!(prompts.assistant.greeting.contains("see and hear"));
    }

    #[test]
    fn test_overrides_from_toml() {
        let prompts: Prompts = toml::from_str(
            r#"
            [assistant]
            greeting = "Say hi."
            "#,
        )
        .unwrap();
        assert_eq!(prompts.assistant.greeting, "Say hi.");
        assert!(prompts.assistant.instructions.contains("Alloy"));
    }
}
