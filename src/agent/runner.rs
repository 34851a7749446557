//! Chat runner with tool calling loop.

use super::tools::{parse_tool_call, tool_definitions, ToolContext};
use crate::config::LlmSettings;
use crate::error::{BlikkError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, info};

/// Produces assistant replies for a conversation.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Reply to something the user said. The exchange joins the history.
    async fn reply_to(&self, user_text: &str) -> Result<String>;

    /// Produce a reply following one-off instructions (e.g. the greeting).
    /// The reply joins the history; the instructions do not.
    async fn reply_with_instructions(&self, instructions: &str) -> Result<String>;
}

/// Tool-calling chat loop over the OpenAI chat API.
///
/// Keeps the rolling conversation history and executes the assistant's tool
/// calls between model rounds.
pub struct ChatRunner {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    instructions: String,
    tools: ToolContext,
    max_tool_iterations: usize,
    history: Mutex<Vec<ChatCompletionRequestMessage>>,
}

impl ChatRunner {
    pub fn new(settings: &LlmSettings, instructions: impl Into<String>, tools: ToolContext) -> Self {
        Self {
            client: create_client(),
            model: settings.model.clone(),
            instructions: instructions.into(),
            tools,
            max_tool_iterations: settings.max_tool_iterations,
            history: Mutex::new(Vec::new()),
        }
    }

    fn system_message(&self, content: &str) -> Result<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestSystemMessageArgs::default()
            .content(content.to_string())
            .build()
            .map_err(|e| BlikkError::Agent(e.to_string()))?
            .into())
    }

    fn snapshot_history(&self) -> Vec<ChatCompletionRequestMessage> {
        self.lock_history().clone()
    }

    fn push_history(&self, message: ChatCompletionRequestMessage) {
        self.lock_history().push(message);
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<ChatCompletionRequestMessage>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Execute a single tool call and return its result text.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> String {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Assistant calling tool: {} with args: {}", name, arguments);

        match parse_tool_call(name, arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        }
    }

    async fn complete(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        with_tools: bool,
    ) -> Result<async_openai::types::ChatCompletionResponseMessage> {
        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(messages);
        if with_tools {
            request.tools(tool_definitions());
        }
        let request = request
            .build()
            .map_err(|e| BlikkError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| BlikkError::OpenAI(format!("chat completion failed: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| BlikkError::Agent("No response from model".to_string()))
    }
}

#[async_trait]
impl ReplyGenerator for ChatRunner {
    async fn reply_to(&self, user_text: &str) -> Result<String> {
        self.push_history(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_text.to_string())
                .build()
                .map_err(|e| BlikkError::Agent(e.to_string()))?
                .into(),
        );

        let mut iterations = 0;
        loop {
            iterations += 1;
            if iterations > self.max_tool_iterations {
                return Err(BlikkError::Agent(format!(
                    "Assistant exceeded maximum tool iterations ({})",
                    self.max_tool_iterations
                )));
            }

            debug!("assistant turn, round {}", iterations);

            let mut messages = vec![self.system_message(&self.instructions)?];
            messages.extend(self.snapshot_history());

            let message = self.complete(messages, true).await?;

            match message.tool_calls {
                Some(ref tool_calls) if !tool_calls.is_empty() => {
                    self.push_history(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .tool_calls(tool_calls.clone())
                            .build()
                            .map_err(|e| BlikkError::Agent(e.to_string()))?
                            .into(),
                    );

                    for tool_call in tool_calls {
                        let result = self.execute_tool_call(tool_call).await;
                        self.push_history(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(&tool_call.id)
                                .content(result)
                                .build()
                                .map_err(|e| BlikkError::Agent(e.to_string()))?
                                .into(),
                        );
                    }
                }
                _ => {
                    let content = message.content.unwrap_or_default();
                    self.push_history(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(content.clone())
                            .build()
                            .map_err(|e| BlikkError::Agent(e.to_string()))?
                            .into(),
                    );
                    return Ok(content);
                }
            }
        }
    }

    async fn reply_with_instructions(&self, instructions: &str) -> Result<String> {
        let mut messages = vec![self.system_message(&self.instructions)?];
        messages.extend(self.snapshot_history());
        messages.push(self.system_message(instructions)?);

        let message = self.complete(messages, false).await?;
        let content = message.content.unwrap_or_default();

        self.push_history(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(content.clone())
                .build()
                .map_err(|e| BlikkError::Agent(e.to_string()))?
                .into(),
        );
        Ok(content)
    }
}
