pub mod fake;
pub mod real;

use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestMessage, CreateChatCompletionResponse,
};
use async_trait::async_trait;

/// A trait that abstracts the chat-completion client used for site
/// descriptions, so tests can swap in a fake without network access.
///
/// Implementation notes:
/// - Uses `async-trait` to enable async methods in traits
/// - Uses the actual request/response types from the async_openai crate
#[async_trait]
pub trait OpenAIClientTrait: Send + Sync {
    /// Send role-tagged messages to the language model and return the
    /// complete response.
    async fn chat_completion(
        &self,
        model: String,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error>;
}

/// Flatten a request message to its text content, for request
/// verification in tests. Non-text content maps to an empty string; this
/// service only ever sends text.
pub fn message_text(message: &ChatCompletionRequestMessage) -> String {
    use async_openai::types::{
        ChatCompletionRequestSystemMessageContent,
        ChatCompletionRequestUserMessageContent,
    };
    match message {
        ChatCompletionRequestMessage::System(m) => match &m.content {
            ChatCompletionRequestSystemMessageContent::Text(text) => {
                text.clone()
            }
            _ => String::new(),
        },
        ChatCompletionRequestMessage::User(m) => match &m.content {
            ChatCompletionRequestUserMessageContent::Text(text) => {
                text.clone()
            }
            _ => String::new(),
        },
        _ => String::new(),
    }
}
