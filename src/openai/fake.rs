use anyhow::Result;
use async_openai::types::{
    ChatChoice, ChatCompletionRequestMessage, ChatCompletionResponseMessage,
    CompletionUsage, CreateChatCompletionResponse, FinishReason, Role,
};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::openai::{message_text, OpenAIClientTrait};

/// A recorded chat-completion request, for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model_name: String,
    pub prompt_texts: Vec<String>,
}

enum FakeReply {
    Content(Option<String>),
    Failure(String),
}

/// A fake implementation of the OpenAI client for testing.
///
/// Tests control exactly what comes back, in order, without any real API
/// calls: canned text, a response with `None` content, or an outright
/// failure (to exercise the fallback path). Requests are recorded with
/// their flattened prompt texts so tests can assert on what was sent.
pub struct FakeOpenAIClient {
    replies: Mutex<Vec<FakeReply>>,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for FakeOpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeOpenAIClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(vec![]),
            requests: Mutex::new(vec![]),
        }
    }

    /// Queue a response to be returned by the fake client.
    pub fn with_response(self, response: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(FakeReply::Content(Some(response.to_string())));
        self
    }

    /// Queue multiple responses, returned in sequence.
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        for response in responses {
            self.replies
                .lock()
                .unwrap()
                .push(FakeReply::Content(Some(response.to_string())));
        }
        self
    }

    /// Queue a response whose content is `None`.
    pub fn with_none_content_response(self) -> Self {
        self.replies.lock().unwrap().push(FakeReply::Content(None));
        self
    }

    /// Queue a failed call.
    pub fn with_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(FakeReply::Failure(message.to_string()));
        self
    }
}

#[async_trait]
impl OpenAIClientTrait for FakeOpenAIClient {
    #[allow(deprecated)]
    async fn chat_completion(
        &self,
        model: String,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> Result<CreateChatCompletionResponse, anyhow::Error> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model_name: model.clone(),
            prompt_texts: messages.iter().map(message_text).collect(),
        });

        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.is_empty() {
            FakeReply::Content(Some("Fake default response".to_string()))
        } else {
            replies.remove(0)
        };

        let content = match reply {
            FakeReply::Failure(message) => {
                return Err(anyhow::anyhow!(message))
            }
            FakeReply::Content(content) => content,
        };

        let message = ChatCompletionResponseMessage {
            role: Role::Assistant,
            content,
            #[allow(deprecated)]
            function_call: None,
            tool_calls: None,
            #[allow(deprecated)]
            refusal: None,
            audio: None,
        };

        let chat_choice = ChatChoice {
            index: 0,
            message,
            finish_reason: Some(FinishReason::Stop),
            logprobs: None,
        };

        let usage = CompletionUsage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            prompt_tokens_details: None,
            completion_tokens_details: None,
        };

        Ok(CreateChatCompletionResponse {
            id: "fake_id".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model,
            system_fingerprint: Some("fake-fingerprint".to_string()),
            service_tier: None,
            choices: vec![chat_choice],
            usage: Some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::{
        ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs,
    };

    #[tokio::test]
    async fn responses_come_back_in_queued_order() -> Result<()> {
        let client = FakeOpenAIClient::new()
            .with_response("First response")
            .with_response("Second response");

        let response1 = client
            .chat_completion("gpt-3.5-turbo".to_string(), vec![])
            .await?;
        assert_eq!(
            response1.choices[0].message.content,
            Some("First response".to_string())
        );

        let response2 = client
            .chat_completion("gpt-3.5-turbo".to_string(), vec![])
            .await?;
        assert_eq!(
            response2.choices[0].message.content,
            Some("Second response".to_string())
        );

        // The queue is exhausted; the default takes over.
        let response3 = client
            .chat_completion("gpt-3.5-turbo".to_string(), vec![])
            .await?;
        assert_eq!(
            response3.choices[0].message.content,
            Some("Fake default response".to_string())
        );

        Ok(())
    }

    #[tokio::test]
    async fn requests_record_model_and_prompt_texts() -> Result<()> {
        let client = FakeOpenAIClient::new().with_response("ok");

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content("가이드 역할")
            .build()?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content("청남대 소개해줘")
            .build()?;

        client
            .chat_completion(
                "gpt-3.5-turbo".to_string(),
                vec![
                    ChatCompletionRequestMessage::System(system_msg),
                    ChatCompletionRequestMessage::User(user_msg),
                ],
            )
            .await?;

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model_name, "gpt-3.5-turbo");
        assert_eq!(
            requests[0].prompt_texts,
            vec!["가이드 역할", "청남대 소개해줘"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn queued_failure_surfaces_as_error() {
        let client = FakeOpenAIClient::new().with_failure("boom");
        let result = client
            .chat_completion("gpt-3.5-turbo".to_string(), vec![])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn none_content_response_is_supported() -> Result<()> {
        let client = FakeOpenAIClient::new().with_none_content_response();
        let response = client
            .chat_completion("gpt-3.5-turbo".to_string(), vec![])
            .await?;
        assert_eq!(response.choices[0].message.content, None);
        Ok(())
    }
}
