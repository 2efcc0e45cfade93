use std::fmt;

use async_trait::async_trait;
use hellochat_core::{ChatMessage, CompletionError, GenerationParams, LLMProvider, LLMResponse};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

/// OpenAI-compatible endpoint root of the Groq API.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for GroqProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqProvider")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GroqProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating GroqProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Send a single request. No retry: one turn is exactly one request.
    async fn try_send(&self, request: &serde_json::Value) -> Result<LLMResponse, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = CompletionError::from_status(status.as_u16(), &body);
            warn!("Groq API returned {status}: {error}");
            return Err(error);
        }

        let response = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CompletionError::UnknownError(e.to_string()))?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                CompletionError::UnknownError("Invalid response format: missing content".into())
            })?
            .to_string();

        let usage = response["usage"].as_object().map(|u| hellochat_core::Usage {
            prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
            completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
                .unwrap_or(0),
            total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        });

        if let Some(ref usage) = usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(LLMResponse { content, usage })
    }
}

#[async_trait]
impl LLMProvider for GroqProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<LLMResponse, CompletionError> {
        let request = json!({
            "model": params.model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });

        info!(
            "Sending request to Groq API: model={}, messages={}",
            params.model,
            messages.len()
        );

        let response = self.try_send(&request).await?;

        info!("Received response from Groq API");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hellochat_core::CompletionErrorKind;
    use mockito::Matcher;

    async fn setup() -> (mockito::ServerGuard, GroqProvider) {
        let server = mockito::Server::new_async().await;
        let provider = GroqProvider::new("test-key".to_string()).with_base_url(server.url());
        (server, provider)
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello! How can I help?"),
            ChatMessage::user("Tell me a joke"),
        ]
    }

    #[tokio::test]
    async fn sends_full_buffer_with_fixed_params() {
        let (mut server, provider) = setup().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello! How can I help?"},
                    {"role": "user", "content": "Tell me a joke"}
                ],
                "max_tokens": 1000,
                "temperature": 0.7
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Why did the **crab** cross?"}}],
                    "usage":{"prompt_tokens":12,"completion_tokens":7,"total_tokens":19}}"#,
            )
            .create_async()
            .await;

        let reply = provider
            .complete(&conversation(), &GenerationParams::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, ChatMessage::assistant("Why did the **crab** cross?"));
    }

    #[tokio::test]
    async fn maps_401_to_unauthorized() {
        let (mut server, provider) = setup().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .create_async()
            .await;

        let err = provider
            .chat(&conversation(), &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited() {
        let (mut server, provider) = setup().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let err = provider
            .chat(&conversation(), &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn other_status_carries_remote_message() {
        let (mut server, provider) = setup().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body(r#"{"error":{"message":"The model `foo` does not exist"}}"#)
            .create_async()
            .await;

        let err = provider
            .chat(&conversation(), &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::RemoteError);
        assert_eq!(err.user_message(), "API Error: The model `foo` does not exist");
    }

    #[tokio::test]
    async fn malformed_success_body_is_unknown_error() {
        let (mut server, provider) = setup().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = provider
            .chat(&conversation(), &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::UnknownError);
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let provider =
            GroqProvider::new("test-key".to_string()).with_base_url("http://127.0.0.1:1".into());

        let err = provider
            .chat(&conversation(), &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::NetworkError);
    }

    #[test]
    fn debug_output_masks_api_key() {
        let provider = GroqProvider::new("gsk_secret_value".to_string());
        let rendered = format!("{provider:?}");
        assert!(!rendered.contains("gsk_secret_value"));
        assert!(rendered.contains(DEFAULT_BASE_URL));
    }
}
