//! OpenRouter chat-completions client
//!
//! Key design: each invocation is completely stateless. No conversation
//! history is kept - the caller renders everything the agent needs into the
//! prompt.
//!
//! Rate limits (429) and server errors (5xx) are retried here with bounded
//! exponential backoff. That is the only retry layer in the system: the loop
//! engine above treats any error from this client as fatal to the run.

use async_trait::async_trait;
use dactyl_core::config::GatewayConfig;
use dactyl_core::{DactylError, Result};
use std::time::Duration;

use crate::gateway::AgentGateway;
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::{AgentReply, Role};

const DEFAULT_MAX_TOKENS: usize = 2000;

// Rate limit retry configuration
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Gateway client for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: GatewayConfig,
    max_tokens: usize,
}

impl OpenRouterClient {
    /// Create a new client from explicit configuration
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AgentGateway for OpenRouterClient {
    async fn invoke(&self, role: Role, prompt: &str, round: usize) -> Result<AgentReply> {
        tracing::info!(
            "Invoking {} for round {} with model {}",
            role,
            round,
            self.config.model
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        // Retry loop with exponential backoff for rate limits
        let mut retries = 0;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            tracing::debug!(
                "Sending {} request (attempt {})",
                role,
                retries + 1
            );

            let response = self
                .http
                .post(self.endpoint())
                .bearer_auth(&self.config.api_key)
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    DactylError::gateway(round, format!("Failed to send request: {}", e))
                })?;

            let status = response.status();

            // Handle rate limit (429) with retry
            if status.as_u16() == 429 {
                retries += 1;

                if retries > MAX_RETRIES {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown".to_string());
                    return Err(DactylError::gateway(
                        round,
                        format!(
                            "Rate limit exceeded after {} retries. Last error: {}",
                            MAX_RETRIES, error_text
                        ),
                    ));
                }

                // Parse retry-after header if present, otherwise use exponential backoff
                let wait_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(backoff_secs);

                tracing::warn!(
                    "Rate limited (429). Waiting {} seconds before retry {}/{}",
                    wait_secs,
                    retries,
                    MAX_RETRIES
                );

                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            // Handle other errors
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());

                // Retry on 5xx errors
                if status.is_server_error() && retries < MAX_RETRIES {
                    retries += 1;
                    tracing::warn!(
                        "Server error ({}). Waiting {} seconds before retry {}/{}",
                        status,
                        backoff_secs,
                        retries,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                return Err(DactylError::gateway(
                    round,
                    format!("Provider error {}: {}", status, error_text),
                ));
            }

            // Success - parse response
            let chat_response: ChatResponse = response.json().await.map_err(|e| {
                DactylError::gateway(round, format!("Failed to parse response: {}", e))
            })?;

            let text = chat_response
                .choices
                .first()
                .map(|choice| choice.message.content.clone())
                .ok_or_else(|| DactylError::gateway(round, "No choices in response"))?;

            let usage = chat_response.usage;

            if let Some(ref usage_info) = usage {
                tracing::info!(
                    "{} round {} complete ({} chars, {} prompt tokens, {} completion tokens)",
                    role,
                    round,
                    text.len(),
                    usage_info.prompt_tokens,
                    usage_info.completion_tokens
                );
            } else {
                tracing::info!("{} round {} complete ({} chars)", role, round, text.len());
            }

            return Ok(AgentReply { text, usage });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> GatewayConfig {
        GatewayConfig {
            base_url: base_url.to_string(),
            api_key: "sk-or-test".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
        }
    }

    #[test]
    fn test_endpoint_joins_path() {
        let client = OpenRouterClient::new(test_config("https://openrouter.ai/api/v1"));
        assert_eq!(
            client.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenRouterClient::new(test_config("https://openrouter.ai/api/v1/"));
        assert_eq!(
            client.endpoint(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_client_builder() {
        let client = OpenRouterClient::new(test_config("https://example.test")).with_max_tokens(800);
        assert_eq!(client.max_tokens, 800);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_gateway_error() {
        let client = OpenRouterClient::new(test_config("http://127.0.0.1:1"));
        let result = client.invoke(Role::Poet, "write a poem", 1).await;
        match result {
            Err(DactylError::Gateway { round, .. }) => assert_eq!(round, 1),
            other => panic!("expected gateway error, got {:?}", other.map(|r| r.text)),
        }
    }
}
