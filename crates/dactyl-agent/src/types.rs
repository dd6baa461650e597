//! Type definitions for gateway interactions

use serde::{Deserialize, Serialize};

/// Token usage information reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: usize,
    #[serde(default)]
    pub completion_tokens: usize,
}

impl Usage {
    /// Accumulate another call's usage into this total
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Opaque reply from one agent invocation
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// The agent's output text, uninterpreted
    pub text: String,
    /// Token usage if the provider reported it
    pub usage: Option<Usage>,
}

/// Chat-completions request format (OpenAI-compatible)
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: usize,
    pub messages: Vec<ChatMessage>,
}

/// Single message in a chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completions response format
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

/// One completion choice in a response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
}

/// The assistant message inside a choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponseMessage {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let mut total = Usage::default();
        total.add(&Usage {
            prompt_tokens: 100,
            completion_tokens: 40,
        });
        total.add(&Usage {
            prompt_tokens: 50,
            completion_tokens: 10,
        });
        assert_eq!(total.prompt_tokens, 150);
        assert_eq!(total.completion_tokens, 50);
    }

    #[test]
    fn test_response_parses_provider_shape() {
        let raw = r#"{
            "id": "gen-123",
            "choices": [{"message": {"role": "assistant", "content": "Higgledy piggledy"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices[0].message.content, "Higgledy piggledy");
        assert_eq!(response.usage.unwrap().completion_tokens, 7);
    }

    #[test]
    fn test_response_without_usage() {
        let raw = r#"{"choices": [{"message": {"content": "ok"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(response.usage.is_none());
    }
}
