//! # dactyl-agent
//!
//! The external agent gateway for Dactyl.
//!
//! Everything creative happens on the far side of this crate: the poet and
//! the critic are LLM calls through an OpenAI-compatible chat-completions
//! endpoint (OpenRouter in production). The rest of the workspace only sees
//! the [`AgentGateway`] trait and opaque reply text.
//!
//! ## Key Pattern
//!
//! Each invocation is stateless - no conversation history. Whatever context
//! the poet needs (previous poem, critic feedback, escalation tone) is baked
//! into the prompt by the caller, so a stub gateway in tests behaves exactly
//! like the real one.

mod client;
mod gateway;
mod roles;
mod types;

pub use client::OpenRouterClient;
pub use gateway::AgentGateway;
pub use roles::Role;
pub use types::{AgentReply, Usage};
