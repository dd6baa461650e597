//! The gateway trait all agent backends implement

use async_trait::async_trait;
use dactyl_core::Result;

use crate::{AgentReply, Role};

/// Opaque boundary through which all LLM calls are made
///
/// Implementations must be stateless across calls: the full context for a
/// round lives in the prompt. `round` is the 1-based round number, carried
/// so failures and logs can name the round they belong to.
///
/// The loop engine is generic over this trait; tests drive it with stub
/// implementations instead of a live provider.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Invoke one agent with a fully rendered prompt, returning its raw output
    async fn invoke(&self, role: Role, prompt: &str, round: usize) -> Result<AgentReply>;
}

#[async_trait]
impl<'a, T: AgentGateway + ?Sized> AgentGateway for &'a T {
    async fn invoke(&self, role: Role, prompt: &str, round: usize) -> Result<AgentReply> {
        (**self).invoke(role, prompt, round).await
    }
}
