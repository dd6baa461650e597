//! # dactyl-orchestrator
//!
//! The feedback loop controller for Dactyl.
//!
//! This crate provides:
//! - A pure state machine for the generate-validate-revise control flow
//! - The async loop engine that drives it against an [`dactyl_agent::AgentGateway`]
//! - The escalation policy mapping retry counts to prompt tone
//! - Prompt construction for both roles
//! - The durable NDJSON round log and final poem output

mod escalation;
mod flow;
mod prompt;
mod round_log;
mod state_machine;

pub use escalation::{escalate, MAX_ANGER_LEVEL};
pub use flow::{FeedbackLoop, LoopResult, SingleRoundReport};
pub use prompt::{build_generation_prompt, build_validation_prompt, PromptTemplates};
pub use round_log::{write_final_poem, LogRecord, RoundLog};
pub use state_machine::{transition, Action, Event, State};
