//! Loop engine - drives the generate-validate-revise cycle
//!
//! The engine owns the run: it feeds events into the pure state machine,
//! executes the actions that come back (gateway calls, logging, persisting
//! the final poem), and holds the `PoemState` that carries poem, feedback
//! and retry count across rounds.
//!
//! Exactly one gateway call is in flight at any time. Every call gets a
//! caller-configured timeout; expiry and every other gateway failure abort
//! the run, they are never retried here. Cancellation is checked between
//! rounds only, never mid-call.

use chrono::Utc;
use dactyl_agent::{AgentGateway, Role, Usage};
use dactyl_core::config::LoopDefaults;
use dactyl_core::{render_issues, DactylError, FinalOutcome, PoemState, Result};
use dactyl_validation::{parse_verdict, CriticVerdict};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::prompt::{build_generation_prompt, build_validation_prompt, PromptTemplates};
use crate::round_log::{write_final_poem, LogRecord, RoundLog};
use crate::state_machine::{transition, Action, Event, State};

/// Result from running a complete feedback loop
#[derive(Debug, Clone)]
pub struct LoopResult {
    /// How the run ended
    pub outcome: FinalOutcome,
    /// Rejected rounds when the run ended
    pub retry_count: usize,
    /// Generate+validate pairs executed
    pub rounds: usize,
    /// Total token usage across all gateway calls
    pub total_usage: Usage,
}

/// One generate+validate pair without the retry loop, for smoke testing
#[derive(Debug, Clone)]
pub struct SingleRoundReport {
    pub poem: String,
    pub verdict: CriticVerdict,
    pub total_usage: Usage,
}

/// Feedback loop engine, generic over the gateway so tests can stub it
pub struct FeedbackLoop<G: AgentGateway> {
    gateway: G,
    templates: PromptTemplates,
    defaults: LoopDefaults,
    round_log: Option<RoundLog>,
    final_poem_path: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
}

impl<G: AgentGateway> FeedbackLoop<G> {
    /// Create a new engine with default prompt templates and no persistence
    pub fn new(gateway: G, defaults: LoopDefaults) -> Self {
        Self {
            gateway,
            templates: PromptTemplates::default(),
            defaults,
            round_log: None,
            final_poem_path: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the role prompt templates
    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Enable the append-only NDJSON round log
    pub fn with_round_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.round_log = Some(RoundLog::new(path));
        self
    }

    /// Write the approved poem to this path on the approved outcome
    pub fn with_final_poem_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.final_poem_path = Some(path.into());
        self
    }

    /// Handle for cancelling the run between rounds
    ///
    /// Setting the flag makes the engine return `FinalOutcome::Cancelled`
    /// before the next generation instead of making further gateway calls.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the full feedback loop
    ///
    /// Each round: ask the poet for a poem (revision prompt with escalating
    /// tone after the first rejection), ask the critic for a verdict, then
    /// either finish approved, retry, or stop at the round budget.
    pub async fn run(&self) -> Result<LoopResult> {
        let run_id = Uuid::new_v4();
        let max_rounds = self.defaults.max_rounds.max(1);
        let call_timeout = Duration::from_secs(self.defaults.request_timeout_secs);

        let mut poem_state = PoemState::new();
        let mut total_usage = Usage::default();
        let mut rounds_executed = 0usize;

        if let Some(log) = &self.round_log {
            log.append(&LogRecord::Start {
                run_id,
                timestamp: Utc::now(),
                max_rounds,
            })
            .await;
        }

        let (mut state, mut actions) = transition(State::Idle, Event::StartRun, max_rounds);

        loop {
            let mut next_event: Option<Event> = None;

            for action in actions.drain(..) {
                match action {
                    Action::LogActivity { message } => info!("{}", message),

                    Action::InvokePoet { round } => {
                        if self.cancel.load(Ordering::SeqCst) {
                            info!("Run cancelled before round {}", round);
                            return self
                                .finish(
                                    run_id,
                                    FinalOutcome::Cancelled,
                                    poem_state.retry_count,
                                    rounds_executed,
                                    total_usage,
                                )
                                .await;
                        }

                        let prompt = build_generation_prompt(&self.templates, &poem_state);
                        match self
                            .call(Role::Poet, &prompt, round, call_timeout, &mut total_usage)
                            .await
                        {
                            Ok(poem) => {
                                rounds_executed = round;
                                poem_state.poem = poem.clone();
                                if let Some(log) = &self.round_log {
                                    log.append(&LogRecord::Round {
                                        round,
                                        timestamp: Utc::now(),
                                        poem: poem.clone(),
                                    })
                                    .await;
                                }
                                next_event = Some(Event::PoemReady { poem });
                            }
                            Err(e) => {
                                return self
                                    .abort(state.clone(), e, max_rounds, run_id, &poem_state)
                                    .await
                            }
                        }
                    }

                    Action::InvokeCritic { round, poem } => {
                        let prompt = build_validation_prompt(&self.templates, &poem);
                        match self
                            .call(Role::Critic, &prompt, round, call_timeout, &mut total_usage)
                            .await
                        {
                            Ok(raw) => {
                                let verdict = parse_verdict(&raw);
                                let feedback = if verdict.approved {
                                    None
                                } else if verdict.issues.is_empty() {
                                    // Unstructured rejection: the prose itself
                                    // is the feedback
                                    Some(raw.trim().to_string())
                                } else {
                                    Some(render_issues(&verdict.issues))
                                };

                                if let Some(log) = &self.round_log {
                                    log.append(&LogRecord::Verdict {
                                        round,
                                        approved: verdict.approved,
                                        issues: verdict.issues.clone(),
                                        feedback: feedback.clone(),
                                    })
                                    .await;
                                }

                                if verdict.approved {
                                    poem_state.approved = true;
                                } else if let Some(feedback) = feedback {
                                    poem_state.record_rejection(feedback);
                                }

                                next_event = Some(Event::VerdictReady {
                                    approved: verdict.approved,
                                    issues: verdict.issues,
                                });
                            }
                            Err(e) => {
                                return self
                                    .abort(state.clone(), e, max_rounds, run_id, &poem_state)
                                    .await
                            }
                        }
                    }

                    Action::PersistFinalPoem { poem } => {
                        if let Some(path) = &self.final_poem_path {
                            write_final_poem(path, &poem).await?;
                            info!("Final poem written to {}", path.display());
                        }
                    }
                }
            }

            match next_event {
                Some(event) => {
                    let (next_state, next_actions) = transition(state, event, max_rounds);
                    state = next_state;
                    actions = next_actions;
                }
                None => break,
            }
        }

        match state {
            State::Approved { poem, retry_count } => {
                self.finish(
                    run_id,
                    FinalOutcome::Approved { poem },
                    retry_count,
                    rounds_executed,
                    total_usage,
                )
                .await
            }
            State::MaxRoundsReached { poem, issues } => {
                self.finish(
                    run_id,
                    FinalOutcome::MaxRoundsReached { poem, issues },
                    poem_state.retry_count,
                    rounds_executed,
                    total_usage,
                )
                .await
            }
            other => Err(DactylError::Other(format!(
                "Feedback loop ended in unexpected state: {:?}",
                other
            ))),
        }
    }

    /// One generate+validate pair with no retry, for `dactyl test`
    pub async fn run_single_round(&self) -> Result<SingleRoundReport> {
        let call_timeout = Duration::from_secs(self.defaults.request_timeout_secs);
        let mut total_usage = Usage::default();

        let state = PoemState::new();
        let prompt = build_generation_prompt(&self.templates, &state);
        let poem = self
            .call(Role::Poet, &prompt, 1, call_timeout, &mut total_usage)
            .await?;

        let prompt = build_validation_prompt(&self.templates, &poem);
        let raw = self
            .call(Role::Critic, &prompt, 1, call_timeout, &mut total_usage)
            .await?;
        let verdict = parse_verdict(&raw);

        Ok(SingleRoundReport {
            poem,
            verdict,
            total_usage,
        })
    }

    /// One gateway call under the per-call timeout
    async fn call(
        &self,
        role: Role,
        prompt: &str,
        round: usize,
        call_timeout: Duration,
        total_usage: &mut Usage,
    ) -> Result<String> {
        debug!("{} prompt for round {}: {} chars", role, round, prompt.len());

        let reply = match timeout(call_timeout, self.gateway.invoke(role, prompt, round)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DactylError::gateway(
                    round,
                    format!(
                        "{} call timed out after {}s",
                        role,
                        call_timeout.as_secs()
                    ),
                ));
            }
        };

        if let Some(usage) = &reply.usage {
            total_usage.add(usage);
        }

        Ok(reply.text)
    }

    /// Record a terminal outcome and build the result
    async fn finish(
        &self,
        run_id: Uuid,
        outcome: FinalOutcome,
        retry_count: usize,
        rounds: usize,
        total_usage: Usage,
    ) -> Result<LoopResult> {
        if let Some(log) = &self.round_log {
            log.append(&LogRecord::Final {
                run_id,
                timestamp: Utc::now(),
                outcome: outcome.label().to_string(),
                retry_count,
            })
            .await;
        }

        info!(
            "Run {} finished: {} after {} round(s), {} retries",
            run_id,
            outcome.label(),
            rounds,
            retry_count
        );

        Ok(LoopResult {
            outcome,
            retry_count,
            rounds,
            total_usage,
        })
    }

    /// Abort the run on a gateway failure, surfacing the original error
    async fn abort(
        &self,
        state: State,
        err: DactylError,
        max_rounds: usize,
        run_id: Uuid,
        poem_state: &PoemState,
    ) -> Result<LoopResult> {
        let (failed, fail_actions) = transition(
            state,
            Event::GatewayFailure {
                message: err.to_string(),
            },
            max_rounds,
        );

        for action in fail_actions {
            if let Action::LogActivity { message } = action {
                error!("{}", message);
            }
        }
        debug_assert!(failed.is_terminal());

        // Enough context to report or resume: the last poem and feedback
        if !poem_state.poem.is_empty() {
            debug!("Last poem before failure:\n{}", poem_state.poem);
        } else if let Some(previous) = &poem_state.previous_poem {
            debug!("Last poem before failure:\n{}", previous);
        }

        if let Some(log) = &self.round_log {
            log.append(&LogRecord::Final {
                run_id,
                timestamp: Utc::now(),
                outcome: "gateway_failure".to_string(),
                retry_count: poem_state.retry_count,
            })
            .await;
        }

        Err(err)
    }
}
