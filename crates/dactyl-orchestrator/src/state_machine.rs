//! Pure state machine for the feedback loop control flow
//!
//! This module implements a pure functional state machine with NO I/O.
//! All state transitions are deterministic and testable.
//!
//! Key design principles:
//! - Pure function: transition(state, event, max_rounds) -> (state, actions)
//! - No async, no I/O, no gateway knowledge
//! - Invalid transitions go to Failed state (never panic)
//! - Round numbers are 1-based; approval on round r records r - 1 retries

use dactyl_core::Issue;

/// Feedback loop state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Initial state - no run in progress
    Idle,
    /// Waiting on the poet for round `round`
    Generating { round: usize },
    /// Waiting on the critic's verdict for round `round`
    Validating { round: usize, poem: String },
    /// Terminal: the critic approved the poem
    Approved { poem: String, retry_count: usize },
    /// Terminal: every allowed round was rejected
    MaxRoundsReached { poem: String, issues: Vec<Issue> },
    /// Terminal: a gateway failure or invalid transition
    Failed { error: String },
}

impl State {
    /// Whether the loop is done
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            State::Approved { .. } | State::MaxRoundsReached { .. } | State::Failed { .. }
        )
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a new run
    StartRun,
    /// The poet produced a poem
    PoemReady { poem: String },
    /// The critic's verdict is in
    VerdictReady { approved: bool, issues: Vec<Issue> },
    /// A gateway call failed (network, timeout, provider error)
    GatewayFailure { message: String },
}

/// Actions to execute as side effects of transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Ask the poet for a poem (initial draft or revision)
    InvokePoet { round: usize },
    /// Ask the critic to judge the round's poem
    InvokeCritic { round: usize, poem: String },
    /// Write the approved poem to the final output
    PersistFinalPoem { poem: String },
    /// Log activity
    LogActivity { message: String },
}

/// Pure state transition function
///
/// Takes current state, event and the round budget; returns the new state
/// and the actions to execute. Completely deterministic, no side effects.
///
/// # Invalid Transitions
/// Any invalid transition results in a Failed state with descriptive error.
/// This function never panics.
pub fn transition(state: State, event: Event, max_rounds: usize) -> (State, Vec<Action>) {
    match (state, event) {
        // From Idle state
        (State::Idle, Event::StartRun) => {
            let actions = vec![
                Action::LogActivity {
                    message: format!("Starting feedback loop (max {} rounds)", max_rounds),
                },
                Action::InvokePoet { round: 1 },
            ];
            (State::Generating { round: 1 }, actions)
        }

        // From Generating state
        (State::Generating { round }, Event::PoemReady { poem }) => {
            let actions = vec![Action::InvokeCritic {
                round,
                poem: poem.clone(),
            }];
            (State::Validating { round, poem }, actions)
        }

        // From Validating state
        (State::Validating { round, poem }, Event::VerdictReady { approved: true, .. }) => {
            let actions = vec![
                Action::LogActivity {
                    message: format!("Poem approved in round {}", round),
                },
                Action::PersistFinalPoem { poem: poem.clone() },
            ];
            (
                State::Approved {
                    poem,
                    retry_count: round.saturating_sub(1),
                },
                actions,
            )
        }

        (
            State::Validating { round, poem },
            Event::VerdictReady {
                approved: false,
                issues,
            },
        ) => {
            if round >= max_rounds {
                let actions = vec![Action::LogActivity {
                    message: format!("Round {} rejected, max rounds reached", round),
                }];
                (State::MaxRoundsReached { poem, issues }, actions)
            } else {
                let next = round + 1;
                let actions = vec![
                    Action::LogActivity {
                        message: format!("Round {} rejected, retrying", round),
                    },
                    Action::InvokePoet { round: next },
                ];
                (State::Generating { round: next }, actions)
            }
        }

        // Gateway failures from any non-terminal state
        (State::Idle, Event::GatewayFailure { message })
        | (State::Generating { .. }, Event::GatewayFailure { message })
        | (State::Validating { .. }, Event::GatewayFailure { message }) => {
            let actions = vec![Action::LogActivity {
                message: format!("Gateway failure: {}", message),
            }];
            (State::Failed { error: message }, actions)
        }

        // Terminal states - no valid transitions
        (state @ State::Approved { .. }, event)
        | (state @ State::MaxRoundsReached { .. }, event)
        | (state @ State::Failed { .. }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from terminal state {:?} on event {:?}",
                    state, event
                ),
            },
            vec![],
        ),

        // All other invalid transitions
        (state, event) => (
            State::Failed {
                error: format!(
                    "Invalid state transition: {:?} cannot handle event {:?}",
                    state, event
                ),
            },
            vec![],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poem() -> String {
        "Higgledy piggledy".to_string()
    }

    #[test]
    fn test_approval_on_first_round() {
        let (state, actions) = transition(State::Idle, Event::StartRun, 8);
        assert_eq!(state, State::Generating { round: 1 });
        assert!(matches!(actions[1], Action::InvokePoet { round: 1 }));

        let (state, actions) = transition(state, Event::PoemReady { poem: poem() }, 8);
        assert!(matches!(state, State::Validating { round: 1, .. }));
        assert!(matches!(actions[0], Action::InvokeCritic { round: 1, .. }));

        let (state, actions) = transition(
            state,
            Event::VerdictReady {
                approved: true,
                issues: vec![],
            },
            8,
        );
        match state {
            State::Approved { retry_count, .. } => assert_eq!(retry_count, 0),
            other => panic!("expected Approved, got {:?}", other),
        }
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::PersistFinalPoem { .. })));
    }

    #[test]
    fn test_rejection_retries_with_next_round() {
        let state = State::Validating {
            round: 1,
            poem: poem(),
        };
        let (state, actions) = transition(
            state,
            Event::VerdictReady {
                approved: false,
                issues: vec![Issue::new(6, "not a single word")],
            },
            8,
        );
        assert_eq!(state, State::Generating { round: 2 });
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::InvokePoet { round: 2 })));
    }

    #[test]
    fn test_rejection_at_budget_is_terminal() {
        let state = State::Validating {
            round: 3,
            poem: poem(),
        };
        let issues = vec![Issue::new(2, "not a proper noun")];
        let (state, actions) = transition(
            state,
            Event::VerdictReady {
                approved: false,
                issues: issues.clone(),
            },
            3,
        );
        match state {
            State::MaxRoundsReached {
                issues: final_issues,
                ..
            } => assert_eq!(final_issues, issues),
            other => panic!("expected MaxRoundsReached, got {:?}", other),
        }
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::InvokePoet { .. })));
    }

    #[test]
    fn test_approval_after_retries_counts_rejections() {
        let state = State::Validating {
            round: 4,
            poem: poem(),
        };
        let (state, _) = transition(
            state,
            Event::VerdictReady {
                approved: true,
                issues: vec![],
            },
            8,
        );
        match state {
            State::Approved { retry_count, .. } => assert_eq!(retry_count, 3),
            other => panic!("expected Approved, got {:?}", other),
        }
    }

    #[test]
    fn test_gateway_failure_from_any_nonterminal_state() {
        for state in [
            State::Idle,
            State::Generating { round: 2 },
            State::Validating {
                round: 2,
                poem: poem(),
            },
        ] {
            let (next, _) = transition(
                state,
                Event::GatewayFailure {
                    message: "timeout".to_string(),
                },
                8,
            );
            assert!(matches!(next, State::Failed { .. }));
        }
    }

    #[test]
    fn test_invalid_transition_never_panics() {
        // Verdict without a poem in flight
        let (state, _) = transition(
            State::Generating { round: 1 },
            Event::VerdictReady {
                approved: true,
                issues: vec![],
            },
            8,
        );
        assert!(matches!(state, State::Failed { .. }));

        // Starting from the middle of a run
        let (state, _) = transition(State::Generating { round: 1 }, Event::StartRun, 8);
        assert!(matches!(state, State::Failed { .. }));

        // Poem while validating
        let (state, _) = transition(
            State::Validating {
                round: 1,
                poem: poem(),
            },
            Event::PoemReady { poem: poem() },
            8,
        );
        assert!(matches!(state, State::Failed { .. }));
    }

    #[test]
    fn test_terminal_states_reject_all_events() {
        let approved = State::Approved {
            poem: poem(),
            retry_count: 0,
        };
        let (state, actions) = transition(approved, Event::StartRun, 8);
        assert!(matches!(state, State::Failed { .. }));
        assert!(actions.is_empty());

        let failed = State::Failed {
            error: "original".to_string(),
        };
        let (state, _) = transition(
            failed,
            Event::PoemReady { poem: poem() },
            8,
        );
        assert!(matches!(state, State::Failed { .. }));
    }

    #[test]
    fn test_is_terminal() {
        assert!(!State::Idle.is_terminal());
        assert!(!State::Generating { round: 1 }.is_terminal());
        assert!(State::Approved {
            poem: poem(),
            retry_count: 0
        }
        .is_terminal());
        assert!(State::MaxRoundsReached {
            poem: poem(),
            issues: vec![]
        }
        .is_terminal());
        assert!(State::Failed {
            error: "x".to_string()
        }
        .is_terminal());
    }
}
