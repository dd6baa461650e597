//! Core type definitions for the Dactyl feedback loop

use serde::{Deserialize, Serialize};

/// A single problem the critic found, anchored to a poem line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// 1-based line number in the poem
    pub line_number: u32,
    /// What is wrong with that line
    pub problem: String,
}

impl Issue {
    pub fn new(line_number: u32, problem: impl Into<String>) -> Self {
        Self {
            line_number,
            problem: problem.into(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line_number, self.problem)
    }
}

/// Render an issue list as the line-referenced feedback block given back
/// to the poet on a retry
pub fn render_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mutable state carried across rounds of the feedback loop
///
/// Owned exclusively by the loop engine for the duration of one run and
/// mutated once per round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoemState {
    /// The poem produced by the most recent generation call
    pub poem: String,
    /// The poem from the previous round, if any
    pub previous_poem: Option<String>,
    /// Feedback text handed to the poet on the next generation
    pub feedback: Option<String>,
    /// Whether the critic has approved the current poem
    pub approved: bool,
    /// Number of rejected rounds so far
    pub retry_count: usize,
}

impl PoemState {
    /// Fresh state for the start of a run
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejected round: the current poem becomes the previous poem,
    /// the feedback is stored for the next generation, and the retry counter
    /// advances by one
    pub fn record_rejection(&mut self, feedback: String) {
        self.previous_poem = Some(std::mem::take(&mut self.poem));
        self.feedback = Some(feedback);
        self.approved = false;
        self.retry_count += 1;
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalOutcome {
    /// The critic approved the poem
    Approved { poem: String },
    /// Every allowed round was rejected; carries the last poem and its issues
    MaxRoundsReached { poem: String, issues: Vec<Issue> },
    /// The caller cancelled the run between rounds
    Cancelled,
}

impl FinalOutcome {
    /// Short label for logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::MaxRoundsReached { .. } => "max_rounds_reached",
            Self::Cancelled => "cancelled",
        }
    }

    /// The last poem the run produced, if any
    pub fn poem(&self) -> Option<&str> {
        match self {
            Self::Approved { poem } | Self::MaxRoundsReached { poem, .. } => Some(poem),
            Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = Issue::new(6, "sixth line is not a single word");
        assert_eq!(issue.to_string(), "Line 6: sixth line is not a single word");
    }

    #[test]
    fn test_render_issues_joins_lines() {
        let issues = vec![
            Issue::new(1, "first line is not nonsense"),
            Issue::new(2, "second line is not a name"),
        ];
        let rendered = render_issues(&issues);
        assert_eq!(
            rendered,
            "Line 1: first line is not nonsense\nLine 2: second line is not a name"
        );
    }

    #[test]
    fn test_record_rejection_advances_state() {
        let mut state = PoemState::new();
        state.poem = "draft one".to_string();

        state.record_rejection("Line 3: meter is off".to_string());

        assert_eq!(state.previous_poem.as_deref(), Some("draft one"));
        assert_eq!(state.feedback.as_deref(), Some("Line 3: meter is off"));
        assert_eq!(state.retry_count, 1);
        assert!(state.poem.is_empty());
        assert!(!state.approved);
    }

    #[test]
    fn test_outcome_labels() {
        let approved = FinalOutcome::Approved {
            poem: "x".to_string(),
        };
        assert_eq!(approved.label(), "approved");
        assert_eq!(approved.poem(), Some("x"));
        assert_eq!(FinalOutcome::Cancelled.poem(), None);
    }
}
