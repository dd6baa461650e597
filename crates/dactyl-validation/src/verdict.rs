//! Structured critic verdicts and recovery from loosely formatted output

use dactyl_core::Issue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify;

/// The critic's decision for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticVerdict {
    /// Whether the poem passed validation
    ///
    /// Accepts both `approved` and the `valid` key used by older critic
    /// prompts.
    #[serde(alias = "valid")]
    pub approved: bool,

    /// Line-referenced problems, empty when approved or unstructured
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl CriticVerdict {
    /// Verdict recovered from prose via the keyword classifier
    fn from_prose(raw: &str) -> Self {
        Self {
            approved: classify(raw),
            issues: Vec::new(),
        }
    }
}

/// Parse critic output into a verdict
///
/// Models asked for JSON return it bare, wrapped in a markdown code fence,
/// or buried in surrounding prose, so all three are tried in order before
/// falling back to the keyword classifier over the raw text.
pub fn parse_verdict(raw: &str) -> CriticVerdict {
    let trimmed = raw.trim();

    if let Ok(verdict) = serde_json::from_str::<CriticVerdict>(trimmed) {
        return verdict;
    }

    if let Some(fenced) = extract_fenced_block(trimmed) {
        if let Ok(verdict) = serde_json::from_str::<CriticVerdict>(fenced) {
            return verdict;
        }
    }

    if let Some(embedded) = extract_json_object(trimmed) {
        if let Ok(verdict) = serde_json::from_str::<CriticVerdict>(embedded) {
            return verdict;
        }
    }

    debug!("Critic output is not structured JSON, falling back to keyword classifier");
    CriticVerdict::from_prose(raw)
}

/// Pull the body out of the first markdown code fence, if any
fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an optional language tag on the fence line
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Slice from the first `{` to the last `}`, the usual shape of JSON
/// wrapped in explanatory prose
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
