//! Approval classifier over free-text critic output
//!
//! Keyword search over whatever prose the critic produced. This is a
//! heuristic and an accepted limitation: a critic that phrases rejection
//! creatively ("try again, this scans terribly") slips past the rejection
//! list and lands on the fail-closed default. Anything genuinely ambiguous
//! is treated as not approved.

/// Phrases that signal rejection, checked after the approval rule
const REJECTION_PHRASES: [&str; 5] = [
    "not approved",
    "rejected",
    "does not meet",
    "does not adhere",
    "must be revised",
];

/// Map free-text validation output to an approved/rejected decision
///
/// Case-insensitive substring search, first match wins:
/// 1. contains "approved" and not "not approved" - approved
/// 2. contains any rejection phrase - rejected
/// 3. no match - rejected (fail-closed)
///
/// Pure and deterministic: the same text always classifies the same way.
pub fn classify(validation_text: &str) -> bool {
    let lower = validation_text.to_lowercase();

    if lower.contains("approved") && !lower.contains("not approved") {
        return true;
    }

    if REJECTION_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return false;
    }

    // Ambiguous output defaults to not approved
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_approval() {
        assert!(classify("The poem is approved."));
        assert!(classify("APPROVED"));
        assert!(classify("After careful review, this is Approved for publication."));
    }

    #[test]
    fn test_not_approved_overrides_approved() {
        assert!(!classify("This poem is not approved."));
        assert!(!classify("NOT APPROVED: the meter fails in stanza two."));
        assert!(!classify("Approved? No. This is not approved."));
    }

    #[test]
    fn test_rejection_phrases() {
        assert!(!classify("This must be revised."));
        assert!(!classify("Rejected on grounds of taste."));
        assert!(!classify("The poem does not meet the form requirements."));
        assert!(!classify("It does not adhere to the dactylic meter."));
    }

    #[test]
    fn test_ambiguous_defaults_to_rejected() {
        assert!(!classify("Looks nice I guess"));
        assert!(!classify(""));
        assert!(!classify("A thoughtful meditation on wombats."));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(classify("aPpRoVeD"));
        assert!(!classify("MUST BE REVISED"));
        assert!(!classify("Not Approved"));
    }

    #[test]
    fn test_approved_as_substring_of_larger_word() {
        // "disapproved" contains "approved" without "not approved"; the
        // heuristic approves it. Accepted limitation of substring matching.
        assert!(classify("disapproved"));
    }

    #[test]
    fn test_idempotent() {
        let text = "The poem is approved.";
        let first = classify(text);
        for _ in 0..10 {
            assert_eq!(classify(text), first);
        }
    }
}
