//! Escalation policy for retry prompts
//!
//! Each rejected round makes the poet a little angrier. The retry counter
//! maps to one of eight fixed tone instructions injected into the next
//! generation prompt; everything past eight stays at maximum anger.

/// Highest anger level; retry counts above this clamp to it
pub const MAX_ANGER_LEVEL: usize = 8;

const ANGER_PHRASES: [&str; MAX_ANGER_LEVEL] = [
    "You are slightly annoyed by the feedback.",
    "You are becoming frustrated with the constant criticism.",
    "You are quite angry at the critic's nitpicking.",
    "You are very angry and defensive about your work.",
    "You are extremely angry and feel the critic is being unreasonable.",
    "You are furious and think the critic is impossible to please.",
    "You are absolutely livid and want to prove the critic wrong.",
    "You are at maximum anger and will show the critic what real poetry looks like.",
];

/// Map a retry counter (>= 1) to its tone instruction
///
/// `level = min(retry_count, 8)`, 1-indexed into the fixed phrase list.
/// Pure function, no side effects.
pub fn escalate(retry_count: usize) -> &'static str {
    let level = retry_count.clamp(1, MAX_ANGER_LEVEL);
    ANGER_PHRASES[level - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_level_distinct() {
        let phrases: Vec<_> = (1..=MAX_ANGER_LEVEL).map(escalate).collect();
        for (i, phrase) in phrases.iter().enumerate() {
            assert_eq!(*phrase, ANGER_PHRASES[i]);
        }
        // All eight are different instructions
        for i in 0..phrases.len() {
            for j in (i + 1)..phrases.len() {
                assert_ne!(phrases[i], phrases[j]);
            }
        }
    }

    #[test]
    fn test_first_retry_is_mild() {
        assert_eq!(escalate(1), "You are slightly annoyed by the feedback.");
    }

    #[test]
    fn test_clamps_above_max() {
        let max = escalate(MAX_ANGER_LEVEL);
        assert_eq!(escalate(9), max);
        assert_eq!(escalate(100), max);
        assert_eq!(escalate(usize::MAX), max);
    }

    #[test]
    fn test_zero_treated_as_first_level() {
        // Contract says retry_count >= 1; a zero from a misbehaving caller
        // gets the mildest phrase rather than a panic
        assert_eq!(escalate(0), escalate(1));
    }
}
