//! Agent roles

use serde::{Deserialize, Serialize};

/// Which agent a gateway call addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Writes and revises the poem
    Poet,
    /// Judges the poem against the double dactyl form
    Critic,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poet => write!(f, "poet"),
            Self::Critic => write!(f, "critic"),
        }
    }
}
