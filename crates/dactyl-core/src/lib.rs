//! # dactyl-core
//!
//! Core types for Dactyl, a poet/critic feedback loop for double dactyl verse.
//!
//! A double dactyl is a light-verse form: two four-line stanzas, dactylic
//! meter, a nonsense first line, a proper noun on the second, a single-word
//! sixth line, and rhyming corresponding lines. Dactyl does not analyze any
//! of that itself - a poet agent drafts, a critic agent judges, and this
//! workspace only drives the loop between them.
//!
//! ## Core Paradigm
//!
//! - One round = one generation call + one validation call, strictly in order
//! - State is owned by a single loop engine, mutated once per round
//! - Rejection is an outcome that drives a retry; a gateway failure is fatal
//! - Every round is appended to a durable log before the loop moves on

pub mod config;
pub mod fail_open;

mod error;
mod types;

pub use error::{DactylError, Result};
pub use types::*;
