//! # dactyl-validation
//!
//! Turns critic output into an approve/reject decision.
//!
//! The critic may answer with structured JSON or with free prose, depending
//! on how well the model followed its instructions. This crate handles both
//! shapes: [`parse_verdict`] recovers a structured verdict when one exists,
//! and [`classify`] is the keyword heuristic applied to anything else.
//!
//! The classifier is string matching over opaque model text. It is the most
//! fragile part of the whole system, which is why it lives here as an
//! isolated pure function instead of inline checks in the loop.

mod classifier;
mod verdict;

pub use classifier::classify;
pub use verdict::{parse_verdict, CriticVerdict};
