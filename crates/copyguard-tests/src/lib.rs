//! Cross-crate test suite for Copyguard.
//!
//! Integration tests drive the full pipeline (snapshot file, corpus,
//! detection engine, penalty sets) and probe detection invariants under
//! adversarial, randomized populations.

pub mod helpers;
