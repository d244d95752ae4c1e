//! ADAPOS core - fuzzy skill inference
//!
//! Provides the fixed membership model, the twelve-rule base and the Mamdani
//! inference engine that turn three behavioral counters collected at a
//! point-of-sale terminal (average action duration, errors, completed tasks)
//! into a continuous skill score on the `[0, 100]` scale.
//!
//! Everything in this crate is immutable and side-effect free, so a single
//! [`fuzzy::InferenceEngine`] can be shared across any number of sessions.
//!
//! Copyright (c) 2025 ADAPOS Contributors

pub mod fuzzy;

pub use fuzzy::{
    membership, FuzzyError, FuzzyResult, InferenceEngine, InferenceTrace, InputTerm,
    InputVariable, OutputTerm, SkillInputs,
};

/// Crate version, as published in the workspace manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
