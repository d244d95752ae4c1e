//! Fuzzy Skill Inference
//!
//! Mamdani-style inference over three linguistic input variables and one
//! output variable:
//!
//! * `membership`: triangular shapes and the fixed linguistic variables
//! * `rules`: the static antecedent/consequent rule base
//! * `inference`: fuzzification, rule evaluation, max aggregation and
//!   centroid defuzzification
//!
//! Copyright (c) 2025 ADAPOS Contributors

pub mod inference;
pub mod membership;
pub mod rules;

use thiserror::Error;

pub use self::inference::{InferenceEngine, InferenceTrace, SkillInputs, DEFAULT_CENTROID_STEP};
pub use self::membership::{
    membership, InputTerm, InputVariable, LinguisticVariable, OutputTerm, TriangularShape,
};
pub use self::rules::{Antecedent, Rule, RULE_BASE};

/// Fuzzy inference error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FuzzyError {
    /// Every rule fired at zero strength, so the aggregated output set has no area
    #[error("No rule activated for inputs (duration={duration}, errors={errors}, tasks={tasks})")]
    NoActivation {
        /// Clamped average action duration
        duration: f64,
        /// Clamped error count
        errors: f64,
        /// Clamped completed task count
        tasks: f64,
    },

    /// An input was NaN and cannot be clamped into a domain
    #[error("Input {0} is not a number")]
    NonFiniteInput(&'static str),

    /// Centroid discretization step is unusable
    #[error("Invalid centroid resolution: {0} (expected 0 < step <= 0.5)")]
    InvalidResolution(f64),
}

/// Result type for fuzzy inference operations
pub type FuzzyResult<T> = Result<T, FuzzyError>;
