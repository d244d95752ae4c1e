//! # Skill Level Classification
//!
//! Maps continuous skill scores to the three discrete operator levels and
//! owns the single fallback policy used when inference cannot produce a
//! score.
//!
//! ## Thresholds
//!
//! | Score        | Level        |
//! |--------------|--------------|
//! | `< 40`       | Novice       |
//! | `[40, 70)`   | Intermediate |
//! | `>= 70`      | Expert       |
//!
//! The thresholds are fixed and live on the `[0, 100]` score scale only.
//!
//! ## Fallbacks
//!
//! * **NoActivation**: no rule fired. Duration above 7s or more than 5 errors
//!   scores 25 (Novice); duration below 3s with fewer than 2 errors and more
//!   than 15 tasks scores 75 (Expert); anything else scores 50
//!   (Intermediate).
//! * **EmptySession**: nothing was recorded before the sale closed. Scores 30
//!   (Novice) without running inference.
//!
//! ## Copyright
//!
//! Copyright (c) 2025 ADAPOS Contributors

use std::fmt;
use std::str::FromStr;

use adapos_core::{FuzzyError, InferenceEngine, SkillInputs};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cognitive::session::SessionRecord;

/// Lowest score classified as Intermediate
pub const INTERMEDIATE_THRESHOLD: f64 = 40.0;

/// Lowest score classified as Expert
pub const EXPERT_THRESHOLD: f64 = 70.0;

/// Score assigned to sessions that closed without any recorded action
pub const EMPTY_SESSION_SCORE: f64 = 30.0;

/// Fallback scores applied when no rule fires
pub mod fallback {
    /// Slow or error-prone operators
    pub const NOVICE_SCORE: f64 = 25.0;
    /// Fast, accurate operators with a long task history
    pub const EXPERT_SCORE: f64 = 75.0;
    /// Everyone else
    pub const INTERMEDIATE_SCORE: f64 = 50.0;

    pub const SLOW_DURATION: f64 = 7.0;
    pub const MANY_ERRORS: f64 = 5.0;
    pub const FAST_DURATION: f64 = 3.0;
    pub const FEW_ERRORS: f64 = 2.0;
    pub const MANY_TASKS: f64 = 15.0;
}

/// Classification error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Inference rejected its inputs
    #[error("Inference error: {0}")]
    Inference(#[from] FuzzyError),

    /// Stored level label is not one of the known levels
    #[error("Unknown skill level label: {0}")]
    UnknownLevel(String),
}

/// Result type for classification operations
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Discrete operator skill level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Novice,
    Intermediate,
    Expert,
}

impl SkillLevel {
    /// Level for a score on the `[0, 100]` scale
    ///
    /// Total over `f64`; a NaN score maps to Novice.
    pub fn from_score(score: f64) -> Self {
        if score >= EXPERT_THRESHOLD {
            SkillLevel::Expert
        } else if score >= INTERMEDIATE_THRESHOLD {
            SkillLevel::Intermediate
        } else {
            SkillLevel::Novice
        }
    }

    /// Canonical label used in persisted rows
    pub fn label(self) -> &'static str {
        match self {
            SkillLevel::Novice => "Novice",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Expert => "Expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SkillLevel {
    type Err = ClassifierError;

    /// Parses canonical labels as well as the labels written by the legacy
    /// Spanish front end ("Novato", "Intermedio", "Experto")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "novice" | "novato" => Ok(SkillLevel::Novice),
            "intermediate" | "intermedio" => Ok(SkillLevel::Intermediate),
            "expert" | "experto" => Ok(SkillLevel::Expert),
            _ => Err(ClassifierError::UnknownLevel(s.to_string())),
        }
    }
}

/// Map a score to its level
pub fn classify(score: f64) -> SkillLevel {
    SkillLevel::from_score(score)
}

/// How a classification score was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Centroid of the fuzzy rule base
    Inferred,
    /// Fallback table after no rule fired
    NoActivationFallback,
    /// Fixed default for sessions without recorded actions
    EmptySessionDefault,
}

/// Score and level produced by one classification call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    score: f64,
    level: SkillLevel,
    source: ScoreSource,
}

impl ClassificationResult {
    fn new(score: f64, source: ScoreSource) -> Self {
        Self {
            score,
            level: classify(score),
            source,
        }
    }

    /// Result for a session that recorded nothing before closing
    pub fn empty_session() -> Self {
        Self::new(EMPTY_SESSION_SCORE, ScoreSource::EmptySessionDefault)
    }

    /// Skill score in `[0, 100]`
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn level(&self) -> SkillLevel {
        self.level
    }

    pub fn source(&self) -> ScoreSource {
        self.source
    }
}

/// Score from the fallback table for inputs no rule covers
///
/// `inputs` are expected to be clamped already, as reported by
/// [`FuzzyError::NoActivation`].
pub fn fallback_score(inputs: &SkillInputs) -> f64 {
    if inputs.duration > fallback::SLOW_DURATION || inputs.errors > fallback::MANY_ERRORS {
        fallback::NOVICE_SCORE
    } else if inputs.duration < fallback::FAST_DURATION
        && inputs.errors < fallback::FEW_ERRORS
        && inputs.tasks > fallback::MANY_TASKS
    {
        fallback::EXPERT_SCORE
    } else {
        fallback::INTERMEDIATE_SCORE
    }
}

/// Classifier combining the inference engine with the fallback policy
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkillClassifier {
    engine: InferenceEngine,
}

impl SkillClassifier {
    /// Create a classifier with the default engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier around a specific engine
    pub fn with_engine(engine: InferenceEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Classify raw counters, applying the NoActivation fallback
    pub fn classify_inputs(&self, inputs: SkillInputs) -> ClassifierResult<ClassificationResult> {
        match self.engine.infer_inputs(inputs) {
            Ok(score) => Ok(ClassificationResult::new(score, ScoreSource::Inferred)),
            Err(FuzzyError::NoActivation {
                duration,
                errors,
                tasks,
            }) => {
                let clamped = SkillInputs::new(duration, errors, tasks);
                let score = fallback_score(&clamped);
                warn!(
                    "No rule activated for duration={:.2} errors={} tasks={}, falling back to {:.1}",
                    duration, errors, tasks, score
                );
                Ok(ClassificationResult::new(
                    score,
                    ScoreSource::NoActivationFallback,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Classify the counters held by a session record
    ///
    /// Sessions without activity before the closing sale get the fixed
    /// empty-session default and never reach the engine. Re-classifying a
    /// sealed record reproduces the result computed when it was sealed.
    pub fn classify_record(&self, record: &SessionRecord) -> ClassifierResult<ClassificationResult> {
        if record.activity_before_close() == 0 {
            return Ok(ClassificationResult::empty_session());
        }
        self.classify_inputs(record.skill_inputs())
    }
}
