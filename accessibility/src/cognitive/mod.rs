//! Cognitive Adaptation
//!
//! Per-session skill tracking for point-of-sale operators:
//!
//! * `session`: incremental aggregation of action events into a session record
//! * `classification`: score thresholds, fallback scoring and the classifier
//! * `adaptation`: event routing, configuration and interface selection
//!
//! Copyright (c) 2025 ADAPOS Contributors

pub mod adaptation;
pub mod classification;
pub mod session;

pub use self::adaptation::{
    label_history, AdaptationError, AdaptationManager, AdaptationParameters, AdaptationResult,
    AdaptationStatus, EventOutcome, InterfaceMode, LabeledSession, SessionReport,
};
pub use self::classification::{
    classify, fallback_score, ClassificationResult, ClassifierError, ClassifierResult,
    ScoreSource, SkillClassifier, SkillLevel,
};
pub use self::session::{
    ActionEvent, FinalizedSession, PersistedSession, SessionAggregator, SessionError,
    SessionRecord, SessionResult, SALE_COMPLETED,
};
