//! # Session Metric Aggregation
//!
//! Maintains the behavioral counters of one operator session, one action at
//! a time, and seals them when the sale closes.
//!
//! ## Record lifecycle
//!
//! 1. [`SessionAggregator::begin_session`] creates an all-zero record.
//! 2. [`SessionAggregator::record_event`] folds each action into the record:
//!    successes bump `task_count`, failures bump `error_count`, and the mean
//!    action duration is updated incrementally.
//! 3. [`SessionAggregator::finalize_session`] folds the closing sale in as
//!    one more action, labels and seals the record, and leaves a fresh empty
//!    record in the caller's slot.
//!
//! The aggregator holds no session state and does no locking. Records are
//! plain values owned by the caller's session layer, which must serialize
//! writers per session.
//!
//! ## Copyright
//!
//! Copyright (c) 2025 ADAPOS Contributors

use adapos_core::{InputVariable, SkillInputs};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cognitive::classification::{
    ClassificationResult, ClassifierError, SkillClassifier, SkillLevel,
};

/// Event kind that closes a session
pub const SALE_COMPLETED: &str = "sale_completed";

/// Shortest duration accepted into the running mean (seconds)
pub const MIN_ACTION_DURATION: f64 = 1.0;

/// Longest duration accepted into the running mean (seconds)
pub const MAX_ACTION_DURATION: f64 = 10.0;

/// Session aggregation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Action duration is negative or not a number
    #[error("Invalid action duration: {0}")]
    InvalidDuration(f64),

    /// An externally supplied record violates the record invariants
    #[error("Malformed session record: {0}")]
    MalformedRecord(String),

    /// The record was already sealed and cannot change
    #[error("Session record is already sealed as {0}")]
    AlreadySealed(SkillLevel),

    /// A counter would exceed its integer range
    #[error("Session counter overflow after {0} events")]
    CounterOverflow(u32),

    /// Classification at close failed
    #[error("Classification error: {0}")]
    Classification(#[from] ClassifierError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A single operator action reported by the front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Action name, e.g. `add_to_cart` or `sale_completed`
    pub event_kind: String,
    /// Seconds the action took
    pub duration_seconds: f64,
    /// Whether the action succeeded
    pub succeeded: bool,
}

impl ActionEvent {
    /// Create a new action event
    pub fn new(event_kind: impl Into<String>, duration_seconds: f64, succeeded: bool) -> Self {
        Self {
            event_kind: event_kind.into(),
            duration_seconds,
            succeeded,
        }
    }

    /// Closing event of a session
    pub fn sale_completed(duration_seconds: f64, succeeded: bool) -> Self {
        Self::new(SALE_COMPLETED, duration_seconds, succeeded)
    }

    /// Whether this event closes the session given the configured trigger kind
    pub fn closes_session(&self, finalize_kind: &str) -> bool {
        self.event_kind == finalize_kind
    }
}

/// Running behavioral counters of one session
///
/// Invariant: `event_count == error_count + task_count`, and `mean_duration`
/// lies in `[1.0, 10.0]` once at least one event has been recorded. A record
/// carrying a level label is sealed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    event_count: u32,
    mean_duration: f64,
    error_count: u32,
    task_count: u32,
    level_label: Option<SkillLevel>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRecord {
    /// Create an empty, unsealed record
    pub fn new() -> Self {
        Self {
            event_count: 0,
            mean_duration: 0.0,
            error_count: 0,
            task_count: 0,
            level_label: None,
        }
    }

    pub fn event_count(&self) -> u32 {
        self.event_count
    }

    /// Weighted mean action duration in seconds (0.0 while empty)
    pub fn mean_duration(&self) -> f64 {
        self.mean_duration
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn task_count(&self) -> u32 {
        self.task_count
    }

    /// Level attached at sealing time
    pub fn level_label(&self) -> Option<SkillLevel> {
        self.level_label
    }

    pub fn is_sealed(&self) -> bool {
        self.level_label.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    /// Number of actions recorded before the closing sale
    ///
    /// A sealed record always includes the closing sale itself, so it is
    /// excluded here.
    pub fn activity_before_close(&self) -> u32 {
        if self.is_sealed() {
            self.event_count.saturating_sub(1)
        } else {
            self.event_count
        }
    }

    /// Counters normalized for the inference engine
    ///
    /// Error and task counts are clamped to their variable domains here and
    /// nowhere else; the record itself keeps the raw tallies.
    pub fn skill_inputs(&self) -> SkillInputs {
        let errors = InputVariable::ErrorsInSession.linguistic();
        let tasks = InputVariable::TasksCompleted.linguistic();
        SkillInputs::new(
            self.mean_duration,
            errors.clamp(f64::from(self.error_count)),
            tasks.clamp(f64::from(self.task_count)),
        )
    }

    /// Persistable row for this record
    pub fn to_persisted(&self, session_id: impl Into<String>) -> PersistedSession {
        PersistedSession {
            session_id: session_id.into(),
            mean_duration: self.mean_duration,
            error_count: i64::from(self.error_count),
            task_count: i64::from(self.task_count),
            level_label: self.level_label.map(|level| level.label().to_string()),
        }
    }

    fn ensure_unsealed(&self) -> SessionResult<()> {
        match self.level_label {
            Some(level) => Err(SessionError::AlreadySealed(level)),
            None => Ok(()),
        }
    }

    /// Record with one more action folded in; `self` is left untouched
    fn with_event(&self, duration: f64, succeeded: bool) -> SessionResult<Self> {
        let n = self
            .event_count
            .checked_add(1)
            .ok_or(SessionError::CounterOverflow(self.event_count))?;

        let mut next = self.clone();
        next.event_count = n;
        if succeeded {
            next.task_count += 1;
        } else {
            next.error_count += 1;
        }

        let duration = duration.clamp(MIN_ACTION_DURATION, MAX_ACTION_DURATION);
        let n = f64::from(n);
        next.mean_duration = ((self.mean_duration * (n - 1.0) + duration) / n)
            .clamp(MIN_ACTION_DURATION, MAX_ACTION_DURATION);

        Ok(next)
    }
}

/// Stored representation of a completed session, owned by the caller
///
/// Counts are signed so corrupted rows can be detected instead of wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub session_id: String,
    pub mean_duration: f64,
    pub error_count: i64,
    pub task_count: i64,
    pub level_label: Option<String>,
}

impl TryFrom<&PersistedSession> for SessionRecord {
    type Error = SessionError;

    fn try_from(row: &PersistedSession) -> Result<Self, Self::Error> {
        let count = |name: &str, value: i64| {
            u32::try_from(value).map_err(|_| {
                SessionError::MalformedRecord(format!(
                    "session {}: {} out of range ({})",
                    row.session_id, name, value
                ))
            })
        };
        let error_count = count("error_count", row.error_count)?;
        let task_count = count("task_count", row.task_count)?;
        let event_count = error_count.checked_add(task_count).ok_or_else(|| {
            SessionError::MalformedRecord(format!("session {}: event count overflow", row.session_id))
        })?;

        let mean = row.mean_duration;
        let mean_ok = if event_count == 0 {
            mean == 0.0
        } else {
            (MIN_ACTION_DURATION..=MAX_ACTION_DURATION).contains(&mean)
        };
        if !mean_ok {
            return Err(SessionError::MalformedRecord(format!(
                "session {}: mean duration {} invalid for {} events",
                row.session_id, mean, event_count
            )));
        }

        let level_label = row
            .level_label
            .as_deref()
            .map(str::parse::<SkillLevel>)
            .transpose()
            .map_err(|e| SessionError::MalformedRecord(format!("session {}: {}", row.session_id, e)))?;

        Ok(SessionRecord {
            event_count,
            mean_duration: mean,
            error_count,
            task_count,
            level_label,
        })
    }
}

/// Outcome of closing a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedSession {
    /// Sealed record, labeled with the classified level
    pub sealed: SessionRecord,
    /// Score and level computed at close
    pub classification: ClassificationResult,
}

/// Folds operator actions into session records
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionAggregator {
    classifier: SkillClassifier,
}

impl SessionAggregator {
    /// Create an aggregator using the default classifier at close
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator using `classifier` at close
    pub fn with_classifier(classifier: SkillClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &SkillClassifier {
        &self.classifier
    }

    /// Start a new session with an all-zero record
    pub fn begin_session(&self) -> SessionRecord {
        SessionRecord::new()
    }

    /// Fold one action into `record`
    ///
    /// Invalid input is rejected before any counter changes.
    pub fn record_event(
        &self,
        record: &mut SessionRecord,
        duration: f64,
        succeeded: bool,
    ) -> SessionResult<()> {
        validate_duration(duration)?;
        record.ensure_unsealed()?;

        *record = record.with_event(duration, succeeded)?;
        debug!(
            "Recorded {} action ({:.2}s): events={} errors={} tasks={} mean={:.2}s",
            if succeeded { "successful" } else { "failed" },
            duration,
            record.event_count,
            record.error_count,
            record.task_count,
            record.mean_duration
        );
        Ok(())
    }

    /// Close the session in `record` with the sale-completed action
    ///
    /// The closing action is recorded like any other, the record is
    /// classified and sealed, and `record` is replaced by a fresh empty
    /// record for the next session. On error `record` is left unchanged.
    pub fn finalize_session(
        &self,
        record: &mut SessionRecord,
        duration: f64,
        succeeded: bool,
    ) -> SessionResult<FinalizedSession> {
        validate_duration(duration)?;
        record.ensure_unsealed()?;

        let was_empty = record.is_empty();
        let mut sealed = record.with_event(duration, succeeded)?;
        let classification = if was_empty {
            ClassificationResult::empty_session()
        } else {
            self.classifier.classify_record(&sealed)?
        };
        sealed.level_label = Some(classification.level());

        info!(
            "Session sealed as {} (score {:.2}, {:?}): events={} errors={} tasks={} mean={:.2}s",
            classification.level(),
            classification.score(),
            classification.source(),
            sealed.event_count,
            sealed.error_count,
            sealed.task_count,
            sealed.mean_duration
        );

        *record = self.begin_session();
        Ok(FinalizedSession {
            sealed,
            classification,
        })
    }
}

fn validate_duration(duration: f64) -> SessionResult<()> {
    if duration.is_nan() || duration < 0.0 {
        warn!("Rejected action with duration {}", duration);
        return Err(SessionError::InvalidDuration(duration));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognitive::classification::ScoreSource;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(mean: f64, errors: i64, tasks: i64, label: Option<&str>) -> PersistedSession {
        PersistedSession {
            session_id: "S_test".to_string(),
            mean_duration: mean,
            error_count: errors,
            task_count: tasks,
            level_label: label.map(str::to_string),
        }
    }

    #[test]
    fn test_begin_session_is_zeroed() {
        let record = SessionAggregator::new().begin_session();
        assert_eq!(record.event_count(), 0);
        assert_eq!(record.mean_duration(), 0.0);
        assert_eq!(record.error_count(), 0);
        assert_eq!(record.task_count(), 0);
        assert!(!record.is_sealed());
        assert!(record.is_empty());
    }

    #[test]
    fn test_incremental_mean() {
        init_logging();
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();

        aggregator.record_event(&mut record, 2.0, true).unwrap();
        assert_eq!(record.mean_duration(), 2.0);

        aggregator.record_event(&mut record, 4.0, false).unwrap();
        assert!((record.mean_duration() - 3.0).abs() < 1e-12);

        aggregator.record_event(&mut record, 6.0, true).unwrap();
        assert!((record.mean_duration() - 4.0).abs() < 1e-12);

        assert_eq!(record.task_count(), 2);
        assert_eq!(record.error_count(), 1);
        assert_eq!(record.event_count(), 3);
    }

    #[test]
    fn test_durations_are_clamped() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();

        // 0.2s counts as 1s
        aggregator.record_event(&mut record, 0.2, true).unwrap();
        assert_eq!(record.mean_duration(), 1.0);

        // 40s counts as 10s: (1 + 10) / 2
        aggregator.record_event(&mut record, 40.0, true).unwrap();
        assert!((record.mean_duration() - 5.5).abs() < 1e-12);

        aggregator.record_event(&mut record, f64::INFINITY, true).unwrap();
        assert!((record.mean_duration() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_counts_track_calls() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();

        let outcomes = [true, false, true, true, false, false, true, true, true, false, true, true];
        for (i, ok) in outcomes.iter().enumerate() {
            aggregator.record_event(&mut record, 3.0, *ok).unwrap();
            assert_eq!(record.error_count() + record.task_count(), (i + 1) as u32);
            assert_eq!(record.event_count(), (i + 1) as u32);
        }
    }

    #[test]
    fn test_counts_not_clamped_until_inference() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();
        for _ in 0..14 {
            aggregator.record_event(&mut record, 2.0, false).unwrap();
        }
        for _ in 0..35 {
            aggregator.record_event(&mut record, 2.0, true).unwrap();
        }

        assert_eq!(record.error_count(), 14);
        assert_eq!(record.task_count(), 35);

        let inputs = record.skill_inputs();
        assert_eq!(inputs.errors, 10.0);
        assert_eq!(inputs.tasks, 30.0);
        assert_eq!(inputs.duration, 2.0);
    }

    #[test]
    fn test_invalid_duration_rejected_before_mutation() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();
        aggregator.record_event(&mut record, 3.0, true).unwrap();
        let before = record.clone();

        assert_eq!(
            aggregator.record_event(&mut record, -1.0, true),
            Err(SessionError::InvalidDuration(-1.0))
        );
        assert!(matches!(
            aggregator.record_event(&mut record, f64::NAN, false),
            Err(SessionError::InvalidDuration(_))
        ));
        assert!(aggregator.finalize_session(&mut record, -0.5, true).is_err());
        assert_eq!(record, before);
    }

    #[test]
    fn test_finalize_seals_and_resets() {
        init_logging();
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();
        for _ in 0..24 {
            aggregator.record_event(&mut record, 2.0, true).unwrap();
        }

        let finalized = aggregator.finalize_session(&mut record, 2.0, true).unwrap();

        assert!(record.is_empty());
        assert!(!record.is_sealed());

        let sealed = &finalized.sealed;
        assert!(sealed.is_sealed());
        assert_eq!(sealed.event_count(), 25);
        assert_eq!(sealed.task_count(), 25);
        assert_eq!(sealed.level_label(), Some(SkillLevel::Expert));
        assert_eq!(finalized.classification.level(), SkillLevel::Expert);
        assert_eq!(finalized.classification.source(), ScoreSource::Inferred);
    }

    #[test]
    fn test_finalize_empty_session() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();

        let finalized = aggregator.finalize_session(&mut record, 0.5, true).unwrap();

        assert_eq!(finalized.classification.score(), 30.0);
        assert_eq!(finalized.classification.level(), SkillLevel::Novice);
        assert_eq!(
            finalized.classification.source(),
            ScoreSource::EmptySessionDefault
        );
        assert_eq!(finalized.sealed.event_count(), 1);
        assert_eq!(finalized.sealed.activity_before_close(), 0);
        assert_eq!(finalized.sealed.level_label(), Some(SkillLevel::Novice));
    }

    #[test]
    fn test_sealed_record_rejects_mutation() {
        let aggregator = SessionAggregator::new();
        let mut record = aggregator.begin_session();
        aggregator.record_event(&mut record, 5.0, true).unwrap();
        let mut sealed = aggregator
            .finalize_session(&mut record, 5.0, true)
            .unwrap()
            .sealed;
        let level = sealed.level_label().unwrap();
        let before = sealed.clone();

        assert_eq!(
            aggregator.record_event(&mut sealed, 1.0, true),
            Err(SessionError::AlreadySealed(level))
        );
        assert_eq!(
            aggregator.finalize_session(&mut sealed, 1.0, true),
            Err(SessionError::AlreadySealed(level))
        );
        assert_eq!(sealed, before);
    }

    #[test]
    fn test_sealed_record_round_trip() {
        let aggregator = SessionAggregator::new();
        let classifier = SkillClassifier::new();
        let sessions: [&[(f64, bool)]; 3] = [
            &[(8.0, false), (9.0, true), (7.5, false), (8.5, false), (9.0, false)],
            &[(4.0, true), (5.0, true), (6.0, false), (5.0, true), (4.5, false)],
            &[(1.5, true); 20],
        ];

        for actions in sessions {
            let mut record = aggregator.begin_session();
            for (duration, ok) in actions {
                aggregator.record_event(&mut record, *duration, *ok).unwrap();
            }
            let finalized = aggregator.finalize_session(&mut record, 2.0, true).unwrap();

            let row = finalized.sealed.to_persisted("S_round_trip");
            let restored = SessionRecord::try_from(&row).unwrap();
            assert_eq!(restored, finalized.sealed);

            let again = classifier.classify_record(&restored).unwrap();
            assert_eq!(again, finalized.classification);
        }
    }

    #[test]
    fn test_persisted_row_validation() {
        assert!(SessionRecord::try_from(&row(3.5, 2, 10, Some("Intermediate"))).is_ok());
        assert!(SessionRecord::try_from(&row(0.0, 0, 0, None)).is_ok());

        let malformed = [
            row(3.5, -1, 10, None),
            row(3.5, 2, -4, Some("Expert")),
            row(0.4, 2, 10, None),
            row(f64::NAN, 2, 10, None),
            row(2.0, 0, 0, None),
            row(3.5, 2, 10, Some("wizard")),
            row(3.5, i64::from(u32::MAX) + 1, 0, None),
        ];
        for bad in &malformed {
            assert!(
                matches!(SessionRecord::try_from(bad), Err(SessionError::MalformedRecord(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_action_event_trigger() {
        let sale = ActionEvent::sale_completed(0.5, true);
        assert!(sale.closes_session(SALE_COMPLETED));
        assert!(!ActionEvent::new("add_to_cart", 2.0, true).closes_session(SALE_COMPLETED));

        let json = serde_json::to_string(&sale).unwrap();
        let parsed: ActionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sale);
    }
}
