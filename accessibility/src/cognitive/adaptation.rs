//! # Point-of-Sale Interface Adaptation
//!
//! Chooses the terminal interface an operator sees next from the skill level
//! inferred at the close of each sale. The manager is the entry point for
//! the front end: it routes every [`ActionEvent`] into the session record,
//! classifies the session when the sale closes, and reports which interface
//! should be served.
//!
//! ## Interfaces
//!
//! * `Simplified` for Novice operators: large controls, guided flow
//! * `Balanced` for Intermediate operators
//! * `Advanced` for Expert operators: shortcuts, dense layout
//! * `Original` is the static interface served while adaptation is disabled
//!
//! Level changes take effect at sale boundaries only; ordinary actions never
//! switch the interface mid-sale.
//!
//! ## Key Components
//!
//! * `AdaptationParameters`: JSON-backed configuration
//! * `AdaptationManager`: per-session event router and interface selector
//! * `label_history`: batch re-classification of stored session rows
//!
//! ## Copyright
//!
//! Copyright (c) 2025 ADAPOS Contributors

use std::fmt;
use std::fs;
use std::path::Path;

use adapos_core::InferenceEngine;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cognitive::classification::{ClassificationResult, SkillClassifier, SkillLevel};
use crate::cognitive::session::{
    ActionEvent, PersistedSession, SessionAggregator, SessionError, SessionRecord, SALE_COMPLETED,
};

/// Adaptation error types
#[derive(Error, Debug)]
pub enum AdaptationError {
    /// Configuration values are unusable
    #[error("Invalid adaptation parameters: {0}")]
    InvalidParameters(String),

    /// Error propagated from session aggregation
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A stored session row could not be restored
    #[error("Malformed row for session {session_id}: {source}")]
    MalformedRow {
        session_id: String,
        #[source]
        source: SessionError,
    },

    /// Reading or writing the configuration file failed
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration JSON could not be parsed or produced
    #[error("Configuration format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for adaptation operations
pub type AdaptationResult<T> = Result<T, AdaptationError>;

/// Interface variant served to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceMode {
    /// Static interface, used while adaptation is disabled
    Original,
    /// Reduced interface for Novice operators
    Simplified,
    /// Standard interface for Intermediate operators
    Balanced,
    /// Full interface for Expert operators
    Advanced,
}

impl InterfaceMode {
    /// Interface matching a skill level
    pub fn for_level(level: SkillLevel) -> Self {
        match level {
            SkillLevel::Novice => InterfaceMode::Simplified,
            SkillLevel::Intermediate => InterfaceMode::Balanced,
            SkillLevel::Expert => InterfaceMode::Advanced,
        }
    }

    /// Route slug the front end serves this interface under
    pub fn slug(self) -> &'static str {
        match self {
            InterfaceMode::Original => "original",
            InterfaceMode::Simplified => "novato",
            InterfaceMode::Balanced => "intermedio",
            InterfaceMode::Advanced => "experto",
        }
    }

    /// Human readable description
    pub fn label(self) -> &'static str {
        match self {
            InterfaceMode::Original => "Original static interface",
            InterfaceMode::Simplified => "Novice: simplified interface",
            InterfaceMode::Balanced => "Intermediate: balanced interface",
            InterfaceMode::Advanced => "Expert: advanced interface",
        }
    }
}

impl fmt::Display for InterfaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Adaptation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationParameters {
    /// Whether the interface follows the inferred skill level
    pub adaptation_enabled: bool,
    /// Event kind that closes a session
    pub finalize_event_kind: String,
    /// Centroid sampling step on the score axis
    pub centroid_step: f64,
}

impl Default for AdaptationParameters {
    fn default() -> Self {
        Self {
            adaptation_enabled: true,
            finalize_event_kind: SALE_COMPLETED.to_string(),
            centroid_step: adapos_core::fuzzy::DEFAULT_CENTROID_STEP,
        }
    }
}

impl AdaptationParameters {
    /// Parse parameters from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> AdaptationResult<Self> {
        let parameters: Self = serde_json::from_str(json)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Serialize parameters as pretty-printed JSON
    pub fn to_json_string(&self) -> AdaptationResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load parameters from a JSON file
    pub fn load(path: impl AsRef<Path>) -> AdaptationResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load parameters from a JSON file, using defaults when the file is
    /// missing or unusable
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(parameters) => parameters,
            Err(e) => {
                warn!(
                    "Using default adaptation parameters, could not load {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Write parameters to a JSON file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> AdaptationResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Check parameter consistency
    pub fn validate(&self) -> AdaptationResult<()> {
        if self.finalize_event_kind.trim().is_empty() {
            return Err(AdaptationError::InvalidParameters(
                "finalize_event_kind must not be empty".to_string(),
            ));
        }
        self.classifier().map(|_| ())
    }

    /// Classifier configured with the centroid step
    fn classifier(&self) -> AdaptationResult<SkillClassifier> {
        InferenceEngine::with_resolution(self.centroid_step)
            .map(SkillClassifier::with_engine)
            .map_err(|e| AdaptationError::InvalidParameters(e.to_string()))
    }
}

/// Result of closing a sale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// Score and level of the closed session
    pub classification: ClassificationResult,
    /// Sealed record, ready to be persisted by the caller
    pub sealed: SessionRecord,
    /// Interface served before the sale closed
    pub previous_interface: InterfaceMode,
    /// Interface to serve next
    pub interface: InterfaceMode,
    /// Whether the interface switches
    pub interface_changed: bool,
}

/// Outcome of handling one action event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    /// Ordinary action folded into the live record; no classification
    ActionRecorded { record: SessionRecord },
    /// The sale closed and the session was classified
    SessionCompleted(SessionReport),
}

/// Snapshot of the manager state for status endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationStatus {
    pub adaptation_enabled: bool,
    pub interface: InterfaceMode,
    pub last_classification: Option<ClassificationResult>,
    pub live_record: SessionRecord,
    pub completed_sessions: u64,
}

/// Routes action events for one operator session and selects its interface
///
/// Holds the live record of a single session. The caller keeps one manager
/// per session key and serializes access to it.
#[derive(Debug, Clone)]
pub struct AdaptationManager {
    parameters: AdaptationParameters,
    aggregator: SessionAggregator,
    record: SessionRecord,
    interface: InterfaceMode,
    last_classification: Option<ClassificationResult>,
    completed_sessions: u64,
}

impl AdaptationManager {
    /// Create a new manager; the original interface is served until the
    /// first sale closes
    pub fn new(parameters: AdaptationParameters) -> AdaptationResult<Self> {
        parameters.validate()?;
        let aggregator = SessionAggregator::with_classifier(parameters.classifier()?);
        let record = aggregator.begin_session();

        Ok(Self {
            parameters,
            aggregator,
            record,
            interface: InterfaceMode::Original,
            last_classification: None,
            completed_sessions: 0,
        })
    }

    pub fn parameters(&self) -> &AdaptationParameters {
        &self.parameters
    }

    /// Interface to serve right now
    pub fn current_interface(&self) -> InterfaceMode {
        self.interface
    }

    /// Live (unsealed) record of the current session
    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn last_classification(&self) -> Option<&ClassificationResult> {
        self.last_classification.as_ref()
    }

    /// Handle one action event from the front end
    pub fn handle_event(&mut self, event: &ActionEvent) -> AdaptationResult<EventOutcome> {
        self.route_event(event).map_err(|e| {
            warn!("Rejected '{}' event: {}", event.event_kind, e);
            e
        })
    }

    /// Return to the original interface and start over
    ///
    /// The live record is discarded without being classified. Parameters,
    /// including the adaptation toggle, are kept.
    pub fn reset(&mut self) {
        info!(
            "Resetting adaptation: discarding {} live events and {} completed sessions",
            self.record.event_count(),
            self.completed_sessions
        );
        self.record = self.aggregator.begin_session();
        self.interface = InterfaceMode::Original;
        self.last_classification = None;
        self.completed_sessions = 0;
    }

    /// Enable or disable adaptation
    ///
    /// Disabling falls back to the original interface immediately. Enabling
    /// restores the interface of the last classified session, if any.
    pub fn set_adaptation_enabled(&mut self, enabled: bool) {
        if self.parameters.adaptation_enabled == enabled {
            return;
        }
        self.parameters.adaptation_enabled = enabled;

        let interface = self.select_interface(self.last_classification.map(|c| c.level()));
        info!(
            "Adaptation {}: serving {}",
            if enabled { "enabled" } else { "disabled" },
            interface
        );
        self.interface = interface;
    }

    /// Snapshot of the current state
    pub fn status(&self) -> AdaptationStatus {
        AdaptationStatus {
            adaptation_enabled: self.parameters.adaptation_enabled,
            interface: self.interface,
            last_classification: self.last_classification,
            live_record: self.record.clone(),
            completed_sessions: self.completed_sessions,
        }
    }

    fn route_event(&mut self, event: &ActionEvent) -> AdaptationResult<EventOutcome> {
        if event.closes_session(&self.parameters.finalize_event_kind) {
            return self.close_session(event).map(EventOutcome::SessionCompleted);
        }

        self.aggregator
            .record_event(&mut self.record, event.duration_seconds, event.succeeded)?;

        debug!("Recorded '{}' event", event.event_kind);
        Ok(EventOutcome::ActionRecorded {
            record: self.record.clone(),
        })
    }

    fn close_session(&mut self, event: &ActionEvent) -> AdaptationResult<SessionReport> {
        let finalized = self.aggregator.finalize_session(
            &mut self.record,
            event.duration_seconds,
            event.succeeded,
        )?;
        let classification = finalized.classification;

        let previous_interface = self.interface;
        let interface = self.select_interface(Some(classification.level()));
        let interface_changed = interface != previous_interface;
        if interface_changed {
            info!("Switching interface: {} -> {}", previous_interface, interface);
        }

        self.interface = interface;
        self.last_classification = Some(classification);
        self.completed_sessions += 1;

        Ok(SessionReport {
            classification,
            sealed: finalized.sealed,
            previous_interface,
            interface,
            interface_changed,
        })
    }

    fn select_interface(&self, level: Option<SkillLevel>) -> InterfaceMode {
        match level {
            Some(level) if self.parameters.adaptation_enabled => InterfaceMode::for_level(level),
            _ => InterfaceMode::Original,
        }
    }
}

/// Classification of one stored session row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledSession {
    pub session_id: String,
    pub classification: ClassificationResult,
    pub interface: InterfaceMode,
    /// Level stored in the row, if it carried one
    pub stored_level: Option<SkillLevel>,
}

impl LabeledSession {
    /// Whether the fresh classification disagrees with the stored label
    pub fn relabeled(&self) -> bool {
        self.stored_level
            .map_or(false, |stored| stored != self.classification.level())
    }
}

/// Re-classify stored session rows
///
/// Rows are expected to come from [`SessionRecord::to_persisted`] on a sealed
/// record: a labeled row is taken to include the closing sale, so a labeled
/// row holding a single event gets the empty-session default rather than an
/// inferred score. Unlabeled rows are classified on all of their events.
///
/// Rows are independent, so they are classified in parallel; the output
/// keeps the input order. Malformed rows yield an error in their slot
/// without affecting the others.
pub fn label_history(
    classifier: &SkillClassifier,
    rows: &[PersistedSession],
) -> Vec<AdaptationResult<LabeledSession>> {
    rows.par_iter()
        .map(|row| {
            let malformed = |source: SessionError| AdaptationError::MalformedRow {
                session_id: row.session_id.clone(),
                source,
            };
            let record = SessionRecord::try_from(row).map_err(malformed)?;
            let classification = classifier
                .classify_record(&record)
                .map_err(|e| malformed(e.into()))?;

            Ok(LabeledSession {
                session_id: row.session_id.clone(),
                classification,
                interface: InterfaceMode::for_level(classification.level()),
                stored_level: record.level_label(),
            })
        })
        .collect()
}
