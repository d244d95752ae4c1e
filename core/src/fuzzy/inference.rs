//! # Mamdani Inference Engine
//!
//! Turns the three behavioral counters of a session into a crisp skill score.
//!
//! ## Pipeline
//!
//! 1. **Clamping**: each input is clamped to its variable's domain. Out of
//!    range values are never rejected; NaN is, since it has no position in
//!    any domain.
//! 2. **Fuzzification**: membership of every input in each of its terms.
//! 3. **Rule evaluation**: firing strength of each rule (AND = min, OR = max).
//! 4. **Aggregation**: per output term, the maximum strength among the rules
//!    concluding that term. Each term's triangle is clipped at that strength
//!    and the clipped shapes are united by maximum.
//! 5. **Defuzzification**: centroid of the united set, integrated with the
//!    trapezoid rule on a uniform grid over `[0, 100]`.
//!
//! When no rule fires the united set has no area and the centroid is
//! undefined; the engine reports [`FuzzyError::NoActivation`] instead of
//! producing NaN and leaves the fallback policy to the caller.
//!
//! ## Copyright
//!
//! Copyright (c) 2025 ADAPOS Contributors

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::membership::{InputTerm, InputVariable, OutputTerm, SKILL_SCORE};
use super::rules::{firing_strengths, Rule, RULE_BASE, RULE_COUNT};
use super::{FuzzyError, FuzzyResult};

/// Default distance between centroid samples on the score axis
pub const DEFAULT_CENTROID_STEP: f64 = 0.1;

/// Coarsest sampling step accepted by [`InferenceEngine::with_resolution`]
pub const MAX_CENTROID_STEP: f64 = 0.5;

/// Raw behavioral inputs of one session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillInputs {
    /// Average seconds per action
    pub duration: f64,
    /// Number of failed actions
    pub errors: f64,
    /// Number of completed actions
    pub tasks: f64,
}

impl SkillInputs {
    /// Create a new set of inputs
    pub fn new(duration: f64, errors: f64, tasks: f64) -> Self {
        Self {
            duration,
            errors,
            tasks,
        }
    }

    /// Value supplied for `variable`
    pub fn value(&self, variable: InputVariable) -> f64 {
        match variable {
            InputVariable::AverageActionDuration => self.duration,
            InputVariable::ErrorsInSession => self.errors,
            InputVariable::TasksCompleted => self.tasks,
        }
    }

    /// Copy of the inputs clamped to their declared domains
    pub fn clamped(&self) -> Self {
        Self {
            duration: InputVariable::AverageActionDuration
                .linguistic()
                .clamp(self.duration),
            errors: InputVariable::ErrorsInSession.linguistic().clamp(self.errors),
            tasks: InputVariable::TasksCompleted.linguistic().clamp(self.tasks),
        }
    }

    fn validate(&self) -> FuzzyResult<()> {
        for variable in InputVariable::ALL {
            if self.value(variable).is_nan() {
                return Err(FuzzyError::NonFiniteInput(variable.linguistic().name));
            }
        }
        Ok(())
    }
}

/// Intermediate values of a single inference run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceTrace {
    /// Inputs after clamping
    pub inputs: SkillInputs,
    /// Membership degrees indexed by `[variable][term]`
    pub memberships: [[f64; 3]; 3],
    /// Firing strength per rule, indexed like [`RULE_BASE`]
    pub firing_strengths: [f64; RULE_COUNT],
    /// Aggregated strength per output term, indexed like [`OutputTerm::ALL`]
    pub activations: [f64; 3],
    /// Centroid of the aggregated set, `None` when no rule fired
    pub score: Option<f64>,
}

impl InferenceTrace {
    /// Membership of the clamped input for `variable` in `term`
    pub fn membership(&self, variable: InputVariable, term: InputTerm) -> f64 {
        self.memberships[variable.index()][term.index()]
    }

    /// Aggregated strength of `term`
    pub fn activation(&self, term: OutputTerm) -> f64 {
        self.activations[term.index()]
    }

    /// Output term with the strongest activation
    ///
    /// Ties resolve toward the lower skill term.
    pub fn dominant_term(&self) -> Option<OutputTerm> {
        let mut best: Option<(OutputTerm, f64)> = None;
        for term in OutputTerm::ALL {
            let strength = self.activation(term);
            if strength > best.map_or(0.0, |(_, s)| s) {
                best = Some((term, strength));
            }
        }
        best.map(|(term, _)| term)
    }

    /// Rules with a non-zero firing strength
    pub fn fired_rules(&self) -> impl Iterator<Item = (&'static Rule, f64)> + '_ {
        RULE_BASE
            .iter()
            .zip(self.firing_strengths.iter().copied())
            .filter(|(_, strength)| *strength > 0.0)
    }
}

/// Mamdani inference engine over the fixed rule base
///
/// Stateless apart from its sampling resolution, so it is `Send + Sync` and
/// may be shared freely between sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceEngine {
    step: f64,
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self {
            step: DEFAULT_CENTROID_STEP,
        }
    }
}

impl InferenceEngine {
    /// Create an engine sampling the score axis every [`DEFAULT_CENTROID_STEP`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom centroid sampling step
    ///
    /// A step that does not divide the score domain evenly is shrunk to the
    /// nearest one that does.
    pub fn with_resolution(step: f64) -> FuzzyResult<Self> {
        if !step.is_finite() || step <= 0.0 || step > MAX_CENTROID_STEP {
            return Err(FuzzyError::InvalidResolution(step));
        }
        Ok(Self { step })
    }

    /// Sampling step used for the centroid
    pub fn resolution(&self) -> f64 {
        self.step
    }

    /// Skill score in `[0, 100]` for the given raw counters
    pub fn infer(&self, duration: f64, errors: f64, tasks: f64) -> FuzzyResult<f64> {
        self.infer_inputs(SkillInputs::new(duration, errors, tasks))
    }

    /// Skill score in `[0, 100]` for `inputs`
    pub fn infer_inputs(&self, inputs: SkillInputs) -> FuzzyResult<f64> {
        let trace = self.explain(inputs)?;
        trace.score.ok_or(FuzzyError::NoActivation {
            duration: trace.inputs.duration,
            errors: trace.inputs.errors,
            tasks: trace.inputs.tasks,
        })
    }

    /// Run the full pipeline and keep every intermediate value
    ///
    /// A run in which no rule fires is not an error here; the trace simply
    /// carries `score: None`.
    pub fn explain(&self, inputs: SkillInputs) -> FuzzyResult<InferenceTrace> {
        inputs.validate()?;
        let inputs = inputs.clamped();

        let mut memberships = [[0.0; 3]; 3];
        for variable in InputVariable::ALL {
            let linguistic = variable.linguistic();
            for term in InputTerm::ALL {
                memberships[variable.index()][term.index()] =
                    linguistic.membership(term, inputs.value(variable));
            }
        }

        let degree = |variable: InputVariable, term: InputTerm| {
            memberships[variable.index()][term.index()]
        };
        let strengths = firing_strengths(&degree);

        let mut activations = [0.0_f64; 3];
        for (rule, strength) in RULE_BASE.iter().zip(strengths.iter()) {
            if *strength > 0.0 {
                trace!("{} fired at {:.4}", rule, strength);
            }
            let slot = &mut activations[rule.consequent.index()];
            *slot = slot.max(*strength);
        }

        let score = self.centroid(&activations);
        match score {
            Some(score) => debug!(
                "Skill score {:.2} for duration={:.2} errors={} tasks={} (activations {:?})",
                score, inputs.duration, inputs.errors, inputs.tasks, activations
            ),
            None => debug!(
                "No rule activated for duration={:.2} errors={} tasks={}",
                inputs.duration, inputs.errors, inputs.tasks
            ),
        }

        Ok(InferenceTrace {
            inputs,
            memberships,
            firing_strengths: strengths,
            activations,
            score,
        })
    }

    /// Centroid of the union of clipped output terms
    fn centroid(&self, activations: &[f64; 3]) -> Option<f64> {
        let clipped: Vec<_> = SKILL_SCORE
            .terms
            .iter()
            .map(|(term, shape)| (*shape, activations[term.index()]))
            .filter(|(_, level)| *level > 0.0)
            .collect();
        if clipped.is_empty() {
            return None;
        }

        // Trapezoid rule on a grid that divides the domain exactly; the
        // effective step never exceeds the configured one.
        let range = SKILL_SCORE.max - SKILL_SCORE.min;
        let intervals = (range / self.step).ceil().max(1.0) as usize;
        let h = range / intervals as f64;

        let mut moment = 0.0;
        let mut area = 0.0;
        for i in 0..=intervals {
            let x = if i == intervals {
                SKILL_SCORE.max
            } else {
                SKILL_SCORE.min + i as f64 * h
            };
            let weight = if i == 0 || i == intervals { 0.5 } else { 1.0 };
            let degree = clipped
                .iter()
                .map(|(shape, level)| shape.clipped(x, *level))
                .fold(0.0, f64::max);
            moment += weight * x * degree;
            area += weight * degree;
        }

        if area <= f64::EPSILON {
            return None;
        }
        Some((moment / area).clamp(SKILL_SCORE.min, SKILL_SCORE.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn score(duration: f64, errors: f64, tasks: f64) -> f64 {
        InferenceEngine::new()
            .infer(duration, errors, tasks)
            .expect("rules should fire")
    }

    #[test]
    fn test_slow_and_error_prone_scores_low() {
        init_logging();
        let s = score(8.0, 7.0, 5.0);
        assert!((s - 14.0).abs() < 0.01, "score was {}", s);
        assert!(s < 40.0);
    }

    #[test]
    fn test_average_operator_scores_middle() {
        init_logging();
        let s = score(5.0, 3.0, 10.0);
        assert!((s - 50.0).abs() < 0.01, "score was {}", s);

        let s = score(4.0, 0.0, 18.0);
        assert!((s - 50.0).abs() < 0.01, "score was {}", s);
    }

    #[test]
    fn test_fast_accurate_operator_scores_high() {
        init_logging();
        let s = score(2.0, 0.0, 25.0);
        assert!((s - 83.11).abs() < 0.01, "score was {}", s);
        assert!(s >= 70.0);
    }

    #[test]
    fn test_slow_but_precise_scores_low() {
        let s = score(9.0, 1.0, 8.0);
        assert!(s < 40.0, "score was {}", s);
    }

    #[test]
    fn test_mixed_activation() {
        let engine = InferenceEngine::new();
        let trace = engine.explain(SkillInputs::new(7.0, 3.0, 10.0)).unwrap();

        assert!((trace.activation(OutputTerm::Novice) - 0.25).abs() < 1e-9);
        assert!((trace.activation(OutputTerm::Intermediate) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(trace.activation(OutputTerm::Expert), 0.0);
        assert_eq!(trace.dominant_term(), Some(OutputTerm::Intermediate));

        let fired: Vec<u8> = trace.fired_rules().map(|(rule, _)| rule.id).collect();
        assert_eq!(fired, vec![1, 2, 12]);

        let s = trace.score.unwrap();
        assert!((s - 35.79).abs() < 0.01, "score was {}", s);
    }

    #[test]
    fn test_out_of_domain_inputs_are_clamped() {
        let engine = InferenceEngine::new();
        let clamped = engine.infer(15.0, -2.0, 40.0).unwrap();
        let bounds = engine.infer(10.0, 0.0, 30.0).unwrap();
        assert_eq!(clamped, bounds);

        let trace = engine.explain(SkillInputs::new(15.0, -2.0, 40.0)).unwrap();
        assert_eq!(trace.inputs, SkillInputs::new(10.0, 0.0, 30.0));
    }

    #[test]
    fn test_no_activation() {
        init_logging();
        let engine = InferenceEngine::new();

        // One error sits between the "low" and "medium" error terms
        match engine.infer(1.0, 1.0, 20.0) {
            Err(FuzzyError::NoActivation {
                duration,
                errors,
                tasks,
            }) => {
                assert_eq!((duration, errors, tasks), (1.0, 1.0, 20.0));
            }
            other => panic!("expected NoActivation, got {:?}", other),
        }

        let trace = engine.explain(SkillInputs::new(5.0, 1.0, 10.0)).unwrap();
        assert_eq!(trace.score, None);
        assert_eq!(trace.dominant_term(), None);
        assert_eq!(trace.fired_rules().count(), 0);
    }

    #[test]
    fn test_nan_input_rejected() {
        let engine = InferenceEngine::new();
        assert_eq!(
            engine.infer(f64::NAN, 0.0, 0.0),
            Err(FuzzyError::NonFiniteInput("AverageActionDuration"))
        );
        assert_eq!(
            engine.infer(1.0, 0.0, f64::NAN),
            Err(FuzzyError::NonFiniteInput("TasksCompleted"))
        );
    }

    #[test]
    fn test_infinite_inputs_clamp() {
        let engine = InferenceEngine::new();
        let s = engine.infer(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY).unwrap();
        assert!(s < 40.0);
    }

    #[test]
    fn test_resolution_bounds() {
        assert!(InferenceEngine::with_resolution(0.5).is_ok());
        assert!(InferenceEngine::with_resolution(0.01).is_ok());
        assert_eq!(
            InferenceEngine::with_resolution(1.0),
            Err(FuzzyError::InvalidResolution(1.0))
        );
        assert!(InferenceEngine::with_resolution(0.0).is_err());
        assert!(InferenceEngine::with_resolution(f64::NAN).is_err());
    }

    const REFERENCE_INPUTS: [(f64, f64, f64); 6] = [
        (8.0, 7.0, 5.0),
        (5.0, 3.0, 10.0),
        (2.0, 0.0, 25.0),
        (9.0, 1.0, 8.0),
        (7.0, 3.0, 10.0),
        (2.5, 0.0, 20.0),
    ];

    #[test]
    fn test_default_resolution_matches_fine_grid() {
        let reference = InferenceEngine::with_resolution(0.001).unwrap();
        let engine = InferenceEngine::new();
        for (d, e, t) in REFERENCE_INPUTS {
            let expected = reference.infer(d, e, t).unwrap();
            let actual = engine.infer(d, e, t).unwrap();
            assert!(
                (expected - actual).abs() < 0.01,
                "{} vs {} at ({}, {}, {})",
                actual,
                expected,
                d,
                e,
                t
            );
        }
    }

    #[test]
    fn test_coarse_resolution_stays_close() {
        let reference = InferenceEngine::with_resolution(0.001).unwrap();
        for step in [0.3, 0.5] {
            let coarse = InferenceEngine::with_resolution(step).unwrap();
            for (d, e, t) in REFERENCE_INPUTS {
                let a = reference.infer(d, e, t).unwrap();
                let b = coarse.infer(d, e, t).unwrap();
                assert!(
                    (a - b).abs() < 0.01,
                    "step {}: {} vs {} at ({}, {}, {})",
                    step,
                    b,
                    a,
                    d,
                    e,
                    t
                );
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let engine = InferenceEngine::new();
        let first = engine.infer(6.5, 4.5, 12.0).unwrap();
        let second = engine.infer(6.5, 4.5, 12.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_score_bounded_over_grid() {
        let engine = InferenceEngine::with_resolution(0.5).unwrap();
        let mut duration = 0.0;
        while duration <= 10.0 {
            for errors in 0..=10 {
                for tasks in (0..=30).step_by(3) {
                    match engine.infer(duration, errors as f64, tasks as f64) {
                        Ok(s) => assert!(
                            s.is_finite() && (0.0..=100.0).contains(&s),
                            "score {} at ({}, {}, {})",
                            s,
                            duration,
                            errors,
                            tasks
                        ),
                        Err(FuzzyError::NoActivation { .. }) => {}
                        Err(e) => panic!("unexpected error {}", e),
                    }
                }
            }
            duration += 0.5;
        }
    }

    #[test]
    fn test_shared_across_threads() {
        let engine = InferenceEngine::new();
        let expected = engine.infer(2.0, 0.0, 25.0).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| engine.infer(2.0, 0.0, 25.0).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
