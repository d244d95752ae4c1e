//! # Membership Model
//!
//! Linguistic variables describing operator behavior at the terminal, each
//! partitioned into overlapping triangular terms. The shapes are fixed,
//! hand-authored constants; nothing here is fitted from data.
//!
//! | Variable                  | Domain  | low      | medium    | high         |
//! |---------------------------|---------|----------|-----------|--------------|
//! | AverageActionDuration (s) | [0,10]  | (0,0,3)  | (2,5,8)   | (6,10,10)    |
//! | ErrorsInSession           | [0,10]  | (0,0,1)  | (1,3,5)   | (4,8,10)     |
//! | TasksCompleted            | [0,30]  | (0,0,10) | (8,15,20) | (18,25,30)   |
//!
//! The output variable `SkillScore` spans `[0,100]` with the terms
//! Novice (0,0,40), Intermediate (30,50,70) and Expert (60,100,100).
//!
//! ## Copyright
//!
//! Copyright (c) 2025 ADAPOS Contributors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Triangular membership shape `(a, b, c)` with `a <= b <= c`
///
/// `a == b` or `b == c` produce a flat (shoulder) edge: the peak value 1.0
/// extends to the vertical side instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularShape {
    /// Left foot
    pub a: f64,
    /// Peak
    pub b: f64,
    /// Right foot
    pub c: f64,
}

impl TriangularShape {
    /// Create a new triangular shape
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Degree of membership of `x`, always in `[0.0, 1.0]`
    pub fn membership(&self, x: f64) -> f64 {
        if x.is_nan() || x < self.a || x > self.c {
            return 0.0;
        }
        if x == self.b {
            return 1.0;
        }

        // x lies strictly on one side of the peak, so the matching edge
        // has a non-zero width
        let degree = if x < self.b {
            (x - self.a) / (self.b - self.a)
        } else {
            (self.c - x) / (self.c - self.b)
        };

        degree.clamp(0.0, 1.0)
    }

    /// Membership clipped at `level` (Mamdani implication)
    pub fn clipped(&self, x: f64, level: f64) -> f64 {
        self.membership(x).min(level)
    }
}

/// Linguistic term of an input variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTerm {
    Low,
    Medium,
    High,
}

impl InputTerm {
    /// All input terms in ascending order
    pub const ALL: [InputTerm; 3] = [InputTerm::Low, InputTerm::Medium, InputTerm::High];

    /// Position of the term within [`InputTerm::ALL`]
    pub fn index(self) -> usize {
        match self {
            InputTerm::Low => 0,
            InputTerm::Medium => 1,
            InputTerm::High => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InputTerm::Low => "low",
            InputTerm::Medium => "medium",
            InputTerm::High => "high",
        }
    }
}

impl fmt::Display for InputTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Linguistic term of the `SkillScore` output variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTerm {
    Novice,
    Intermediate,
    Expert,
}

impl OutputTerm {
    /// All output terms in ascending skill order
    pub const ALL: [OutputTerm; 3] = [
        OutputTerm::Novice,
        OutputTerm::Intermediate,
        OutputTerm::Expert,
    ];

    /// Position of the term within [`OutputTerm::ALL`]
    pub fn index(self) -> usize {
        match self {
            OutputTerm::Novice => 0,
            OutputTerm::Intermediate => 1,
            OutputTerm::Expert => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputTerm::Novice => "novice",
            OutputTerm::Intermediate => "intermediate",
            OutputTerm::Expert => "expert",
        }
    }
}

impl fmt::Display for OutputTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behavioral input variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputVariable {
    /// Mean seconds spent per action
    AverageActionDuration,
    /// Failed actions in the session
    ErrorsInSession,
    /// Successful actions in the session
    TasksCompleted,
}

impl InputVariable {
    /// All input variables in rule-evaluation order
    pub const ALL: [InputVariable; 3] = [
        InputVariable::AverageActionDuration,
        InputVariable::ErrorsInSession,
        InputVariable::TasksCompleted,
    ];

    /// Position of the variable within [`InputVariable::ALL`]
    pub fn index(self) -> usize {
        match self {
            InputVariable::AverageActionDuration => 0,
            InputVariable::ErrorsInSession => 1,
            InputVariable::TasksCompleted => 2,
        }
    }

    /// Static definition of this variable
    pub fn linguistic(self) -> &'static LinguisticVariable<InputTerm> {
        match self {
            InputVariable::AverageActionDuration => &AVERAGE_ACTION_DURATION,
            InputVariable::ErrorsInSession => &ERRORS_IN_SESSION,
            InputVariable::TasksCompleted => &TASKS_COMPLETED,
        }
    }
}

impl fmt::Display for InputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.linguistic().name)
    }
}

/// Named numeric quantity partitioned into triangular terms over `[min, max]`
#[derive(Debug, Clone, Copy)]
pub struct LinguisticVariable<T: 'static> {
    /// Variable name
    pub name: &'static str,
    /// Lower domain bound
    pub min: f64,
    /// Upper domain bound
    pub max: f64,
    /// Terms in declaration order
    pub terms: &'static [(T, TriangularShape)],
}

impl<T: Copy + PartialEq> LinguisticVariable<T> {
    /// Clamp `x` to the declared domain
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }

    /// Shape of `term`, if the variable declares it
    pub fn shape(&self, term: T) -> Option<TriangularShape> {
        self.terms
            .iter()
            .find(|(candidate, _)| *candidate == term)
            .map(|(_, shape)| *shape)
    }

    /// Membership of `x` in `term` after clamping `x` to the domain
    pub fn membership(&self, term: T, x: f64) -> f64 {
        self.shape(term)
            .map_or(0.0, |shape| shape.membership(self.clamp(x)))
    }
}

/// Mean seconds per action
pub static AVERAGE_ACTION_DURATION: LinguisticVariable<InputTerm> = LinguisticVariable {
    name: "AverageActionDuration",
    min: 0.0,
    max: 10.0,
    terms: &[
        (InputTerm::Low, TriangularShape::new(0.0, 0.0, 3.0)),
        (InputTerm::Medium, TriangularShape::new(2.0, 5.0, 8.0)),
        (InputTerm::High, TriangularShape::new(6.0, 10.0, 10.0)),
    ],
};

/// Errors recorded in the session
pub static ERRORS_IN_SESSION: LinguisticVariable<InputTerm> = LinguisticVariable {
    name: "ErrorsInSession",
    min: 0.0,
    max: 10.0,
    terms: &[
        (InputTerm::Low, TriangularShape::new(0.0, 0.0, 1.0)),
        (InputTerm::Medium, TriangularShape::new(1.0, 3.0, 5.0)),
        (InputTerm::High, TriangularShape::new(4.0, 8.0, 10.0)),
    ],
};

/// Tasks completed in the session
pub static TASKS_COMPLETED: LinguisticVariable<InputTerm> = LinguisticVariable {
    name: "TasksCompleted",
    min: 0.0,
    max: 30.0,
    terms: &[
        (InputTerm::Low, TriangularShape::new(0.0, 0.0, 10.0)),
        (InputTerm::Medium, TriangularShape::new(8.0, 15.0, 20.0)),
        (InputTerm::High, TriangularShape::new(18.0, 25.0, 30.0)),
    ],
};

/// Continuous skill score
pub static SKILL_SCORE: LinguisticVariable<OutputTerm> = LinguisticVariable {
    name: "SkillScore",
    min: 0.0,
    max: 100.0,
    terms: &[
        (OutputTerm::Novice, TriangularShape::new(0.0, 0.0, 40.0)),
        (OutputTerm::Intermediate, TriangularShape::new(30.0, 50.0, 70.0)),
        (OutputTerm::Expert, TriangularShape::new(60.0, 100.0, 100.0)),
    ],
};

/// Degree to which `x` belongs to `term` of `variable`
///
/// Total over all reals: values outside the domain are clamped to the
/// nearest bound before evaluation.
pub fn membership(variable: InputVariable, term: InputTerm, x: f64) -> f64 {
    variable.linguistic().membership(term, x)
}
