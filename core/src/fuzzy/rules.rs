//! Rule Base
//!
//! The twelve fixed rules mapping behavioral terms to skill terms. Rules are
//! stored as a `static` table of tagged antecedent trees so nothing is built
//! per call; AND is the minimum of its operands, OR the maximum, and rules
//! carry no weights.
//!
//! Copyright (c) 2025 ADAPOS Contributors

use std::fmt;

use super::membership::{InputTerm, InputVariable, OutputTerm};

/// Number of rules in [`RULE_BASE`]
pub const RULE_COUNT: usize = 12;

/// Antecedent expression tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Antecedent {
    /// Leaf: `variable is term`
    Is(InputVariable, InputTerm),
    /// Minimum of all operands (1.0 when empty)
    And(&'static [Antecedent]),
    /// Maximum of all operands (0.0 when empty)
    Or(&'static [Antecedent]),
}

impl Antecedent {
    /// Truth value of the expression given a membership lookup
    ///
    /// `degree` must return values in `[0, 1]`; the result then stays in
    /// `[0, 1]` as well.
    pub fn evaluate<F>(&self, degree: &F) -> f64
    where
        F: Fn(InputVariable, InputTerm) -> f64,
    {
        match self {
            Antecedent::Is(variable, term) => degree(*variable, *term),
            Antecedent::And(operands) => operands
                .iter()
                .map(|operand| operand.evaluate(degree))
                .fold(1.0, f64::min),
            Antecedent::Or(operands) => operands
                .iter()
                .map(|operand| operand.evaluate(degree))
                .fold(0.0, f64::max),
        }
    }
}

impl fmt::Display for Antecedent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (operands, joiner) = match self {
            Antecedent::Is(variable, term) => return write!(f, "{} is {}", variable, term),
            Antecedent::And(operands) => (operands, " AND "),
            Antecedent::Or(operands) => (operands, " OR "),
        };

        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            match operand {
                Antecedent::Is(..) => write!(f, "{}", operand)?,
                _ => write!(f, "({})", operand)?,
            }
        }
        Ok(())
    }
}

/// A single IF-THEN rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    /// 1-based rule number
    pub id: u8,
    /// Condition over the input terms
    pub antecedent: Antecedent,
    /// Output term receiving the firing strength
    pub consequent: OutputTerm,
}

impl Rule {
    /// Firing strength of this rule
    pub fn fire<F>(&self, degree: &F) -> f64
    where
        F: Fn(InputVariable, InputTerm) -> f64,
    {
        self.antecedent.evaluate(degree)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}: IF {} THEN {}", self.id, self.antecedent, self.consequent)
    }
}

use self::Antecedent::{And, Is, Or};
use super::membership::InputTerm::{High, Low, Medium};
use super::membership::InputVariable::{
    AverageActionDuration as Duration, ErrorsInSession as Errors, TasksCompleted as Tasks,
};

/// The fixed rule base, in evaluation order
pub static RULE_BASE: [Rule; RULE_COUNT] = [
    Rule {
        id: 1,
        antecedent: Or(&[Is(Duration, High), Is(Errors, High)]),
        consequent: OutputTerm::Novice,
    },
    Rule {
        id: 2,
        antecedent: And(&[Is(Duration, Medium), Is(Errors, Medium)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 3,
        antecedent: And(&[Is(Duration, Low), Is(Errors, Low), Is(Tasks, High)]),
        consequent: OutputTerm::Expert,
    },
    Rule {
        id: 4,
        antecedent: And(&[Is(Duration, Low), Is(Errors, Low), Is(Tasks, Medium)]),
        consequent: OutputTerm::Expert,
    },
    Rule {
        id: 5,
        antecedent: And(&[Is(Duration, Medium), Is(Errors, Low), Is(Tasks, Medium)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 6,
        antecedent: And(&[Is(Duration, Low), Is(Errors, Medium), Is(Tasks, High)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 7,
        antecedent: And(&[Is(Duration, High), Is(Errors, Low)]),
        consequent: OutputTerm::Novice,
    },
    Rule {
        id: 8,
        antecedent: And(&[Is(Duration, Medium), Is(Errors, High)]),
        consequent: OutputTerm::Novice,
    },
    Rule {
        id: 9,
        antecedent: And(&[Is(Duration, Low), Is(Errors, Low), Is(Tasks, Low)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 10,
        antecedent: And(&[Is(Duration, Medium), Is(Errors, Low), Is(Tasks, High)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 11,
        antecedent: And(&[Is(Duration, Low), Is(Errors, Medium), Is(Tasks, Medium)]),
        consequent: OutputTerm::Intermediate,
    },
    Rule {
        id: 12,
        antecedent: And(&[Is(Duration, High), Is(Errors, Medium)]),
        consequent: OutputTerm::Novice,
    },
];

/// Firing strength of every rule in [`RULE_BASE`], indexed like the table
pub fn firing_strengths<F>(degree: &F) -> [f64; RULE_COUNT]
where
    F: Fn(InputVariable, InputTerm) -> f64,
{
    let mut strengths = [0.0; RULE_COUNT];
    for (strength, rule) in strengths.iter_mut().zip(RULE_BASE.iter()) {
        *strength = rule.fire(degree);
    }
    strengths
}
