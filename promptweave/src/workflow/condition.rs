//! Condition evaluation for branches, loops and transitions
//!
//! Conditions are pure predicates over a step's output and result. Malformed
//! configuration (bad regex, non-numeric comparison value) degrades to "not
//! satisfied" at evaluation time; the validator reports it as a hard error.

use crate::workflow::StepResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What aspect of a step's outcome the condition inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionType {
    /// Case-insensitive substring test against the output
    #[default]
    OutputContains,
    /// Case-insensitive full-string equality against the output
    OutputMatches,
    /// Numeric comparison against the output length
    OutputLength,
    /// The step result exists and succeeded
    Success,
    /// Numeric comparison against the tokens used by the step
    TokenCount,
    /// Case-sensitive regex match against the output
    Regex,
}

impl ConditionType {
    /// Whether this condition type requires a non-empty comparison value
    pub fn requires_comparison_value(&self) -> bool {
        !matches!(self, ConditionType::Success)
    }
}

/// Comparison operator for value-based condition types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConditionOperator {
    /// Values are equal
    #[default]
    Equals,
    /// Values differ
    NotEquals,
    /// Left contains right
    Contains,
    /// Left is greater than right
    GreaterThan,
    /// Left is less than right
    LessThan,
    /// Left is greater than or equal to right
    GreaterOrEqual,
    /// Left is less than or equal to right
    LessOrEqual,
    /// Left matches the regex on the right
    RegexMatch,
}

/// A predicate over a step's output and result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Aspect of the outcome to inspect
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// Comparison operator (only honored by numeric condition types)
    #[serde(default)]
    pub operator: ConditionOperator,
    /// Value to compare against
    #[serde(default)]
    pub comparison_value: String,
}

impl Condition {
    /// Create a condition with the default operator
    pub fn new(condition_type: ConditionType, comparison_value: impl Into<String>) -> Self {
        Self {
            condition_type,
            operator: ConditionOperator::default(),
            comparison_value: comparison_value.into(),
        }
    }

    /// Evaluate the condition against a step's output and result.
    ///
    /// Pure: no side effects, no I/O, never panics on malformed configuration.
    pub fn evaluate(&self, output: &str, result: Option<&StepResult>) -> bool {
        match self.condition_type {
            ConditionType::Success => result.map(|r| r.success).unwrap_or(false),
            // OutputContains always uses Contains semantics regardless of the
            // configured operator. Pinned behavior; see the validator docs.
            ConditionType::OutputContains => output
                .to_lowercase()
                .contains(&self.comparison_value.to_lowercase()),
            ConditionType::OutputMatches => {
                output.to_lowercase() == self.comparison_value.to_lowercase()
            }
            ConditionType::OutputLength => {
                self.compare_numeric(output.chars().count() as i64)
            }
            ConditionType::TokenCount => {
                self.compare_numeric(result.map(|r| r.tokens_used as i64).unwrap_or(0))
            }
            ConditionType::Regex => match Regex::new(&self.comparison_value) {
                Ok(re) => re.is_match(output),
                // Invalid pattern is "no match", never an error here.
                Err(_) => false,
            },
        }
    }

    fn compare_numeric(&self, left: i64) -> bool {
        let right: i64 = self.comparison_value.trim().parse().unwrap_or(0);
        match self.operator {
            ConditionOperator::Equals => left == right,
            ConditionOperator::NotEquals => left != right,
            ConditionOperator::GreaterThan => left > right,
            ConditionOperator::LessThan => left < right,
            ConditionOperator::GreaterOrEqual => left >= right,
            ConditionOperator::LessOrEqual => left <= right,
            // Contains/RegexMatch make no sense numerically.
            ConditionOperator::Contains | ConditionOperator::RegexMatch => false,
        }
    }
}
