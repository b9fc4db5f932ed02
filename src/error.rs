use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Represents a result type for operations in the modifier engine.
///
/// The error variant is the crate-level [`Error`] enum. Component functions that can only fail
/// in one way (e.g., [`evaluate`](crate::evaluate)) return their specific error type instead.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing all errors that can be returned by the crate.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Error evaluating a condition directly.
    #[error(transparent)]
    Condition(#[from] ConditionError),

    /// Error evaluating an item.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Error registering an operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration or item failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON encoding or decoding failed.
    #[error(transparent)]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    Json(Arc<serde_json::Error>),

    /// A thread panicked while holding the operation registry lock. This should normally never
    /// happen.
    #[error("operation registry lock is poisoned")]
    RegistryPoisoned,
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Arc::new(value))
    }
}

/// Errors raised by direct calls to the condition evaluator.
///
/// `path` identifies the failing sub-clause, starting from `$` for the root condition, e.g.
/// `$.and[1].not.gt`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
#[non_exhaustive]
pub enum ConditionError {
    /// Attribute value has a type the operator cannot be applied to.
    #[error("{path}: operator `{operator}` expects {expected} attribute `{attribute}`, found {found}")]
    TypeMismatch {
        /// Path of the failing clause.
        path: String,
        /// Operator of the failing clause.
        operator: String,
        /// Attribute key the clause refers to.
        attribute: String,
        /// Expected attribute type.
        expected: String,
        /// Actual attribute type.
        found: String,
    },

    /// Condition structure could not be understood (unknown operator or malformed clause).
    #[error("{path}: malformed condition: {reason}")]
    Malformed {
        /// Path of the failing clause.
        path: String,
        /// Human-readable description of the problem.
        reason: String,
    },
}

/// Fatal errors aborting the whole evaluation. No partial result is produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
#[non_exhaustive]
pub enum EvaluationError {
    /// Modifier references an operation that is not registered.
    #[error("modifier #{index} references unknown operation `{operation}`")]
    UnknownOperation {
        /// Position of the modifier in the item's modifier list.
        index: usize,
        /// Operation name.
        operation: String,
    },

    /// Modifier targets a metric that is not declared in the configuration.
    #[error("modifier #{index} targets unknown metric `{metric}`")]
    UnknownMetric {
        /// Position of the modifier in the item's modifier list.
        index: usize,
        /// Metric name.
        metric: String,
    },

    /// Operation produced NaN or infinity.
    #[error("modifier #{index} ({operation} on `{metric}`) produced non-finite value {value}")]
    NonFiniteResult {
        /// Position of the modifier in the item's modifier list.
        index: usize,
        /// Metric name.
        metric: String,
        /// Operation name.
        operation: String,
        /// The offending value.
        value: f64,
    },

    /// Caller-supplied base value is NaN or infinity.
    #[error("base value {value} for metric `{metric}` is not finite")]
    NonFiniteBase {
        /// Metric name.
        metric: String,
        /// The offending value.
        value: f64,
    },

    /// Operation implementation panicked.
    #[error("modifier #{index} ({operation} on `{metric}`) failed: {message}")]
    OperationPanicked {
        /// Position of the modifier in the item's modifier list.
        index: usize,
        /// Metric name.
        metric: String,
        /// Operation name.
        operation: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Errors registering operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// Built-in operations cannot be redefined.
    #[error("cannot override built-in operation `{0}`")]
    BuiltinOverride(String),
}

/// Validation failed. Contains every problem found, not only the first one.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("validation failed with {} issue(s){}", .issues.len(), describe_issues(.issues))]
pub struct ValidationError {
    /// Problems found, in a stable order.
    pub issues: Vec<ValidationIssue>,
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location of the problem, e.g. `modifiers[2].condition.and[0]`.
    pub path: String,
    pub message: String,
}

fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("; {}: {}", issue.path, issue.message))
        .collect()
}
