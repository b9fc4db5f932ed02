use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EvaluationError, MetricMap};

/// Explanation of an evaluation: what happened to every modifier of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Final metrics. `None` if evaluation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EvaluationError>,
    /// One entry per modifier, in the item's declaration order.
    pub modifiers: Vec<ModifierDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierDetails {
    /// Position of the modifier in the item's modifier list.
    pub index: usize,
    pub metric: String,
    pub operation: String,
    pub outcome: ModifierOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "result")]
pub enum ModifierOutcome {
    /// Modifier was not reached (e.g., evaluation aborted before it).
    Unevaluated,
    /// Condition evaluated to `false`.
    ConditionFailed,
    /// Condition could not be evaluated and was treated as `false`.
    ConditionError { message: String },
    /// Another modifier won the stacking group.
    StackedOut,
    /// Modifier ran.
    Applied { before: f64, after: f64 },
}
