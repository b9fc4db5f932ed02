use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{condition::Condition, Attributes};

/// Mapping from metric name to its value.
pub type MetricMap = HashMap<String, f64>;

/// The unit of evaluation input: a bag of attributes and an ordered list of modifiers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Modifiers in declaration order. Order is significant: it is the final tie-break during
    /// sequencing and stacking.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// One rule: apply `operation` with `value` to `metric`, optionally gated by a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub metric: String,
    pub operation: String,
    pub value: f64,
    /// Value is wrapped in `TryParse` so that a condition we fail to parse (e.g., legacy format)
    /// does not fail the whole item. Such a condition never matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<TryParse<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacking: Option<Stacking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Modifier {
    /// Create an unconditional modifier with default stacking and priority.
    pub fn new(metric: impl Into<String>, operation: impl Into<String>, value: f64) -> Modifier {
        Modifier {
            metric: metric.into(),
            operation: operation.into(),
            value,
            condition: None,
            stacking: None,
            priority: None,
            source: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Modifier {
        self.condition = Some(TryParse::Parsed(condition));
        self
    }

    pub fn with_stacking(mut self, stacking: Stacking) -> Modifier {
        self.stacking = Some(stacking);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Modifier {
        self.priority = Some(priority);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Modifier {
        self.source = Some(source.into());
        self
    }

    /// Explicit priority, or 0 if unspecified.
    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(0)
    }

    /// Stacking policy, or [`Stacking::Stack`] if unspecified.
    pub fn effective_stacking(&self) -> &Stacking {
        self.stacking.as_ref().unwrap_or(&Stacking::Stack)
    }
}

/// Policy governing whether conflicting modifiers collapse to one.
///
/// In JSON, this is either `"stack"`, `"unique"` or `{"uniqueBy": "<key>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "StackingRepr", into = "StackingRepr")]
pub enum Stacking {
    /// Every modifier applies.
    #[default]
    Stack,
    /// Only one modifier per `metric|operation|source` applies.
    Unique,
    /// Only one modifier per custom key applies, regardless of metric or operation.
    UniqueBy(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StackingRepr {
    Policy(StackingPolicy),
    #[serde(rename_all = "camelCase")]
    Custom {
        unique_by: String,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum StackingPolicy {
    Stack,
    Unique,
}

impl From<StackingRepr> for Stacking {
    fn from(value: StackingRepr) -> Self {
        match value {
            StackingRepr::Policy(StackingPolicy::Stack) => Stacking::Stack,
            StackingRepr::Policy(StackingPolicy::Unique) => Stacking::Unique,
            StackingRepr::Custom { unique_by } => Stacking::UniqueBy(unique_by),
        }
    }
}

impl From<Stacking> for StackingRepr {
    fn from(value: Stacking) -> Self {
        match value {
            Stacking::Stack => StackingRepr::Policy(StackingPolicy::Stack),
            Stacking::Unique => StackingRepr::Policy(StackingPolicy::Unique),
            Stacking::UniqueBy(unique_by) => StackingRepr::Custom { unique_by },
        }
    }
}

/// `TryParse` allows the subfield to fail parsing without failing the parsing of the whole
/// structure.
///
/// This can be helpful to isolate errors in a subtree. e.g., if one modifier's condition is in an
/// unknown format, the rest of the item is still usable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TryParse<T> {
    /// Successfully parsed.
    Parsed(T),
    /// Parsing failed.
    ParseFailed(serde_json::Value),
}
impl<T> From<T> for TryParse<T> {
    fn from(value: T) -> Self {
        TryParse::Parsed(value)
    }
}
impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// Final metric values plus the ordered trace of modifiers that actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub metrics: MetricMap,
    pub applied: Vec<ModifierApplication>,
}

/// Record of one modifier application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifierApplication {
    pub modifier: Modifier,
    pub applied_value: f64,
    /// Metric value before the modifier was applied.
    pub before: f64,
    /// Metric value after the modifier was applied.
    pub after: f64,
}
