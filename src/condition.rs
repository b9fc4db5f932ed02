use serde::{Deserialize, Serialize};

use crate::{models::TryParse, AttributeValue, Attributes, ConditionError};

/// Boolean expression over item [`Attributes`].
///
/// In JSON, conditions are objects discriminated by `op`:
/// ```
/// # use modifier_engine::Condition;
/// let condition: Condition = serde_json::from_str(r#"
///   {"op": "and", "clauses": [
///     {"op": "eq", "attr": "rarity", "value": "Legendary"},
///     {"op": "not", "clause": {"op": "includes", "attr": "tags", "value": "Cursed"}},
///     {"op": "gte", "attr": "level", "value": 10}
///   ]}
/// "#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum Condition {
    /// Attribute equals the value. Lists compare element-wise (order matters).
    Eq { attr: String, value: AttributeValue },
    /// Attribute equals one of the values.
    In {
        attr: String,
        values: Vec<AttributeValue>,
    },
    /// List attribute contains the value.
    Includes { attr: String, value: String },
    Gt { attr: String, value: f64 },
    Gte { attr: String, value: f64 },
    Lt { attr: String, value: f64 },
    Lte { attr: String, value: f64 },
    /// All clauses hold. A clause in an unknown format is kept as raw JSON and reported when
    /// evaluation reaches it.
    And { clauses: Vec<TryParse<Condition>> },
    /// At least one clause holds.
    Or { clauses: Vec<TryParse<Condition>> },
    Not { clause: Box<TryParse<Condition>> },
}

impl Condition {
    pub fn eq(attr: impl Into<String>, value: impl Into<AttributeValue>) -> Condition {
        Condition::Eq {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<AttributeValue>>(
        attr: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Condition {
        Condition::In {
            attr: attr.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn includes(attr: impl Into<String>, value: impl Into<String>) -> Condition {
        Condition::Includes {
            attr: attr.into(),
            value: value.into(),
        }
    }

    pub fn gt(attr: impl Into<String>, value: f64) -> Condition {
        Condition::Gt {
            attr: attr.into(),
            value,
        }
    }

    pub fn gte(attr: impl Into<String>, value: f64) -> Condition {
        Condition::Gte {
            attr: attr.into(),
            value,
        }
    }

    pub fn lt(attr: impl Into<String>, value: f64) -> Condition {
        Condition::Lt {
            attr: attr.into(),
            value,
        }
    }

    pub fn lte(attr: impl Into<String>, value: f64) -> Condition {
        Condition::Lte {
            attr: attr.into(),
            value,
        }
    }

    pub fn and(clauses: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::And {
            clauses: clauses.into_iter().map(TryParse::Parsed).collect(),
        }
    }

    pub fn or(clauses: impl IntoIterator<Item = Condition>) -> Condition {
        Condition::Or {
            clauses: clauses.into_iter().map(TryParse::Parsed).collect(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(clause: Condition) -> Condition {
        Condition::Not {
            clause: Box::new(TryParse::Parsed(clause)),
        }
    }

    /// Operator name as it appears in JSON.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Eq { .. } => "eq",
            Condition::In { .. } => "in",
            Condition::Includes { .. } => "includes",
            Condition::Gt { .. } => "gt",
            Condition::Gte { .. } => "gte",
            Condition::Lt { .. } => "lt",
            Condition::Lte { .. } => "lte",
            Condition::And { .. } => "and",
            Condition::Or { .. } => "or",
            Condition::Not { .. } => "not",
        }
    }

    /// Evaluate condition against the attributes.
    ///
    /// Absent attributes make leaf conditions `false`. Applying an operator to an attribute of the
    /// wrong type is an error.
    pub fn evaluate(&self, attributes: &Attributes) -> Result<bool, ConditionError> {
        self.eval_at("$", attributes)
    }

    fn eval_at(&self, path: &str, attributes: &Attributes) -> Result<bool, ConditionError> {
        match self {
            Self::Eq { attr, value } => Ok(attributes.get(attr).is_some_and(|v| v == value)),

            Self::In { attr, values } => {
                Ok(attributes.get(attr).is_some_and(|v| values.contains(v)))
            }

            Self::Includes { attr, value } => {
                let Some(attribute) = attributes.get(attr) else {
                    return Ok(false);
                };
                let list = attribute
                    .as_list()
                    .ok_or_else(|| self.type_mismatch(path, attr, "list", attribute))?;
                Ok(list.iter().any(|v| v == value))
            }

            Self::Gt { attr, value }
            | Self::Gte { attr, value }
            | Self::Lt { attr, value }
            | Self::Lte { attr, value } => {
                let Some(attribute) = attributes.get(attr) else {
                    return Ok(false);
                };
                let n = attribute
                    .as_number()
                    .ok_or_else(|| self.type_mismatch(path, attr, "number", attribute))?;
                Ok(match self {
                    Self::Gt { .. } => n > *value,
                    Self::Gte { .. } => n >= *value,
                    Self::Lt { .. } => n < *value,
                    _ => n <= *value,
                })
            }

            Self::And { clauses } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if !clause.eval_at(&format!("{path}.and[{i}]"), attributes)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Self::Or { clauses } => {
                for (i, clause) in clauses.iter().enumerate() {
                    if clause.eval_at(&format!("{path}.or[{i}]"), attributes)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Self::Not { clause } => Ok(!clause.eval_at(&format!("{path}.not"), attributes)?),
        }
    }

    fn type_mismatch(
        &self,
        path: &str,
        attr: &str,
        expected: &str,
        found: &AttributeValue,
    ) -> ConditionError {
        ConditionError::TypeMismatch {
            path: format!("{path}.{}", self.operator()),
            operator: self.operator().to_owned(),
            attribute: attr.to_owned(),
            expected: expected.to_owned(),
            found: found.type_name().to_owned(),
        }
    }
}

impl TryParse<Condition> {
    /// Evaluate a possibly-unparsed condition. A condition that failed to parse is reported as
    /// [`ConditionError::Malformed`].
    pub fn evaluate(&self, attributes: &Attributes) -> Result<bool, ConditionError> {
        self.eval_at("$", attributes)
    }

    fn eval_at(&self, path: &str, attributes: &Attributes) -> Result<bool, ConditionError> {
        match self {
            TryParse::Parsed(condition) => condition.eval_at(path, attributes),
            TryParse::ParseFailed(raw) => Err(ConditionError::Malformed {
                path: path.to_owned(),
                reason: describe_unparsed(raw),
            }),
        }
    }
}

/// Human-readable reason a condition failed to parse.
pub(crate) fn describe_unparsed(raw: &serde_json::Value) -> String {
    match raw.get("op").and_then(|op| op.as_str()) {
        Some(op) if !KNOWN_OPERATORS.contains(&op) => format!("unknown operator `{op}`"),
        Some(op) => format!("invalid `{op}` clause: {raw}"),
        None => format!("missing `op` in {raw}"),
    }
}

const KNOWN_OPERATORS: &[&str] = &[
    "eq", "in", "includes", "gt", "gte", "lt", "lte", "and", "or", "not",
];
