use serde::{Deserialize, Serialize};

use crate::{validation, Result};

/// Static schema shared by all evaluations: which metrics exist, which operations modifiers may
/// use, and which attributes items may carry.
///
/// `ConfigSpec` is created once at startup and never mutated. Share it with `Arc<ConfigSpec>`.
///
/// Deserializing a `ConfigSpec` does not validate it. Use [`ConfigSpec::new`] or
/// [`validate_config`](crate::validation::validate_config) for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    /// Metric names, in declaration order.
    pub metrics: Vec<String>,
    /// Operation names modifiers are allowed to use.
    pub operations: Vec<String>,
    /// Attribute schemas.
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
}

impl ConfigSpec {
    /// Create a validated configuration.
    ///
    /// ```
    /// # use modifier_engine::ConfigSpec;
    /// let config = ConfigSpec::new(
    ///     ["Health", "Mana"],
    ///     ["sum", "subtract", "multiply"],
    ///     vec![],
    /// ).unwrap();
    /// assert!(config.has_metric("Health"));
    /// ```
    pub fn new<M, O>(
        metrics: impl IntoIterator<Item = M>,
        operations: impl IntoIterator<Item = O>,
        attributes: Vec<AttributeSchema>,
    ) -> Result<ConfigSpec>
    where
        M: Into<String>,
        O: Into<String>,
    {
        let config = ConfigSpec {
            metrics: metrics.into_iter().map(Into::into).collect(),
            operations: operations.into_iter().map(Into::into).collect(),
            attributes,
        };
        validation::validate_config(&config)?;
        Ok(config)
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.metrics.iter().any(|m| m == metric)
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }

    /// Return the schema for the given attribute key.
    pub fn attribute(&self, key: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|schema| schema.key == key)
    }
}

/// Declares one named attribute and its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    pub key: String,
    #[serde(flatten)]
    pub kind: AttributeKind,
}

impl AttributeSchema {
    pub fn new(key: impl Into<String>, kind: AttributeKind) -> AttributeSchema {
        AttributeSchema {
            key: key.into(),
            kind,
        }
    }
}

/// Type of an attribute along with its constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AttributeKind {
    /// One (or, with [`Cardinality::Multi`], several) values from a fixed set.
    #[serde(rename_all = "camelCase")]
    Enum {
        values: Vec<String>,
        #[serde(default)]
        cardinality: Cardinality,
    },
    Boolean,
    #[serde(rename_all = "camelCase")]
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default)]
        integer: bool,
    },
    #[serde(rename_all = "camelCase")]
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        /// Regular expression the value must match. Unanchored unless the pattern uses `^`/`$`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    #[default]
    Single,
    Multi,
}
