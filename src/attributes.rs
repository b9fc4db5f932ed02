use std::collections::HashMap;

use derive_more::From;
use serde::{Deserialize, Serialize};

/// Type alias for a HashMap representing key-value pairs of attributes.
///
/// Keys are attribute names declared in the [`ConfigSpec`](crate::ConfigSpec). Any attribute may
/// be absent.
///
/// # Examples
/// ```
/// # use modifier_engine::{Attributes, AttributeValue};
/// let attributes = [
///     ("rarity".to_owned(), "Legendary".into()),
///     ("level".to_owned(), 30.0.into()),
///     ("cursed".to_owned(), false.into()),
///     ("tags".to_owned(), vec!["Fire".to_owned(), "Melee".to_owned()].into()),
/// ].into_iter().collect::<Attributes>();
/// ```
pub type Attributes = HashMap<String, AttributeValue>;

/// Enum representing possible values of an item attribute.
///
/// There is intentionally no separate variant for single enum values and free text: both are
/// [`AttributeValue::String`], because their JSON forms are indistinguishable. The attribute
/// schema ([`AttributeKind`](crate::AttributeKind)) tells them apart during validation.
/// Multi-valued enum attributes are an ordered [`AttributeValue::List`].
#[derive(Debug, Serialize, Deserialize, PartialEq, From, Clone)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value (single enum value or free text).
    String(String),
    /// An ordered list of enum values.
    List(Vec<String>),
    /// A numerical value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
}

impl AttributeValue {
    /// Name of the value type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "string",
            AttributeValue::List(_) => "list",
            AttributeValue::Number(_) => "number",
            AttributeValue::Boolean(_) => "boolean",
        }
    }

    /// Return the number, or `None` for other value types.
    pub fn as_number(&self) -> Option<f64> {
        if let AttributeValue::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// Return the list of enum values, or `None` for other value types.
    pub fn as_list(&self) -> Option<&[String]> {
        if let AttributeValue::List(values) = self {
            Some(values)
        } else {
            None
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_owned).collect())
    }
}
