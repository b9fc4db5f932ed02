//! JSON helpers.
//!
//! Items and results are plain serde types, so these are thin wrappers over `serde_json` that
//! report failures as [`Error`](crate::Error).
use crate::{validation, ConfigSpec, EvaluationResult, ItemSpec, Result};

/// Parse an item.
///
/// Conditions in an unknown format do not fail parsing. They are kept as raw JSON and never
/// match (see [`TryParse`](crate::TryParse)).
pub fn item_from_json(json: &str) -> Result<ItemSpec> {
    Ok(serde_json::from_str(json)?)
}

pub fn item_to_json(item: &ItemSpec) -> Result<String> {
    Ok(serde_json::to_string(item)?)
}

/// Parse and validate a configuration.
pub fn config_from_json(json: &str) -> Result<ConfigSpec> {
    let config: ConfigSpec = serde_json::from_str(json)?;
    validation::validate_config(&config)?;
    Ok(config)
}

pub fn result_to_json(result: &EvaluationResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}
