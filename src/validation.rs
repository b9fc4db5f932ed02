//! Shape checks for configurations and items.
//!
//! The evaluator assumes items are structurally valid and does not re-check attribute types. Run
//! [`validate_item`] on untrusted input before evaluating it.
use std::collections::HashSet;

use regex::Regex;

use crate::{
    condition::describe_unparsed,
    config::{AttributeKind, AttributeSchema, Cardinality},
    models::TryParse,
    AttributeValue, Condition, ConfigSpec, ItemSpec, ValidationError, ValidationIssue,
};

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues: self.0 })
        }
    }
}

/// Check that the configuration is well-formed.
pub fn validate_config(config: &ConfigSpec) -> Result<(), ValidationError> {
    let mut issues = Issues::default();

    check_names(&mut issues, "metrics", &config.metrics);
    check_names(&mut issues, "operations", &config.operations);

    let mut keys = HashSet::new();
    for (i, schema) in config.attributes.iter().enumerate() {
        let path = format!("attributes[{i}]");
        if schema.key.is_empty() {
            issues.push(&path, "attribute key must not be empty");
        } else if !keys.insert(schema.key.as_str()) {
            issues.push(&path, format!("duplicate attribute key `{}`", schema.key));
        }
        check_schema(&mut issues, &path, schema);
    }

    issues.into_result()
}

fn check_names(issues: &mut Issues, path: &str, names: &[String]) {
    if names.is_empty() {
        issues.push(path, "must not be empty");
    }
    let mut seen = HashSet::new();
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() {
            issues.push(format!("{path}[{i}]"), "name must not be empty");
        } else if !seen.insert(name.as_str()) {
            issues.push(format!("{path}[{i}]"), format!("duplicate name `{name}`"));
        }
    }
}

fn check_schema(issues: &mut Issues, path: &str, schema: &AttributeSchema) {
    match &schema.kind {
        AttributeKind::Enum { values, .. } => {
            if values.is_empty() {
                issues.push(path, "enum attribute must declare at least one value");
            }
            let mut seen = HashSet::new();
            for value in values {
                if !seen.insert(value.as_str()) {
                    issues.push(path, format!("duplicate enum value `{value}`"));
                }
            }
        }
        AttributeKind::Boolean => {}
        AttributeKind::Number { min, max, .. } => {
            if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) {
                issues.push(path, "bounds must be finite");
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    issues.push(path, format!("min ({min}) is greater than max ({max})"));
                }
            }
        }
        AttributeKind::String {
            min_length,
            max_length,
            pattern,
        } => {
            if let (Some(min), Some(max)) = (min_length, max_length) {
                if min > max {
                    issues.push(
                        path,
                        format!("minLength ({min}) is greater than maxLength ({max})"),
                    );
                }
            }
            if let Some(pattern) = pattern {
                if let Err(err) = Regex::new(pattern) {
                    issues.push(path, format!("invalid pattern: {err}"));
                }
            }
        }
    }
}

/// Check that the item conforms to the configuration: attributes match their schemas, modifiers
/// reference declared metrics and operations, and conditions are well-formed.
pub fn validate_item(item: &ItemSpec, config: &ConfigSpec) -> Result<(), ValidationError> {
    let mut issues = Issues::default();

    // Sorted for stable issue order.
    let mut keys = item.attributes.keys().collect::<Vec<_>>();
    keys.sort();
    for key in keys {
        let path = format!("attributes.{key}");
        match config.attribute(key) {
            None => issues.push(path, format!("undeclared attribute `{key}`")),
            Some(schema) => check_attribute(&mut issues, &path, schema, &item.attributes[key]),
        }
    }

    for (i, modifier) in item.modifiers.iter().enumerate() {
        let path = format!("modifiers[{i}]");
        if !config.has_metric(&modifier.metric) {
            issues.push(&path, format!("unknown metric `{}`", modifier.metric));
        }
        if !config.has_operation(&modifier.operation) {
            issues.push(&path, format!("unknown operation `{}`", modifier.operation));
        }
        if !modifier.value.is_finite() {
            issues.push(&path, "value must be finite");
        }
        if let Some(condition) = &modifier.condition {
            check_clause(&mut issues, &format!("{path}.condition"), condition, config);
        }
    }

    issues.into_result()
}

fn check_attribute(
    issues: &mut Issues,
    path: &str,
    schema: &AttributeSchema,
    value: &AttributeValue,
) {
    match (&schema.kind, value) {
        (
            AttributeKind::Enum {
                values,
                cardinality: Cardinality::Single,
            },
            AttributeValue::String(s),
        ) => {
            if !values.contains(s) {
                issues.push(path, format!("`{s}` is not one of {values:?}"));
            }
        }
        (
            AttributeKind::Enum {
                values,
                cardinality: Cardinality::Multi,
            },
            AttributeValue::List(list),
        ) => {
            for s in list.iter().filter(|s| !values.contains(s)) {
                issues.push(path, format!("`{s}` is not one of {values:?}"));
            }
        }
        (AttributeKind::Boolean, AttributeValue::Boolean(_)) => {}
        (AttributeKind::Number { min, max, integer }, AttributeValue::Number(n)) => {
            if !n.is_finite() {
                issues.push(path, "number must be finite");
                return;
            }
            if let Some(min) = min.filter(|min| n < min) {
                issues.push(path, format!("{n} is less than minimum {min}"));
            }
            if let Some(max) = max.filter(|max| n > max) {
                issues.push(path, format!("{n} is greater than maximum {max}"));
            }
            if *integer && n.fract() != 0.0 {
                issues.push(path, format!("{n} is not an integer"));
            }
        }
        (
            AttributeKind::String {
                min_length,
                max_length,
                pattern,
            },
            AttributeValue::String(s),
        ) => {
            let length = s.chars().count();
            if min_length.is_some_and(|min| length < min) {
                issues.push(path, format!("length {length} is below minLength"));
            }
            if max_length.is_some_and(|max| length > max) {
                issues.push(path, format!("length {length} exceeds maxLength"));
            }
            // Invalid patterns are reported by `validate_config`.
            if let Some(Ok(regex)) = pattern.as_deref().map(Regex::new) {
                if !regex.is_match(s) {
                    issues.push(path, format!("`{s}` does not match pattern `{regex}`"));
                }
            }
        }
        (kind, value) => issues.push(
            path,
            format!("expected {}, found {}", kind_name(kind), value.type_name()),
        ),
    }
}

fn kind_name(kind: &AttributeKind) -> &'static str {
    match kind {
        AttributeKind::Enum {
            cardinality: Cardinality::Single,
            ..
        } => "enum value",
        AttributeKind::Enum {
            cardinality: Cardinality::Multi,
            ..
        } => "list of enum values",
        AttributeKind::Boolean => "boolean",
        AttributeKind::Number { .. } => "number",
        AttributeKind::String { .. } => "string",
    }
}

fn check_condition(issues: &mut Issues, path: &str, condition: &Condition, config: &ConfigSpec) {
    let mut check_attr = |attr: &str, accepts: fn(&AttributeKind) -> bool, expected: &str| {
        match config.attribute(attr) {
            None => issues.push(path, format!("undeclared attribute `{attr}`")),
            Some(schema) if !accepts(&schema.kind) => issues.push(
                path,
                format!(
                    "`{}` needs {expected} attribute, `{attr}` is {}",
                    condition.operator(),
                    kind_name(&schema.kind)
                ),
            ),
            Some(_) => {}
        }
    };

    match condition {
        Condition::Eq { attr, .. } | Condition::In { attr, .. } => {
            check_attr(attr.as_str(), |_| true, "any");
        }
        Condition::Includes { attr, .. } => check_attr(
            attr.as_str(),
            |kind| {
                matches!(
                    kind,
                    AttributeKind::Enum {
                        cardinality: Cardinality::Multi,
                        ..
                    }
                )
            },
            "a multi-valued enum",
        ),
        Condition::Gt { attr, value }
        | Condition::Gte { attr, value }
        | Condition::Lt { attr, value }
        | Condition::Lte { attr, value } => {
            check_attr(
                attr.as_str(),
                |kind| matches!(kind, AttributeKind::Number { .. }),
                "a number",
            );
            if !value.is_finite() {
                issues.push(path, "comparison value must be finite");
            }
        }
        Condition::And { clauses } | Condition::Or { clauses } => {
            let op = condition.operator();
            if clauses.is_empty() {
                issues.push(path, format!("`{op}` must have at least one clause"));
            }
            for (i, clause) in clauses.iter().enumerate() {
                check_clause(issues, &format!("{path}.{op}[{i}]"), clause, config);
            }
        }
        Condition::Not { clause } => {
            check_clause(issues, &format!("{path}.not"), clause, config);
        }
    }
}

fn check_clause(
    issues: &mut Issues,
    path: &str,
    clause: &TryParse<Condition>,
    config: &ConfigSpec,
) {
    match clause {
        TryParse::Parsed(condition) => check_condition(issues, path, condition, config),
        TryParse::ParseFailed(raw) => issues.push(
            path,
            format!("malformed condition: {}", describe_unparsed(raw)),
        ),
    }
}
