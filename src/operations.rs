//! Operation registry.
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{ItemSpec, MetricMap, Modifier, RegistryError};

/// Name of the built-in addition operation.
pub const SUM: &str = "sum";
/// Name of the built-in subtraction operation.
pub const SUBTRACT: &str = "subtract";
/// Name of the built-in multiplication operation.
pub const MULTIPLY: &str = "multiply";

/// Read-only view of the evaluation given to operations.
pub struct EvaluationContext<'a> {
    /// The item being evaluated.
    pub item: &'a ItemSpec,
    /// The modifier being applied.
    pub modifier: &'a Modifier,
    /// Current value of every metric, before this modifier is applied.
    pub metrics: &'a MetricMap,
}

/// A numeric transformation `(current, value) -> new value`.
///
/// Implemented for all `Fn(f64, f64, &EvaluationContext) -> f64` closures, so most operations
/// don't need to implement this trait manually.
pub trait Operation {
    fn apply(&self, current: f64, value: f64, context: &EvaluationContext) -> f64;
}

impl<T: Fn(f64, f64, &EvaluationContext) -> f64> Operation for T {
    fn apply(&self, current: f64, value: f64, context: &EvaluationContext) -> f64 {
        self(current, value, context)
    }
}

/// Operation stored in the registry along with its precedence.
#[derive(Clone)]
pub struct RegisteredOperation {
    pub operation: Arc<dyn Operation + Send + Sync>,
    /// Higher precedence is scheduled earlier among modifiers of equal priority.
    pub precedence: i32,
}

impl fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("precedence", &self.precedence)
            .finish_non_exhaustive()
    }
}

/// Mapping from operation name to its implementation and precedence.
///
/// A new registry contains the built-in operations:
///
/// | name       | effect            | precedence |
/// |------------|-------------------|------------|
/// | `sum`      | `current + value` | 10         |
/// | `subtract` | `current - value` | 10         |
/// | `multiply` | `current * value` | 20         |
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, RegisteredOperation>,
}

impl OperationRegistry {
    pub fn new() -> OperationRegistry {
        let mut operations = HashMap::new();
        let mut builtin = |name: &str, precedence, f: fn(f64, f64, &EvaluationContext) -> f64| {
            operations.insert(
                name.to_owned(),
                RegisteredOperation {
                    operation: Arc::new(f),
                    precedence,
                },
            );
        };
        builtin(SUM, 10, |current, value, _| current + value);
        builtin(SUBTRACT, 10, |current, value, _| current - value);
        builtin(MULTIPLY, 20, |current, value, _| current * value);

        OperationRegistry { operations }
    }

    pub fn is_builtin(name: &str) -> bool {
        matches!(name, SUM | SUBTRACT | MULTIPLY)
    }

    /// Register a custom operation. Precedence defaults to 0.
    ///
    /// Registering a name that is already registered replaces the previous operation, unless it
    /// is a built-in.
    ///
    /// ```
    /// # use modifier_engine::{EvaluationContext, OperationRegistry};
    /// let mut registry = OperationRegistry::new();
    /// registry
    ///     .register(
    ///         "max",
    ///         |current: f64, value: f64, _: &EvaluationContext| current.max(value),
    ///         Some(5),
    ///     )
    ///     .unwrap();
    /// assert_eq!(registry.precedence("max"), Some(5));
    /// assert!(registry
    ///     .register("sum", |c: f64, _: f64, _: &EvaluationContext| c, None)
    ///     .is_err());
    /// ```
    pub fn register(
        &mut self,
        name: impl Into<String>,
        operation: impl Operation + Send + Sync + 'static,
        precedence: Option<i32>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if Self::is_builtin(&name) {
            return Err(RegistryError::BuiltinOverride(name));
        }

        let precedence = precedence.unwrap_or(0);
        log::debug!(target: "modifier_engine",
                    operation:display = name,
                    precedence;
                    "registered operation");
        self.operations.insert(
            name,
            RegisteredOperation {
                operation: Arc::new(operation),
                precedence,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredOperation> {
        self.operations.get(name)
    }

    /// Precedence of the operation, or `None` if it's not registered.
    pub fn precedence(&self, name: &str) -> Option<i32> {
        self.get(name).map(|op| op.precedence)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{ItemSpec, Modifier, RegistryError};

    use super::{EvaluationContext, OperationRegistry};

    fn apply(registry: &OperationRegistry, name: &str, current: f64, value: f64) -> f64 {
        let item = ItemSpec::default();
        let modifier = Modifier::new("Health", name, value);
        let metrics = HashMap::from([("Health".to_owned(), current)]);
        let context = EvaluationContext {
            item: &item,
            modifier: &modifier,
            metrics: &metrics,
        };
        registry
            .get(name)
            .unwrap()
            .operation
            .apply(current, value, &context)
    }

    #[test]
    fn builtins() {
        let registry = OperationRegistry::new();
        assert_eq!(apply(&registry, "sum", 5.0, 3.0), 8.0);
        assert_eq!(apply(&registry, "subtract", 5.0, 3.0), 2.0);
        assert_eq!(apply(&registry, "multiply", 5.0, 3.0), 15.0);

        assert_eq!(registry.precedence("sum"), Some(10));
        assert_eq!(registry.precedence("subtract"), Some(10));
        assert_eq!(registry.precedence("multiply"), Some(20));
        assert_eq!(registry.precedence("divide"), None);
    }

    #[test]
    fn cannot_override_builtin() {
        let mut registry = OperationRegistry::new();
        let result = registry.register("multiply", |c: f64, _: f64, _: &EvaluationContext| c, None);
        assert_eq!(
            result,
            Err(RegistryError::BuiltinOverride("multiply".to_owned()))
        );
        assert_eq!(apply(&registry, "multiply", 2.0, 4.0), 8.0);
    }

    #[test]
    fn custom_operation_defaults_to_zero_precedence() {
        let mut registry = OperationRegistry::new();
        registry
            .register(
                "set",
                |_: f64, value: f64, _: &EvaluationContext| value,
                None,
            )
            .unwrap();
        assert_eq!(registry.precedence("set"), Some(0));
        assert_eq!(apply(&registry, "set", 5.0, 42.0), 42.0);
    }

    #[test]
    fn custom_operation_can_be_replaced() {
        let mut registry = OperationRegistry::new();
        registry
            .register("set", |_: f64, v: f64, _: &EvaluationContext| v, Some(1))
            .unwrap();
        registry
            .register("set", |_: f64, v: f64, _: &EvaluationContext| v * 2.0, Some(3))
            .unwrap();
        assert_eq!(registry.precedence("set"), Some(3));
        assert_eq!(apply(&registry, "set", 0.0, 4.0), 8.0);
    }

    #[test]
    fn custom_operation_reads_other_metrics() {
        let mut registry = OperationRegistry::new();
        registry
            .register(
                "addMana",
                |current: f64, value: f64, ctx: &EvaluationContext| {
                    current + value * ctx.metrics.get("Health").copied().unwrap_or(0.0)
                },
                None,
            )
            .unwrap();
        assert_eq!(apply(&registry, "addMana", 10.0, 0.5), 15.0);
    }
}
