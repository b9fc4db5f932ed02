use std::sync::{Arc, RwLock};

use crate::{
    eval::{self, EvaluationDetails},
    validation, ConfigSpec, Error, EvaluationError, EvaluationResult, ItemSpec, MetricMap,
    Operation, OperationRegistry, Result,
};

/// `Engine` bundles a configuration with an operation registry that can be extended while other
/// threads are evaluating.
///
/// Evaluations hold a read lock on the registry for their whole duration, so an operation
/// registered concurrently is either entirely visible to an evaluation or not at all.
///
/// ```
/// # use std::sync::Arc;
/// # use modifier_engine::{ConfigSpec, Engine, EvaluationContext, ItemBuilder};
/// let config = ConfigSpec::new(["Health"], ["sum", "max"], vec![]).unwrap();
/// let engine = Engine::new(Arc::new(config));
/// engine
///     .register_operation("max", |c: f64, v: f64, _: &EvaluationContext| c.max(v), None)
///     .unwrap();
///
/// let item = ItemBuilder::new()
///     .increase("Health").by(3.0)
///     .apply("max", "Health").by(10.0)
///     .build();
/// let result = engine.evaluate(&item, None).unwrap();
/// assert_eq!(result.metrics["Health"], 10.0);
/// ```
pub struct Engine {
    config: Arc<ConfigSpec>,
    registry: RwLock<OperationRegistry>,
}

impl Engine {
    /// Create an engine with the built-in operations.
    pub fn new(config: Arc<ConfigSpec>) -> Engine {
        Engine::with_registry(config, OperationRegistry::new())
    }

    pub fn with_registry(config: Arc<ConfigSpec>, registry: OperationRegistry) -> Engine {
        Engine {
            config,
            registry: RwLock::new(registry),
        }
    }

    pub fn config(&self) -> &Arc<ConfigSpec> {
        &self.config
    }

    /// Register a custom operation. See [`OperationRegistry::register`].
    pub fn register_operation(
        &self,
        name: impl Into<String>,
        operation: impl Operation + Send + Sync + 'static,
        precedence: Option<i32>,
    ) -> Result<()> {
        let mut registry = self.registry.write().map_err(|_| Error::RegistryPoisoned)?;
        registry.register(name, operation, precedence)?;
        Ok(())
    }

    /// Evaluate the item. See [`evaluate`](crate::evaluate).
    pub fn evaluate(
        &self,
        item: &ItemSpec,
        base_metrics: Option<&MetricMap>,
    ) -> Result<EvaluationResult> {
        let registry = self.registry.read().map_err(|_| Error::RegistryPoisoned)?;
        let result = eval::evaluate(item, &registry, &self.config, base_metrics)?;
        Ok(result)
    }

    /// Evaluate the item and return evaluation details along with the result.
    ///
    /// The outer error is only returned if the registry is unavailable, in which case nothing
    /// was evaluated.
    pub fn evaluate_with_details(
        &self,
        item: &ItemSpec,
        base_metrics: Option<&MetricMap>,
    ) -> Result<(
        std::result::Result<EvaluationResult, EvaluationError>,
        EvaluationDetails,
    )> {
        let registry = self.registry.read().map_err(|_| Error::RegistryPoisoned)?;
        Ok(eval::evaluate_with_details(
            item,
            &registry,
            &self.config,
            base_metrics,
        ))
    }

    /// Check the item against the engine configuration.
    pub fn validate_item(&self, item: &ItemSpec) -> Result<()> {
        validation::validate_item(item, &self.config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        ConfigSpec, Error, EvaluationContext, EvaluationError, ItemBuilder, RegistryError,
    };

    use super::Engine;

    fn engine() -> Engine {
        let config = ConfigSpec::new(["Health", "Mana"], ["sum", "multiply", "set"], vec![])
            .unwrap();
        Engine::new(Arc::new(config))
    }

    #[test]
    fn evaluates_with_builtins() {
        let item = ItemBuilder::new()
            .increase("Mana")
            .by(4.0)
            .multiply("Mana")
            .by(3.0)
            .build();
        let result = engine().evaluate(&item, None).unwrap();
        assert_eq!(result.metrics["Mana"], 12.0);
        assert_eq!(result.metrics["Health"], 0.0);
    }

    #[test]
    fn can_register_operation_from_another_thread() {
        let engine = Arc::new(engine());
        let item = ItemBuilder::new().apply("set", "Health").by(42.0).build();

        assert!(matches!(
            engine.evaluate(&item, None),
            Err(Error::Evaluation(EvaluationError::UnknownOperation { index: 0, .. }))
        ));

        {
            let engine = engine.clone();
            let _ = std::thread::spawn(move || {
                engine
                    .register_operation("set", |_: f64, v: f64, _: &EvaluationContext| v, None)
                    .unwrap();
            })
            .join();
        }

        let result = engine.evaluate(&item, None).unwrap();
        assert_eq!(result.metrics["Health"], 42.0);
    }

    #[test]
    fn builtin_override_is_rejected() {
        let result =
            engine().register_operation("sum", |c: f64, _: f64, _: &EvaluationContext| c, None);
        assert!(matches!(
            result,
            Err(Error::Registry(RegistryError::BuiltinOverride(name))) if name == "sum"
        ));
    }

    #[test]
    fn poisoned_registry_is_reported() {
        let engine = Arc::new(engine());
        {
            let engine = engine.clone();
            let _ = std::thread::spawn(move || {
                let _guard = engine.registry.write().unwrap();
                panic!("poison the registry");
            })
            .join();
        }

        let item = ItemBuilder::new().increase("Health").by(1.0).build();
        assert!(matches!(
            engine.evaluate(&item, None),
            Err(Error::RegistryPoisoned)
        ));
        assert!(matches!(
            engine.evaluate_with_details(&item, None),
            Err(Error::RegistryPoisoned)
        ));
    }

    #[test]
    fn details_through_engine() {
        let item = ItemBuilder::named("Ring").increase("Health").by(5.0).build();
        let (result, details) = engine().evaluate_with_details(&item, None).unwrap();
        assert_eq!(result.unwrap().metrics["Health"], 5.0);
        assert_eq!(details.item_name.as_deref(), Some("Ring"));
        assert_eq!(details.modifiers.len(), 1);
    }

    #[test]
    fn validate_item_uses_engine_config() {
        let engine = engine();
        assert!(engine.config().has_metric("Mana"));
        assert!(!engine.config().has_metric("Stamina"));
        assert!(engine
            .validate_item(&ItemBuilder::new().increase("Health").by(1.0).build())
            .is_ok());
        assert!(matches!(
            engine.validate_item(&ItemBuilder::new().increase("Stamina").by(1.0).build()),
            Err(Error::Validation(_))
        ));
    }
}
