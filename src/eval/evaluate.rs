use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use chrono::Utc;

use crate::{
    operations::{EvaluationContext, RegisteredOperation},
    sequencer, stacking, Attributes, ConfigSpec, EvaluationError, EvaluationResult, ItemSpec,
    MetricMap, Modifier, ModifierApplication, OperationRegistry,
};

use super::{
    eval_details::EvaluationDetails,
    eval_details_builder::EvalDetailsBuilder,
    eval_visitor::{EvalVisitor, NoopEvalVisitor},
};

/// Evaluate the item's modifiers and return final metric values along with the trace of applied
/// modifiers.
///
/// Every metric of `config` is present in the result. Metrics start at the value from
/// `base_metrics` or 0.
///
/// Modifiers whose condition cannot be evaluated are skipped as if the condition was `false`.
/// All other failures (unknown operation or metric, non-finite result) abort the evaluation.
///
/// ```
/// # use modifier_engine::{evaluate, ConfigSpec, ItemBuilder, OperationRegistry};
/// let config = ConfigSpec::new(["Health"], ["sum", "subtract", "multiply"], vec![]).unwrap();
/// let item = ItemBuilder::new()
///     .increase("Health").by(10.0)
///     .decrease("Health").by(2.0)
///     .multiply("Health").by(2.0)
///     .build();
///
/// let result = evaluate(&item, &OperationRegistry::new(), &config, None).unwrap();
/// assert_eq!(result.metrics["Health"], 8.0);
/// ```
pub fn evaluate(
    item: &ItemSpec,
    registry: &OperationRegistry,
    config: &ConfigSpec,
    base_metrics: Option<&MetricMap>,
) -> Result<EvaluationResult, EvaluationError> {
    evaluate_with_visitor(&mut NoopEvalVisitor, item, registry, config, base_metrics)
}

/// Evaluate the item and return evaluation details along with the result.
pub fn evaluate_with_details(
    item: &ItemSpec,
    registry: &OperationRegistry,
    config: &ConfigSpec,
    base_metrics: Option<&MetricMap>,
) -> (Result<EvaluationResult, EvaluationError>, EvaluationDetails) {
    let mut builder = EvalDetailsBuilder::new(item, Utc::now());
    let result = evaluate_with_visitor(&mut builder, item, registry, config, base_metrics);
    let details = builder.build();
    (result, details)
}

fn evaluate_with_visitor<V: EvalVisitor>(
    visitor: &mut V,
    item: &ItemSpec,
    registry: &OperationRegistry,
    config: &ConfigSpec,
    base_metrics: Option<&MetricMap>,
) -> Result<EvaluationResult, EvaluationError> {
    let result = evaluate_inner(visitor, item, registry, config, base_metrics);

    visitor.on_result(&result);

    match &result {
        Ok(result) => {
            log::debug!(target: "modifier_engine",
                        item:serde = item.name,
                        modifiers = item.modifiers.len(),
                        applied = result.applied.len();
                        "evaluated an item");
        }
        Err(err) => {
            log::warn!(target: "modifier_engine",
                       item:serde = item.name;
                       "error occurred while evaluating an item: {err}");
        }
    }

    result
}

fn evaluate_inner<V: EvalVisitor>(
    visitor: &mut V,
    item: &ItemSpec,
    registry: &OperationRegistry,
    config: &ConfigSpec,
    base_metrics: Option<&MetricMap>,
) -> Result<EvaluationResult, EvaluationError> {
    let mut metrics = initial_metrics(config, base_metrics)?;

    let mut matching = Vec::with_capacity(item.modifiers.len());
    for (index, modifier) in item.modifiers.iter().enumerate() {
        if matches_condition(visitor, index, modifier, &item.attributes) {
            matching.push((index, modifier));
        }
    }

    let resolution = stacking::resolve_indexed(matching);
    for &index in &resolution.discarded {
        visitor.on_stacked_out(index);
    }

    let sequenced = sequencer::sequence_indexed(resolution.kept, registry);

    let mut applied = Vec::with_capacity(sequenced.len());
    for (index, modifier) in sequenced {
        let application = apply_modifier(index, modifier, item, registry, &metrics)?;

        log::trace!(target: "modifier_engine",
                    index,
                    metric:display = modifier.metric,
                    operation:display = modifier.operation,
                    before = application.before,
                    after = application.after;
                    "applied modifier");

        metrics.insert(modifier.metric.clone(), application.after);
        visitor.on_applied(index, &application);
        applied.push(application);
    }

    Ok(EvaluationResult { metrics, applied })
}

fn initial_metrics(
    config: &ConfigSpec,
    base_metrics: Option<&MetricMap>,
) -> Result<MetricMap, EvaluationError> {
    config
        .metrics
        .iter()
        .map(|metric| {
            let value = base_metrics
                .and_then(|base| base.get(metric))
                .copied()
                .unwrap_or(0.0);
            if !value.is_finite() {
                return Err(EvaluationError::NonFiniteBase {
                    metric: metric.clone(),
                    value,
                });
            }
            Ok((metric.clone(), value))
        })
        .collect()
}

/// Return `true` if the modifier has no condition or its condition holds. Conditions that fail to
/// evaluate don't match.
fn matches_condition<V: EvalVisitor>(
    visitor: &mut V,
    index: usize,
    modifier: &Modifier,
    attributes: &Attributes,
) -> bool {
    let Some(condition) = &modifier.condition else {
        return true;
    };

    let result = condition.evaluate(attributes);
    visitor.on_condition(index, &result);

    result.unwrap_or_else(|err| {
        log::warn!(target: "modifier_engine",
                   index,
                   metric:display = modifier.metric,
                   operation:display = modifier.operation;
                   "skipping modifier because its condition failed to evaluate: {err}");
        false
    })
}

fn apply_modifier(
    index: usize,
    modifier: &Modifier,
    item: &ItemSpec,
    registry: &OperationRegistry,
    metrics: &MetricMap,
) -> Result<ModifierApplication, EvaluationError> {
    let operation =
        registry
            .get(&modifier.operation)
            .ok_or_else(|| EvaluationError::UnknownOperation {
                index,
                operation: modifier.operation.clone(),
            })?;

    let before = *metrics
        .get(&modifier.metric)
        .ok_or_else(|| EvaluationError::UnknownMetric {
            index,
            metric: modifier.metric.clone(),
        })?;

    let context = EvaluationContext {
        item,
        modifier,
        metrics,
    };
    let after = call_operation(operation, before, modifier.value, &context).map_err(|message| {
        EvaluationError::OperationPanicked {
            index,
            metric: modifier.metric.clone(),
            operation: modifier.operation.clone(),
            message,
        }
    })?;

    if !after.is_finite() {
        return Err(EvaluationError::NonFiniteResult {
            index,
            metric: modifier.metric.clone(),
            operation: modifier.operation.clone(),
            value: after,
        });
    }

    Ok(ModifierApplication {
        modifier: modifier.clone(),
        applied_value: modifier.value,
        before,
        after,
    })
}

/// Call operation implementation, converting a panic into an error message.
fn call_operation(
    operation: &RegisteredOperation,
    current: f64,
    value: f64,
    context: &EvaluationContext,
) -> Result<f64, String> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        operation.operation.apply(current, value, context)
    }))
    .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_owned()
    }
}
