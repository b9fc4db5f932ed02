use chrono::{DateTime, Utc};

use crate::{
    ConditionError, EvaluationError, EvaluationResult, ItemSpec, MetricMap, ModifierApplication,
};

use super::{
    eval_details::{EvaluationDetails, ModifierDetails, ModifierOutcome},
    eval_visitor::EvalVisitor,
};

pub(super) struct EvalDetailsBuilder {
    item_name: Option<String>,
    now: DateTime<Utc>,
    modifiers: Vec<ModifierDetails>,
    metrics: Option<MetricMap>,
    error: Option<EvaluationError>,
}

impl EvalDetailsBuilder {
    pub fn new(item: &ItemSpec, now: DateTime<Utc>) -> EvalDetailsBuilder {
        EvalDetailsBuilder {
            item_name: item.name.clone(),
            now,
            modifiers: item
                .modifiers
                .iter()
                .enumerate()
                .map(|(index, modifier)| ModifierDetails {
                    index,
                    metric: modifier.metric.clone(),
                    operation: modifier.operation.clone(),
                    outcome: ModifierOutcome::Unevaluated,
                })
                .collect(),
            metrics: None,
            error: None,
        }
    }

    pub fn build(self) -> EvaluationDetails {
        EvaluationDetails {
            item_name: self.item_name,
            timestamp: self.now,
            metrics: self.metrics,
            error: self.error,
            modifiers: self.modifiers,
        }
    }

    fn set_outcome(&mut self, index: usize, outcome: ModifierOutcome) {
        if let Some(details) = self.modifiers.get_mut(index) {
            details.outcome = outcome;
        }
    }
}

impl EvalVisitor for EvalDetailsBuilder {
    fn on_condition(&mut self, index: usize, result: &Result<bool, ConditionError>) {
        match result {
            Ok(true) => {}
            Ok(false) => self.set_outcome(index, ModifierOutcome::ConditionFailed),
            Err(err) => self.set_outcome(
                index,
                ModifierOutcome::ConditionError {
                    message: err.to_string(),
                },
            ),
        }
    }

    fn on_stacked_out(&mut self, index: usize) {
        self.set_outcome(index, ModifierOutcome::StackedOut);
    }

    fn on_applied(&mut self, index: usize, application: &ModifierApplication) {
        self.set_outcome(
            index,
            ModifierOutcome::Applied {
                before: application.before,
                after: application.after,
            },
        );
    }

    fn on_result(&mut self, result: &Result<EvaluationResult, EvaluationError>) {
        match result {
            Ok(result) => self.metrics = Some(result.metrics.clone()),
            Err(err) => self.error = Some(err.clone()),
        }
    }
}
