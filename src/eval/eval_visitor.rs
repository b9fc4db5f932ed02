use crate::{ConditionError, EvaluationError, EvaluationResult, ModifierApplication};

/// Hooks into the evaluation pipeline. Modifiers are identified by their position in the item's
/// modifier list.
pub(super) trait EvalVisitor {
    /// Called for every modifier that has a condition.
    #[allow(unused_variables)]
    #[inline]
    fn on_condition(&mut self, index: usize, result: &Result<bool, ConditionError>) {}

    /// Called for every modifier that lost in its stacking group.
    #[allow(unused_variables)]
    #[inline]
    fn on_stacked_out(&mut self, index: usize) {}

    #[allow(unused_variables)]
    #[inline]
    fn on_applied(&mut self, index: usize, application: &ModifierApplication) {}

    /// Called with evaluation result.
    #[allow(unused_variables)]
    #[inline]
    fn on_result(&mut self, result: &Result<EvaluationResult, EvaluationError>) {}
}

/// Dummy visitor that does nothing.
///
/// It is designed so that all calls to it are optimized away (zero-cost).
pub(super) struct NoopEvalVisitor;

impl EvalVisitor for NoopEvalVisitor {}
