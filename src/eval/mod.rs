//! Evaluation pipeline: condition filtering → stacking → sequencing → application.
mod eval_details_builder;
mod eval_visitor;
mod evaluate;

pub mod eval_details;

pub use eval_details::{EvaluationDetails, ModifierDetails, ModifierOutcome};
pub use evaluate::{evaluate, evaluate_with_details};
