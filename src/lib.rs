//! A data-driven engine computing the numeric stats of game items from declarative modifiers.
//!
//! # Overview
//!
//! An item ([`ItemSpec`]) carries typed attributes and a list of [`Modifier`]s. Each modifier
//! applies one operation (`sum`, `subtract`, `multiply` or a custom one) to one metric, and may be
//! gated by a [`Condition`] over the item's attributes.
//!
//! [`evaluate`] runs the modifiers against a [`ConfigSpec`] and returns final metric values along
//! with a trace of the applied modifiers:
//!
//! 1. modifiers whose condition does not hold are dropped;
//! 2. [stacking](stacking) rules collapse conflicting modifiers;
//! 3. the survivors are [sequenced](sequencer) by priority and operation precedence;
//! 4. operations are applied in order.
//!
//! Items can be written as JSON or assembled with [`ItemBuilder`]. Custom operations are
//! registered on an [`OperationRegistry`], or on an [`Engine`] that can be shared between
//! threads.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. Component functions return their specific error
//! type ([`EvaluationError`], [`ConditionError`], [`RegistryError`], [`ValidationError`]), all of
//! which convert into [`Error`].
//!
//! Evaluation fails as a whole: when an error is returned, no partial metrics are produced. The
//! only exception are conditions that fail to evaluate; such modifiers are skipped and a warning
//! is logged.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages with
//! the `modifier_engine` target. Consider integrating a `log`-compatible logger implementation
//! for better visibility into evaluations.

#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod eval;
pub mod operations;
pub mod sequencer;
pub mod serialization;
pub mod stacking;
pub mod validation;

mod attributes;
mod condition;
mod config;
mod engine;
mod error;
mod models;

pub use attributes::{AttributeValue, Attributes};
pub use builder::ItemBuilder;
pub use condition::Condition;
pub use config::{AttributeKind, AttributeSchema, Cardinality, ConfigSpec};
pub use engine::Engine;
pub use error::{
    ConditionError, Error, EvaluationError, RegistryError, Result, ValidationError, ValidationIssue,
};
pub use eval::{evaluate, evaluate_with_details};
pub use models::{
    EvaluationResult, ItemSpec, MetricMap, Modifier, ModifierApplication, Stacking, TryParse,
};
pub use operations::{EvaluationContext, Operation, OperationRegistry};
