//! Deterministic ordering of modifiers before application.
use std::cmp::Reverse;

use crate::{Modifier, OperationRegistry};

/// Order modifiers for application.
///
/// Stable sort by:
/// 1. priority, descending (unspecified priority is 0);
/// 2. operation precedence, descending (unregistered operations sort as precedence 0 and fail
///    later, when applied);
/// 3. original relative order.
///
/// With built-in operations and equal priorities, `multiply` (precedence 20) therefore runs before
/// `sum` and `subtract` (precedence 10).
pub fn sequence<'a>(
    modifiers: impl IntoIterator<Item = &'a Modifier>,
    registry: &OperationRegistry,
) -> Vec<&'a Modifier> {
    sequence_indexed(modifiers.into_iter().enumerate().collect(), registry)
        .into_iter()
        .map(|(_, modifier)| modifier)
        .collect()
}

pub(crate) fn sequence_indexed<'a>(
    mut modifiers: Vec<(usize, &'a Modifier)>,
    registry: &OperationRegistry,
) -> Vec<(usize, &'a Modifier)> {
    // Stable: full ties keep their original relative order.
    modifiers.sort_by_key(|(_, modifier)| {
        (
            Reverse(modifier.effective_priority()),
            Reverse(registry.precedence(&modifier.operation).unwrap_or(0)),
        )
    });
    modifiers
}

#[cfg(test)]
mod tests {
    use crate::{EvaluationContext, Modifier, OperationRegistry};

    use super::sequence;

    fn order(modifiers: &[&Modifier]) -> Vec<(String, f64)> {
        modifiers
            .iter()
            .map(|m| (m.operation.clone(), m.value))
            .collect()
    }

    #[test]
    fn higher_precedence_first_on_equal_priority() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 10.0),
            Modifier::new("Health", "subtract", 2.0),
            Modifier::new("Health", "multiply", 2.0),
        ];
        let sequenced = sequence(&modifiers, &OperationRegistry::new());
        assert_eq!(
            order(&sequenced),
            vec![
                ("multiply".to_owned(), 2.0),
                ("sum".to_owned(), 10.0),
                ("subtract".to_owned(), 2.0),
            ]
        );
    }

    #[test]
    fn priority_beats_precedence() {
        let modifiers = vec![
            Modifier::new("Health", "multiply", 2.0),
            Modifier::new("Health", "sum", 5.0).with_priority(1),
            Modifier::new("Health", "sum", 7.0).with_priority(10),
            Modifier::new("Health", "sum", 1.0).with_priority(-1),
        ];
        let sequenced = sequence(&modifiers, &OperationRegistry::new());
        assert_eq!(
            order(&sequenced),
            vec![
                ("sum".to_owned(), 7.0),
                ("sum".to_owned(), 5.0),
                ("multiply".to_owned(), 2.0),
                ("sum".to_owned(), 1.0),
            ]
        );
    }

    #[test]
    fn stable_for_full_ties() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 1.0),
            Modifier::new("Mana", "subtract", 2.0),
            Modifier::new("Health", "sum", 3.0),
        ];
        let sequenced = sequence(&modifiers, &OperationRegistry::new());
        assert_eq!(
            sequenced.iter().map(|m| m.value).collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn unregistered_and_custom_operations() {
        let mut registry = OperationRegistry::new();
        registry
            .register(
                "clamp",
                |c: f64, v: f64, _: &EvaluationContext| c.min(v),
                Some(30),
            )
            .unwrap();
        let modifiers = vec![
            Modifier::new("Health", "unknown", 1.0),
            Modifier::new("Health", "sum", 2.0),
            Modifier::new("Health", "clamp", 3.0),
        ];
        let sequenced = sequence(&modifiers, &registry);
        assert_eq!(
            order(&sequenced),
            vec![
                ("clamp".to_owned(), 3.0),
                ("sum".to_owned(), 2.0),
                ("unknown".to_owned(), 1.0),
            ]
        );
    }
}
