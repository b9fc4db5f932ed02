//! Stacking resolution: collapsing conflicting modifiers to a single winner.
use std::collections::HashMap;

use crate::{Modifier, Stacking};

/// Apply stacking rules to the (already condition-filtered) modifiers.
///
/// `stack` modifiers pass through in their original order. `unique` modifiers are grouped by
/// `metric|operation|source` and `uniqueBy` modifiers by their custom key; each group contributes
/// one winner. Winners follow all `stack` modifiers, in order of the group's first appearance.
///
/// See [`is_stronger`] for how the winner is chosen.
pub fn resolve<'a>(modifiers: impl IntoIterator<Item = &'a Modifier>) -> Vec<&'a Modifier> {
    resolve_indexed(modifiers.into_iter().enumerate().collect())
        .kept
        .into_iter()
        .map(|(_, modifier)| modifier)
        .collect()
}

#[derive(Debug, PartialEq)]
pub(crate) struct Resolution<'a> {
    pub kept: Vec<(usize, &'a Modifier)>,
    /// Indices of modifiers that lost to a stronger modifier in their group.
    pub discarded: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey<'a> {
    Unique {
        metric: &'a str,
        operation: &'a str,
        source: &'a str,
    },
    Custom(&'a str),
}

impl<'a> GroupKey<'a> {
    fn of(modifier: &'a Modifier) -> Option<GroupKey<'a>> {
        match modifier.effective_stacking() {
            Stacking::Stack => None,
            Stacking::Unique => Some(GroupKey::Unique {
                metric: &modifier.metric,
                operation: &modifier.operation,
                source: modifier.source.as_deref().unwrap_or(""),
            }),
            Stacking::UniqueBy(key) => Some(GroupKey::Custom(key)),
        }
    }
}

/// Same as [`resolve`] but keeps track of modifier positions. `modifiers` must be in original
/// relative order.
pub(crate) fn resolve_indexed(modifiers: Vec<(usize, &Modifier)>) -> Resolution<'_> {
    let mut kept = Vec::with_capacity(modifiers.len());
    let mut discarded = Vec::new();

    // Winner of each group, in order of first appearance.
    let mut winners: Vec<(usize, &Modifier)> = Vec::new();
    let mut group_slots: HashMap<GroupKey, usize> = HashMap::new();

    for (index, modifier) in modifiers {
        let Some(key) = GroupKey::of(modifier) else {
            kept.push((index, modifier));
            continue;
        };

        match group_slots.get(&key) {
            None => {
                group_slots.insert(key, winners.len());
                winners.push((index, modifier));
            }
            Some(&slot) => {
                let (current_index, current) = winners[slot];
                if is_stronger(modifier, current) {
                    discarded.push(current_index);
                    winners[slot] = (index, modifier);
                } else {
                    discarded.push(index);
                }
            }
        }
    }

    if !discarded.is_empty() {
        log::trace!(target: "modifier_engine",
                    discarded:serde = discarded;
                    "stacking discarded modifiers");
    }

    discarded.sort_unstable();
    kept.extend(winners);
    Resolution { kept, discarded }
}

/// Return `true` if `challenger` beats the current group winner: greater absolute value wins,
/// then greater priority. On a full tie the earlier modifier stays.
fn is_stronger(challenger: &Modifier, current: &Modifier) -> bool {
    let (a, b) = (challenger.value.abs(), current.value.abs());
    if a != b {
        return a > b;
    }
    challenger.effective_priority() > current.effective_priority()
}

#[cfg(test)]
mod tests {
    use crate::{Modifier, Stacking};

    use super::{resolve, resolve_indexed};

    fn values(modifiers: &[&Modifier]) -> Vec<f64> {
        modifiers.iter().map(|m| m.value).collect()
    }

    #[test]
    fn stack_passes_through() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 1.0),
            Modifier::new("Health", "sum", 2.0).with_stacking(Stacking::Stack),
            Modifier::new("Health", "sum", 3.0),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn unique_keeps_greatest_absolute_value() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 80.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 120.0).with_stacking(Stacking::Unique),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![120.0]);
    }

    #[test]
    fn unique_compares_absolute_values() {
        let modifiers = vec![
            Modifier::new("Health", "subtract", 5.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "subtract", -9.0).with_stacking(Stacking::Unique),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![-9.0]);
    }

    #[test]
    fn unique_groups_by_metric_operation_and_source() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 10.0).with_stacking(Stacking::Unique),
            Modifier::new("Mana", "sum", 5.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "multiply", 2.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 3.0)
                .with_stacking(Stacking::Unique)
                .with_source("ring"),
            Modifier::new("Health", "sum", 20.0).with_stacking(Stacking::Unique),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![20.0, 5.0, 2.0, 3.0]);
    }

    #[test]
    fn ties_broken_by_priority_then_order() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 10.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 10.0)
                .with_stacking(Stacking::Unique)
                .with_priority(2)
                .with_source("a"),
            Modifier::new("Health", "sum", -10.0)
                .with_stacking(Stacking::Unique)
                .with_priority(2)
                .with_source("a"),
        ];
        let resolved = resolve(&modifiers);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].source, None);
        // Full tie: earliest stays.
        assert_eq!(resolved[1].value, 10.0);
        assert_eq!(resolved[1].effective_priority(), 2);

        let modifiers = vec![
            Modifier::new("Health", "sum", 10.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 10.0)
                .with_stacking(Stacking::Unique)
                .with_priority(1),
        ];
        assert_eq!(resolve(&modifiers)[0].effective_priority(), 1);
    }

    #[test]
    fn custom_key_ignores_metric_and_operation() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 30.0)
                .with_stacking(Stacking::UniqueBy("custom".to_owned())),
            Modifier::new("Mana", "multiply", 20.0)
                .with_stacking(Stacking::UniqueBy("custom".to_owned())),
        ];
        let resolved = resolve(&modifiers);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].metric, "Health");
        assert_eq!(resolved[0].value, 30.0);
    }

    #[test]
    fn custom_key_does_not_collide_with_unique_key() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 1.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 2.0)
                .with_stacking(Stacking::UniqueBy("Health|sum|".to_owned())),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![1.0, 2.0]);
    }

    #[test]
    fn winners_follow_stacked_modifiers() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 1.0).with_stacking(Stacking::UniqueBy("b".to_owned())),
            Modifier::new("Health", "sum", 2.0),
            Modifier::new("Health", "sum", 3.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 4.0),
            Modifier::new("Health", "sum", 5.0).with_stacking(Stacking::UniqueBy("b".to_owned())),
        ];
        assert_eq!(values(&resolve(&modifiers)), vec![2.0, 4.0, 5.0, 3.0]);
    }

    #[test]
    fn reports_discarded_indices() {
        let modifiers = vec![
            Modifier::new("Health", "sum", 5.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 1.0),
            Modifier::new("Health", "sum", 9.0).with_stacking(Stacking::Unique),
            Modifier::new("Health", "sum", 2.0).with_stacking(Stacking::Unique),
        ];
        let resolution = resolve_indexed(modifiers.iter().enumerate().collect());
        assert_eq!(resolution.discarded, vec![0, 3]);
        assert_eq!(
            resolution
                .kept
                .iter()
                .map(|(i, _)| *i)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
