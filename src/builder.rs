//! Fluent construction of [`ItemSpec`]s.
//!
//! ```
//! # use modifier_engine::{builder::ModifierTemplate, Condition, ItemBuilder, Stacking};
//! let item = ItemBuilder::named("Frost Ring")
//!     .attribute("rarity", "Rare")
//!     .attribute("tags", vec!["Ice"])
//!     .increase("Mana").by(20.0)
//!     .group(
//!         ModifierTemplate::new()
//!             .when(Condition::includes("tags", "Ice"))
//!             .source("frost-set"),
//!         |b| {
//!             b.increase("Damage").by(5.0)
//!                 .multiply("Damage").stacking(Stacking::Unique).by(1.2)
//!         },
//!     )
//!     .build();
//!
//! assert_eq!(item.modifiers.len(), 3);
//! assert_eq!(item.modifiers[0].source, None);
//! assert_eq!(item.modifiers[2].source.as_deref(), Some("frost-set"));
//! ```
use crate::{
    models::TryParse,
    operations::{MULTIPLY, SUBTRACT, SUM},
    AttributeValue, Attributes, Condition, ItemSpec, Modifier, Stacking,
};

/// Defaults applied to modifiers: condition, stacking, priority and source.
///
/// Templates are values. Every setter returns a new template; nothing is shared between
/// modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifierTemplate {
    pub condition: Option<Condition>,
    pub stacking: Option<Stacking>,
    pub priority: Option<i64>,
    pub source: Option<String>,
}

impl ModifierTemplate {
    pub fn new() -> ModifierTemplate {
        ModifierTemplate::default()
    }

    /// Add a condition. Multiple conditions are combined with `and`.
    pub fn when(mut self, condition: Condition) -> ModifierTemplate {
        self.condition = Some(match self.condition.take() {
            None => condition,
            Some(existing) => and_also(existing, condition),
        });
        self
    }

    pub fn stacking(mut self, stacking: Stacking) -> ModifierTemplate {
        self.stacking = Some(stacking);
        self
    }

    pub fn priority(mut self, priority: i64) -> ModifierTemplate {
        self.priority = Some(priority);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> ModifierTemplate {
        self.source = Some(source.into());
        self
    }

    /// Layer `inner` on top of `self`: fields set in `inner` win and conditions are combined with
    /// `and`.
    fn merge(&self, inner: &ModifierTemplate) -> ModifierTemplate {
        let condition = match (&self.condition, &inner.condition) {
            (Some(outer), Some(inner)) => Some(and_also(outer.clone(), inner.clone())),
            (outer, inner) => inner.clone().or_else(|| outer.clone()),
        };
        ModifierTemplate {
            condition,
            stacking: inner.stacking.clone().or_else(|| self.stacking.clone()),
            priority: inner.priority.or(self.priority),
            source: inner.source.clone().or_else(|| self.source.clone()),
        }
    }

    fn instantiate(self, metric: String, operation: String, value: f64) -> Modifier {
        Modifier {
            metric,
            operation,
            value,
            condition: self.condition.map(TryParse::Parsed),
            stacking: self.stacking,
            priority: self.priority,
            source: self.source,
        }
    }
}

fn and_also(existing: Condition, condition: Condition) -> Condition {
    match existing {
        Condition::And { mut clauses } => {
            clauses.push(TryParse::Parsed(condition));
            Condition::And { clauses }
        }
        existing => Condition::and([existing, condition]),
    }
}

/// Builder for [`ItemSpec`].
///
/// Modifier defaults are scoped with [`ItemBuilder::group`], which pushes a [`ModifierTemplate`]
/// for the duration of a closure and pops it afterwards.
#[derive(Debug, Clone, Default)]
pub struct ItemBuilder {
    name: Option<String>,
    attributes: Attributes,
    modifiers: Vec<Modifier>,
    /// Effective template of every open group, innermost last.
    context: Vec<ModifierTemplate>,
}

impl ItemBuilder {
    pub fn new() -> ItemBuilder {
        ItemBuilder::default()
    }

    pub fn named(name: impl Into<String>) -> ItemBuilder {
        ItemBuilder {
            name: Some(name.into()),
            ..ItemBuilder::default()
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Start a `sum` modifier.
    pub fn increase(self, metric: impl Into<String>) -> PendingModifier {
        self.apply(SUM, metric)
    }

    /// Start a `subtract` modifier.
    pub fn decrease(self, metric: impl Into<String>) -> PendingModifier {
        self.apply(SUBTRACT, metric)
    }

    /// Start a `multiply` modifier.
    pub fn multiply(self, metric: impl Into<String>) -> PendingModifier {
        self.apply(MULTIPLY, metric)
    }

    /// Start a modifier using any (e.g., custom) operation.
    pub fn apply(self, operation: impl Into<String>, metric: impl Into<String>) -> PendingModifier {
        PendingModifier {
            builder: self,
            operation: operation.into(),
            metric: metric.into(),
            template: ModifierTemplate::default(),
        }
    }

    /// Append a fully constructed modifier. Group templates do not apply to it.
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Apply `template` to every modifier added inside `f`.
    ///
    /// Groups nest: inner templates override outer ones field by field, and conditions of all
    /// enclosing groups must hold.
    pub fn group(mut self, template: ModifierTemplate, f: impl FnOnce(Self) -> Self) -> Self {
        let effective = self.current_template().merge(&template);
        let depth = self.context.len();
        self.context.push(effective);

        let mut builder = f(self);

        builder.context.truncate(depth);
        builder
    }

    pub fn build(self) -> ItemSpec {
        ItemSpec {
            name: self.name,
            attributes: self.attributes,
            modifiers: self.modifiers,
        }
    }

    fn current_template(&self) -> ModifierTemplate {
        self.context.last().cloned().unwrap_or_default()
    }
}

/// A modifier being built. Finish it with [`PendingModifier::by`].
#[derive(Debug, Clone)]
#[must_use = "modifier is not added until `by` is called"]
pub struct PendingModifier {
    builder: ItemBuilder,
    operation: String,
    metric: String,
    template: ModifierTemplate,
}

impl PendingModifier {
    pub fn when(mut self, condition: Condition) -> Self {
        self.template = self.template.when(condition);
        self
    }

    pub fn stacking(mut self, stacking: Stacking) -> Self {
        self.template = self.template.stacking(stacking);
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.template = self.template.priority(priority);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.template = self.template.source(source);
        self
    }

    /// Set the modifier value and add the modifier to the item.
    pub fn by(self, value: f64) -> ItemBuilder {
        let PendingModifier {
            mut builder,
            operation,
            metric,
            template,
        } = self;
        let modifier = builder
            .current_template()
            .merge(&template)
            .instantiate(metric, operation, value);
        builder.modifiers.push(modifier);
        builder
    }
}

#[cfg(test)]
mod tests {
    use crate::{models::TryParse, AttributeValue, Condition, Modifier, Stacking};

    use super::{ItemBuilder, ModifierTemplate};

    #[test]
    fn builds_plain_modifiers() {
        let item = ItemBuilder::named("Sword")
            .attribute("rarity", "Common")
            .increase("Damage")
            .by(3.0)
            .decrease("Speed")
            .by(1.0)
            .multiply("Damage")
            .by(2.0)
            .apply("set", "Range")
            .by(4.0)
            .build();

        assert_eq!(item.name.as_deref(), Some("Sword"));
        assert_eq!(
            item.attributes.get("rarity"),
            Some(&AttributeValue::from("Common"))
        );
        assert_eq!(
            item.modifiers,
            vec![
                Modifier::new("Damage", "sum", 3.0),
                Modifier::new("Speed", "subtract", 1.0),
                Modifier::new("Damage", "multiply", 2.0),
                Modifier::new("Range", "set", 4.0),
            ]
        );
    }

    #[test]
    fn per_modifier_settings_do_not_leak() {
        let item = ItemBuilder::new()
            .increase("Health")
            .priority(5)
            .source("potion")
            .stacking(Stacking::Unique)
            .when(Condition::eq("cursed", false))
            .by(10.0)
            .increase("Health")
            .by(1.0)
            .build();

        assert_eq!(
            item.modifiers[0],
            Modifier::new("Health", "sum", 10.0)
                .with_priority(5)
                .with_source("potion")
                .with_stacking(Stacking::Unique)
                .with_condition(Condition::eq("cursed", false))
        );
        assert_eq!(item.modifiers[1], Modifier::new("Health", "sum", 1.0));
    }

    #[test]
    fn group_applies_template_and_pops() {
        let item = ItemBuilder::new()
            .group(
                ModifierTemplate::new().priority(3).source("set-bonus"),
                |b| b.increase("Health").by(1.0).increase("Mana").priority(9).by(2.0),
            )
            .increase("Health")
            .by(3.0)
            .build();

        assert_eq!(item.modifiers[0].priority, Some(3));
        assert_eq!(item.modifiers[0].source.as_deref(), Some("set-bonus"));
        assert_eq!(item.modifiers[1].priority, Some(9));
        assert_eq!(item.modifiers[1].source.as_deref(), Some("set-bonus"));
        assert_eq!(item.modifiers[2], Modifier::new("Health", "sum", 3.0));
    }

    #[test]
    fn nested_groups_combine_conditions() {
        let item = ItemBuilder::new()
            .group(
                ModifierTemplate::new()
                    .when(Condition::eq("rarity", "Rare"))
                    .stacking(Stacking::Unique),
                |b| {
                    b.group(
                        ModifierTemplate::new()
                            .when(Condition::gte("level", 10.0))
                            .stacking(Stacking::Stack),
                        |b| b.increase("Damage").when(Condition::eq("cursed", false)).by(4.0),
                    )
                    .increase("Damage")
                    .by(2.0)
                },
            )
            .build();

        assert_eq!(
            item.modifiers[0].condition,
            Some(TryParse::Parsed(Condition::and([
                Condition::eq("rarity", "Rare"),
                Condition::gte("level", 10.0),
                Condition::eq("cursed", false),
            ])))
        );
        assert_eq!(item.modifiers[0].stacking, Some(Stacking::Stack));

        assert_eq!(
            item.modifiers[1].condition,
            Some(TryParse::Parsed(Condition::eq("rarity", "Rare")))
        );
        assert_eq!(item.modifiers[1].stacking, Some(Stacking::Unique));
    }

    #[test]
    fn explicit_modifier_ignores_group() {
        let item = ItemBuilder::new()
            .group(ModifierTemplate::new().priority(1), |b| {
                b.modifier(Modifier::new("Health", "sum", 1.0))
            })
            .build();
        assert_eq!(item.modifiers[0].priority, None);
    }
}
