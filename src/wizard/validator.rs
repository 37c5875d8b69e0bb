use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::lookups::RemoteLookups;
use super::registry::FieldRegistry;
use super::rule::FieldContext;
use super::values::FormValues;

/// Error message per field. A key with no entry is valid.
///
/// Results are derived from a snapshot and replaced wholesale; there is no way to
/// patch one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    errors: IndexMap<String, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    /// Errors in field registration order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn first(&self) -> Option<(&str, &str)> {
        self.errors().next()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl FromIterator<(String, String)> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ValidationResult {
            errors: iter.into_iter().collect(),
        }
    }
}

/// Validate every applicable field.
///
/// Per field the kind's shape check runs first, then each rule in declaration
/// order; the first failure is the field's error. Inapplicable fields are never
/// looked at, so whatever they hold cannot produce an entry.
pub fn validate(
    values: &FormValues,
    registry: &FieldRegistry,
    applicable: &IndexSet<String>,
    lookups: &RemoteLookups,
) -> ValidationResult {
    let mut errors = IndexMap::new();
    for field in registry.all().filter(|f| applicable.contains(f.key())) {
        let ctx = FieldContext {
            key: field.key(),
            label: field.label(),
        };
        let shape = values
            .get(field.key())
            .and_then(|v| field.kind().check_shape(field.label(), v));
        let error = shape.or_else(|| {
            field
                .rules()
                .iter()
                .filter(|rule| rule.requires_applicable().map_or(true, |k| applicable.contains(k)))
                .find_map(|rule| rule.check(ctx, values, lookups))
        });
        if let Some(message) = error {
            errors.insert(field.key().to_string(), message);
        }
    }
    ValidationResult { errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{FieldDefinition, FieldKind, Rule};
    use serde_json::json;

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .register(
                FieldDefinition::new("min_nodes", "Min nodes", FieldKind::Number { integer: true })
                    .required()
                    .with_rule(Rule::range(0.0, 500.0)),
            )
            .unwrap();
        registry
            .register(
                FieldDefinition::new("max_nodes", "Max nodes", FieldKind::Number { integer: true })
                    .required()
                    .with_rule(Rule::greater_or_equal("min_nodes", "Max nodes must be greater than or equal to min nodes")),
            )
            .unwrap();
        registry
    }

    fn all_keys(registry: &FieldRegistry) -> IndexSet<String> {
        registry.all().map(|f| f.key().to_string()).collect()
    }

    #[test]
    fn test_cross_field_error_lands_on_owner() {
        let registry = registry();
        let values: FormValues = [("min_nodes", json!(5)), ("max_nodes", json!(3))].into_iter().collect();
        let result = validate(&values, &registry, &all_keys(&registry), &RemoteLookups::new());
        assert_eq!(result.error("min_nodes"), None);
        assert_eq!(
            result.error("max_nodes"),
            Some("Max nodes must be greater than or equal to min nodes")
        );
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let registry = registry();
        let values: FormValues = [("min_nodes", json!(-1)), ("max_nodes", json!(null))].into_iter().collect();
        let result = validate(&values, &registry, &all_keys(&registry), &RemoteLookups::new());
        assert_eq!(result.error("min_nodes"), Some("Min nodes must be at least 0"));
        assert_eq!(result.error("max_nodes"), Some("Max nodes is required"));
        assert_eq!(result.first(), Some(("min_nodes", "Min nodes must be at least 0")));
    }

    #[test]
    fn test_shape_check_precedes_rules() {
        let registry = registry();
        let values: FormValues = [("min_nodes", json!("five")), ("max_nodes", json!(3))].into_iter().collect();
        let result = validate(&values, &registry, &all_keys(&registry), &RemoteLookups::new());
        assert_eq!(result.error("min_nodes"), Some("Min nodes must be a number"));
    }

    #[test]
    fn test_inapplicable_fields_are_skipped() {
        let registry = registry();
        let values: FormValues = [("min_nodes", json!(5)), ("max_nodes", json!(3))].into_iter().collect();
        let only_min: IndexSet<String> = ["min_nodes".to_string()].into_iter().collect();
        let result = validate(&values, &registry, &only_min, &RemoteLookups::new());
        assert!(result.is_valid());
    }

    #[test]
    fn test_comparison_against_hidden_sibling_is_skipped() {
        let registry = registry();
        let values: FormValues = [("min_nodes", json!(5)), ("max_nodes", json!(3))].into_iter().collect();
        let only_max: IndexSet<String> = ["max_nodes".to_string()].into_iter().collect();
        let result = validate(&values, &registry, &only_max, &RemoteLookups::new());
        assert_eq!(result.error("max_nodes"), None);
    }
}
