//! Applicability of fields and steps for a snapshot of values
use indexmap::IndexSet;

use super::condition::Condition;
use super::definition::StepDefinition;
use super::error::{PredicateEvaluationError, Subject};
use super::registry::FieldRegistry;
use super::values::FormValues;

/// Output of a resolver pass plus any predicates that failed to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub applicable: T,
    pub diagnostics: Vec<PredicateEvaluationError>,
}

/// Keys of every field whose predicate holds, in registration order.
pub fn compute_applicable_fields(values: &FormValues, registry: &FieldRegistry) -> Resolution<IndexSet<String>> {
    let mut applicable = IndexSet::new();
    let mut diagnostics = Vec::new();
    for field in registry.all() {
        let subject = || Subject::Field(field.key().to_string());
        if evaluate(field.condition(), values, subject, &mut diagnostics) {
            applicable.insert(field.key().to_string());
        }
    }
    Resolution { applicable, diagnostics }
}

/// Steps whose predicate holds, in declaration order.
pub fn compute_applicable_steps<'a>(
    values: &FormValues,
    steps: &'a [StepDefinition],
) -> Resolution<Vec<&'a StepDefinition>> {
    let mut applicable = Vec::new();
    let mut diagnostics = Vec::new();
    for step in steps {
        let subject = || Subject::Step(step.id().to_string());
        if evaluate(step.condition(), values, subject, &mut diagnostics) {
            applicable.push(step);
        }
    }
    Resolution { applicable, diagnostics }
}

fn evaluate(
    condition: Option<&Condition>,
    values: &FormValues,
    subject: impl FnOnce() -> Subject,
    diagnostics: &mut Vec<PredicateEvaluationError>,
) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    match condition.evaluate(values) {
        Ok(applies) => applies,
        Err(message) => {
            let error = PredicateEvaluationError {
                subject: subject(),
                message,
            };
            tracing::warn!(%error, "Treating subject as not applicable");
            diagnostics.push(error);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{FieldDefinition, FieldKind};
    use serde_json::json;

    fn registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::new("autoscaling", "Autoscaling", FieldKind::Toggle))
            .unwrap();
        registry
            .register(
                FieldDefinition::new("min_nodes", "Min nodes", FieldKind::Number { integer: true })
                    .applies_when(Condition::truthy("autoscaling")),
            )
            .unwrap();
        registry
            .register(
                FieldDefinition::new("replicas", "Replicas", FieldKind::Number { integer: true })
                    .applies_when(Condition::truthy("autoscaling").negate()),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_fields_without_predicate_always_apply() {
        let empty = FormValues::new();
        let resolution = compute_applicable_fields(&empty, &registry());
        assert!(resolution.applicable.contains("autoscaling"));
    }

    #[test]
    fn test_predicates_follow_values() {
        let on: FormValues = [("autoscaling", json!(true))].into_iter().collect();
        let resolution = compute_applicable_fields(&on, &registry());
        let keys: Vec<&String> = resolution.applicable.iter().collect();
        assert_eq!(keys, vec!["autoscaling", "min_nodes"]);
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_failing_predicate_is_recovered() {
        let broken: FormValues = [("autoscaling", json!("yes"))].into_iter().collect();
        let resolution = compute_applicable_fields(&broken, &registry());
        let keys: Vec<&String> = resolution.applicable.iter().collect();
        assert_eq!(keys, vec!["autoscaling"]);
        assert_eq!(resolution.diagnostics.len(), 2);
        assert_eq!(resolution.diagnostics[0].subject, Subject::Field("min_nodes".into()));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let values: FormValues = [("autoscaling", json!(false))].into_iter().collect();
        let registry = registry();
        let first = compute_applicable_fields(&values, &registry);
        let second = compute_applicable_fields(&values, &registry);
        assert_eq!(first, second);
    }

    fn steps() -> Vec<StepDefinition> {
        vec![
            StepDefinition::new("details", "Details").with_fields(["autoscaling"]),
            StepDefinition::new("scaling", "Scaling")
                .with_fields(["min_nodes"])
                .applies_when(Condition::truthy("autoscaling")),
            StepDefinition::new("sizing", "Sizing")
                .with_fields(["replicas"])
                .applies_when(Condition::truthy("autoscaling").negate()),
        ]
    }

    fn ids<'a>(resolution: &Resolution<Vec<&'a StepDefinition>>) -> Vec<&'a str> {
        resolution.applicable.iter().map(|s| s.id()).collect()
    }

    #[test]
    fn test_steps_follow_values_in_declaration_order() {
        let steps = steps();
        let on: FormValues = [("autoscaling", json!(true))].into_iter().collect();
        let off: FormValues = [("autoscaling", json!(false))].into_iter().collect();
        assert_eq!(ids(&compute_applicable_steps(&on, &steps)), vec!["details", "scaling"]);
        assert_eq!(ids(&compute_applicable_steps(&off, &steps)), vec!["details", "sizing"]);
    }

    #[test]
    fn test_failing_step_predicate_is_recovered() {
        let steps = steps();
        let broken: FormValues = [("autoscaling", json!("yes"))].into_iter().collect();
        let resolution = compute_applicable_steps(&broken, &steps);
        assert_eq!(ids(&resolution), vec!["details"]);
        let subjects: Vec<&Subject> = resolution.diagnostics.iter().map(|d| &d.subject).collect();
        assert_eq!(
            subjects,
            vec![&Subject::Step("scaling".into()), &Subject::Step("sizing".into())]
        );
    }

    #[test]
    fn test_step_resolution_is_idempotent() {
        let steps = steps();
        for values in [
            [("autoscaling", json!(true))].into_iter().collect::<FormValues>(),
            [("autoscaling", json!(3))].into_iter().collect::<FormValues>(),
        ] {
            let first = compute_applicable_steps(&values, &steps);
            let second = compute_applicable_steps(&values, &steps);
            assert_eq!(ids(&first), ids(&second));
            assert_eq!(first.diagnostics, second.diagnostics);
        }
    }
}
