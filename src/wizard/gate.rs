use indexmap::IndexSet;

use super::definition::StepDefinition;
use super::validator::ValidationResult;

/// Owned fields of `step` that currently apply and carry a non-empty error.
pub fn blocking_fields<'a>(
    step: &'a StepDefinition,
    validation: &ValidationResult,
    applicable: &IndexSet<String>,
) -> Vec<&'a str> {
    step.fields()
        .iter()
        .filter(|key| applicable.contains(key.as_str()))
        .filter(|key| validation.error(key).map_or(false, |msg| !msg.is_empty()))
        .map(String::as_str)
        .collect()
}

/// A step may be left forward iff none of its applicable fields has an error.
/// Hidden fields never block, whatever they hold.
pub fn can_advance(step: &StepDefinition, validation: &ValidationResult, applicable: &IndexSet<String>) -> bool {
    blocking_fields(step, validation, applicable).is_empty()
}
