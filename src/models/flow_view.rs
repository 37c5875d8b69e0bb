use crate::wizard::WizardDefinition;

/// One row of the flow list.
#[derive(Clone, Debug)]
pub struct FlowView {
    pub name: String,
    pub title: String,
    pub description: String,
    pub step_count: usize,
}

impl From<&WizardDefinition> for FlowView {
    fn from(definition: &WizardDefinition) -> Self {
        Self {
            name: definition.name().to_string(),
            title: definition.title().to_string(),
            description: definition.description().to_string(),
            step_count: definition.steps().len(),
        }
    }
}
