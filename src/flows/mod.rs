//! Wizards offered by the console
use std::sync::Arc;

use indexmap::IndexMap;

use crate::wizard::{DefinitionError, FieldDefinition, FieldKind, Rule, WizardDefinition};

pub mod cluster_proxy;
pub mod machine_pool;
pub mod upgrade_policy;

/// Every flow by name, in menu order.
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: IndexMap<String, Arc<WizardDefinition>>,
}

impl FlowCatalog {
    /// Build the built-in flows. Fails on the first defective definition.
    pub fn builtin() -> Result<Self, DefinitionError> {
        let mut catalog = FlowCatalog::default();
        for definition in [
            machine_pool::definition()?,
            cluster_proxy::definition()?,
            upgrade_policy::definition()?,
        ] {
            catalog.insert(definition);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, definition: WizardDefinition) {
        self.flows.insert(definition.name().to_string(), Arc::new(definition));
    }

    pub fn get(&self, name: &str) -> Option<Arc<WizardDefinition>> {
        self.flows.get(name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WizardDefinition>> {
        self.flows.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.flows.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// Cluster the flow operates on. Shared by every flow.
fn cluster_id_field() -> FieldDefinition {
    FieldDefinition::new("cluster_id", "Cluster ID", FieldKind::Text)
        .required()
        .with_rule(Rule::pattern(
            r"^[a-z0-9][a-z0-9-]{0,62}$",
            "Cluster ID may only contain lower-case letters, digits and '-'",
        ))
}
