use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::error::DefinitionError;
use super::field::FieldDefinition;

/// Fields of one wizard, in registration order.
///
/// Registration order drives iteration everywhere: focus order, error ordering and
/// the order of keys in default values.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, FieldDefinition>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, field: FieldDefinition) -> Result<(), DefinitionError> {
        if self.fields.contains_key(field.key()) {
            return Err(DefinitionError::DuplicateField(field.key().to_string()));
        }
        self.fields.insert(field.key().to_string(), field);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn all(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Registration position of a key, used to order errors.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.fields.get_index_of(key)
    }

    /// For each field, the other fields its predicate and rules read.
    pub fn dependency_graph(&self) -> IndexMap<String, BTreeSet<String>> {
        self.fields
            .iter()
            .map(|(key, field)| (key.clone(), field.reads()))
            .collect()
    }

    /// Every key referenced by a predicate or rule must be registered.
    pub fn check_references(&self) -> Result<(), DefinitionError> {
        for (owner, reads) in self.dependency_graph() {
            if let Some(key) = reads.into_iter().find(|k| !self.contains(k)) {
                return Err(DefinitionError::UnknownField { owner, key });
            }
        }
        Ok(())
    }
}
