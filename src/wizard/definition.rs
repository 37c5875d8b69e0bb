use std::collections::HashMap;
use std::fmt;

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::{Map, Value};

use super::condition::Condition;
use super::error::{DefinitionError, PredicateEvaluationError};
use super::field::FieldDefinition;
use super::lookups::RemoteLookups;
use super::registry::FieldRegistry;
use super::resolver::{compute_applicable_fields, compute_applicable_steps};
use super::validator::{validate, ValidationResult};
use super::values::FormValues;

/// One page of a wizard and the fields it owns.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    id: String,
    title: String,
    fields: Vec<String>,
    applies_when: Option<Condition>,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fields: Vec::new(),
            applies_when: None,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn applies_when(mut self, condition: Condition) -> Self {
        self.applies_when = Some(condition);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.applies_when.as_ref()
    }

    pub fn owns(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitMethod {
    Post,
    Put,
    Patch,
}

impl SubmitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMethod::Post => "POST",
            SubmitMethod::Put => "PUT",
            SubmitMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the request path from the submitted values.
pub type EndpointFn = fn(&FormValues) -> String;

/// Builds the request body from the values of applicable fields.
pub type PayloadFn = fn(&FormValues, &IndexSet<String>) -> Value;

#[derive(Clone, Copy)]
pub struct SubmitTarget {
    pub method: SubmitMethod,
    pub endpoint: EndpointFn,
}

/// A remote list to fetch before a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSource {
    /// Name the list is stored under in [`RemoteLookups`].
    pub name: String,
    pub endpoint: String,
    /// Attribute of each returned item that becomes the option value.
    pub id_field: String,
}

/// Applicable fields and steps of a snapshot, after combining field predicates
/// with the applicability of their owning step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applicability {
    pub fields: IndexSet<String>,
    /// Ids of applicable steps in declaration order.
    pub steps: Vec<String>,
    pub diagnostics: Vec<PredicateEvaluationError>,
}

impl Applicability {
    pub fn is_field_applicable(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    pub fn is_step_applicable(&self, id: &str) -> bool {
        self.steps.iter().any(|s| s == id)
    }
}

/// A complete, checked wizard: fields, steps and where the result goes.
pub struct WizardDefinition {
    name: String,
    title: String,
    description: String,
    registry: FieldRegistry,
    steps: Vec<StepDefinition>,
    owners: HashMap<String, usize>,
    target: SubmitTarget,
    payload: Option<PayloadFn>,
    lookups: Vec<LookupSource>,
}

impl fmt::Debug for WizardDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardDefinition")
            .field("name", &self.name)
            .field("steps", &self.steps.iter().map(|s| s.id()).collect::<Vec<_>>())
            .field("fields", &self.registry.len())
            .field("method", &self.target.method)
            .finish()
    }
}

impl WizardDefinition {
    pub fn builder(name: impl Into<String>, title: impl Into<String>) -> WizardBuilder {
        WizardBuilder::new(name, title)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.registry.get(key)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id() == id)
    }

    /// Declaration position of a step.
    pub fn step_index(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }

    pub fn owner_of(&self, key: &str) -> Option<&StepDefinition> {
        self.owners.get(key).map(|&i| &self.steps[i])
    }

    pub fn method(&self) -> SubmitMethod {
        self.target.method
    }

    pub fn lookup_sources(&self) -> &[LookupSource] {
        &self.lookups
    }

    /// Every registered field set to its default.
    pub fn default_values(&self) -> FormValues {
        self.registry
            .all()
            .map(|f| (f.key().to_string(), f.default_value().clone()))
            .collect()
    }

    /// A field applies when its own predicate holds and, if a step owns it, that
    /// step applies too.
    pub fn applicable(&self, values: &FormValues) -> Applicability {
        let fields = compute_applicable_fields(values, &self.registry);
        let steps = compute_applicable_steps(values, &self.steps);
        let step_ids: Vec<String> = steps.applicable.iter().map(|s| s.id().to_string()).collect();
        let applicable_fields = fields
            .applicable
            .into_iter()
            .filter(|key| match self.owners.get(key) {
                Some(&i) => step_ids.iter().any(|id| id == self.steps[i].id()),
                None => true,
            })
            .collect();
        let mut diagnostics = steps.diagnostics;
        diagnostics.extend(fields.diagnostics);
        Applicability {
            fields: applicable_fields,
            steps: step_ids,
            diagnostics,
        }
    }

    pub fn validate(&self, values: &FormValues, lookups: &RemoteLookups) -> (Applicability, ValidationResult) {
        let applicability = self.applicable(values);
        let result = validate(values, &self.registry, &applicability.fields, lookups);
        (applicability, result)
    }

    pub fn endpoint(&self, values: &FormValues) -> String {
        (self.target.endpoint)(values)
    }

    /// Request body for the current values. Without a custom builder this is a flat
    /// object of every applicable field.
    pub fn payload(&self, values: &FormValues, applicable: &IndexSet<String>) -> Value {
        if let Some(build) = self.payload {
            return build(values, applicable);
        }
        let mut body = Map::new();
        for (key, value) in values.iter().filter(|(k, _)| applicable.contains(k.as_str())) {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// Assembles a [`WizardDefinition`]. Errors are collected and reported by
/// [`build`](Self::build) so definitions read as one chain.
pub struct WizardBuilder {
    name: String,
    title: String,
    description: String,
    registry: FieldRegistry,
    steps: Vec<StepDefinition>,
    target: Option<SubmitTarget>,
    payload: Option<PayloadFn>,
    lookups: Vec<LookupSource>,
    error: Option<DefinitionError>,
}

impl WizardBuilder {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            registry: FieldRegistry::new(),
            steps: Vec::new(),
            target: None,
            payload: None,
            lookups: Vec::new(),
            error: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        if let Err(e) = self.registry.register(field) {
            self.error.get_or_insert(e);
        }
        self
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn submit_to(mut self, method: SubmitMethod, endpoint: EndpointFn) -> Self {
        self.target = Some(SubmitTarget { method, endpoint });
        self
    }

    pub fn payload(mut self, build: PayloadFn) -> Self {
        self.payload = Some(build);
        self
    }

    pub fn lookup(mut self, name: &str, endpoint: &str, id_field: &str) -> Self {
        self.lookups.push(LookupSource {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            id_field: id_field.to_string(),
        });
        self
    }

    pub fn build(self) -> Result<WizardDefinition, DefinitionError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps(self.name));
        }
        let target = self
            .target
            .ok_or_else(|| DefinitionError::NoSubmitTarget(self.name.clone()))?;

        let mut owners: HashMap<String, usize> = HashMap::new();
        for (index, step) in self.steps.iter().enumerate() {
            if self.steps[..index].iter().any(|s| s.id() == step.id()) {
                return Err(DefinitionError::DuplicateStep(step.id().to_string()));
            }
            for key in step.fields() {
                if !self.registry.contains(key) {
                    return Err(DefinitionError::UnknownField {
                        owner: format!("step {}", step.id()),
                        key: key.clone(),
                    });
                }
                if let Some(&first) = owners.get(key) {
                    return Err(DefinitionError::FieldOwnedTwice {
                        key: key.clone(),
                        first: self.steps[first].id().to_string(),
                        second: step.id().to_string(),
                    });
                }
                owners.insert(key.clone(), index);
            }
            if let Some(key) = step
                .condition()
                .into_iter()
                .flat_map(|c| c.reads())
                .find(|k| !self.registry.contains(k))
            {
                return Err(DefinitionError::UnknownField {
                    owner: format!("step {}", step.id()),
                    key: key.to_string(),
                });
            }
        }
        self.registry.check_references()?;

        Ok(WizardDefinition {
            name: self.name,
            title: self.title,
            description: self.description,
            registry: self.registry,
            steps: self.steps,
            owners,
            target,
            payload: self.payload,
            lookups: self.lookups,
        })
    }
}
