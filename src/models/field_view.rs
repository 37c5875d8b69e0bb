use crate::wizard::{FieldDefinition, FieldKind, FieldValue, RemoteLookups};

#[derive(Clone, Debug)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// A field as the step template renders it.
#[derive(Clone, Debug)]
pub struct FieldView {
    pub key: String,
    pub label: String,
    /// Kind tag, selecting the input widget.
    pub kind: String,
    pub input_value: String,
    pub options: Vec<OptionView>,
    pub checked: bool,
    pub required: bool,
    pub error: String,
    pub has_error: bool,
    pub help: String,
}

impl FieldView {
    pub fn build(field: &FieldDefinition, value: Option<&FieldValue>, error: Option<&str>, lookups: &RemoteLookups) -> Self {
        let kind = field.kind();
        let input_value = value.map(|v| kind.render_input(v)).unwrap_or_default();
        let resolved = kind.options(lookups);
        // A lookup select whose list was not fetched is rendered as free text.
        let tag = match (kind, &resolved) {
            (FieldKind::Select(_), None) => "text",
            _ => kind.tag(),
        };
        let options = resolved
            .unwrap_or_default()
            .into_iter()
            .map(|o| OptionView {
                selected: o.value == input_value,
                value: o.value,
                label: o.label,
            })
            .collect();
        Self {
            key: field.key().to_string(),
            label: field.label().to_string(),
            kind: tag.to_string(),
            checked: matches!(kind, FieldKind::Toggle) && value.and_then(|v| v.as_bool()).unwrap_or(false),
            input_value,
            options,
            required: field.is_required(),
            error: error.unwrap_or_default().to_string(),
            has_error: error.is_some(),
            help: field.help().unwrap_or_default().to_string(),
        }
    }
}
