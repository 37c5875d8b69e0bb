use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};

use super::condition::Condition;
use super::lookups::RemoteLookups;
use super::rule::Rule;
use super::values::{type_name, FieldValue};
use crate::utils::parse_flag;

/// One selectable choice of a [`FieldKind::Select`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOptions {
    Static(Vec<SelectOption>),
    /// Options come from a named [`RemoteLookups`] list.
    Lookup(String),
}

/// The tag that decides how a field is parsed, shape-checked and rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Free text spanning several lines, such as PEM data.
    Multiline,
    Number { integer: bool },
    Toggle,
    Select(SelectOptions),
    /// Comma separated strings.
    TextList,
    /// `key=value` pairs, one per line.
    LabelList,
}

impl FieldKind {
    pub fn select<I, V, L>(options: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        FieldKind::Select(SelectOptions::Static(
            options.into_iter().map(|(v, l)| SelectOption::new(v, l)).collect(),
        ))
    }

    pub fn lookup_select(list: impl Into<String>) -> Self {
        FieldKind::Select(SelectOptions::Lookup(list.into()))
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Multiline => "multiline",
            FieldKind::Number { .. } => "number",
            FieldKind::Toggle => "toggle",
            FieldKind::Select(_) => "select",
            FieldKind::TextList => "text_list",
            FieldKind::LabelList => "label_list",
        }
    }

    /// Value a field holds before the user touches it.
    pub fn empty_value(&self) -> FieldValue {
        match self {
            FieldKind::Toggle => Value::Bool(false),
            FieldKind::TextList | FieldKind::LabelList => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }

    /// Options to offer, resolving lookup-backed selects. `None` when the lookup was
    /// not fetched, in which case the field degrades to free text.
    pub fn options(&self, lookups: &RemoteLookups) -> Option<Vec<SelectOption>> {
        match self {
            FieldKind::Select(SelectOptions::Static(options)) => Some(options.clone()),
            FieldKind::Select(SelectOptions::Lookup(list)) => lookups
                .list(list)
                .map(|items| items.iter().map(|i| SelectOption::new(i.clone(), i.clone())).collect()),
            _ => None,
        }
    }

    /// Convert raw presentation input into a value of this kind.
    ///
    /// Input that does not parse is kept as a string so the shape check can
    /// report it instead of silently dropping what the user typed.
    pub fn parse_input(&self, raw: &str) -> FieldValue {
        let trimmed = raw.trim();
        match self {
            FieldKind::Text | FieldKind::Multiline | FieldKind::Select(_) => {
                if trimmed.is_empty() {
                    Value::Null
                } else {
                    Value::String(trimmed.to_string())
                }
            }
            FieldKind::Number { integer } => {
                if trimmed.is_empty() {
                    Value::Null
                } else if let Ok(n) = trimmed.parse::<i64>() {
                    json!(n)
                } else if let Some(n) = trimmed.parse::<f64>().ok().filter(|n| !integer && n.is_finite()) {
                    json!(n)
                } else {
                    Value::String(trimmed.to_string())
                }
            }
            FieldKind::Toggle => Value::Bool(parse_flag(Some(trimmed), false)),
            FieldKind::TextList => Value::Array(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            FieldKind::LabelList => Value::Array(
                trimmed
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|line| {
                        let (key, value) = line.split_once('=').unwrap_or((line, ""));
                        json!({"key": key.trim(), "value": value.trim()})
                    })
                    .collect(),
            ),
        }
    }

    /// Inverse of [`parse_input`](Self::parse_input), used to prefill inputs.
    pub fn render_input(&self, value: &FieldValue) -> String {
        match (self, value) {
            (_, Value::Null) => String::new(),
            (FieldKind::Toggle, v) => if v == &Value::Bool(true) { "on".into() } else { String::new() },
            (FieldKind::TextList, Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            (FieldKind::LabelList, Value::Array(items)) => items
                .iter()
                .map(|item| {
                    let key = item.get("key").and_then(Value::as_str).unwrap_or("");
                    let val = item.get("value").and_then(Value::as_str).unwrap_or("");
                    format!("{}={}", key, val)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            (_, Value::String(s)) => s.clone(),
            (_, other) => other.to_string(),
        }
    }

    /// Implicit first rule of every field: the value has the kind's shape.
    pub fn check_shape(&self, label: &str, value: &FieldValue) -> Option<String> {
        if value.is_null() {
            return None;
        }
        match self {
            FieldKind::Text | FieldKind::Multiline => {
                (!value.is_string()).then(|| format!("{} must be text", label))
            }
            FieldKind::Number { integer } => match value.as_f64() {
                None => Some(format!("{} must be a number", label)),
                Some(n) if *integer && n.fract() != 0.0 => Some(format!("{} must be a whole number", label)),
                Some(_) => None,
            },
            FieldKind::Toggle => (!value.is_boolean()).then(|| format!("{} must be on or off", label)),
            FieldKind::Select(options) => {
                let Some(s) = value.as_str() else {
                    return Some(format!("{} must be one of the offered choices", label));
                };
                match options {
                    SelectOptions::Static(options) if !options.iter().any(|o| o.value == s) => {
                        Some(format!("`{}` is not a valid choice for {}", s, label))
                    }
                    _ => None,
                }
            }
            FieldKind::TextList => match value.as_array() {
                Some(items) if items.iter().all(Value::is_string) => None,
                _ => Some(format!("{} must be a list of text entries, got a {}", label, type_name(value))),
            },
            FieldKind::LabelList => match value.as_array() {
                Some(items) if items.iter().all(|i| i.get("key").map_or(false, Value::is_string)) => None,
                _ => Some(format!("{} must be a list of key=value labels", label)),
            },
        }
    }
}

/// Declaration of one form field. Immutable once registered.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    key: String,
    label: String,
    kind: FieldKind,
    default: FieldValue,
    rules: Vec<Rule>,
    applies_when: Option<Condition>,
    help: Option<String>,
}

impl FieldDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        let default = kind.empty_value();
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            default,
            rules: Vec::new(),
            applies_when: None,
            help: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = value.into();
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.with_rule(Rule::Required)
    }

    pub fn applies_when(mut self, condition: Condition) -> Self {
        self.applies_when = Some(condition);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default_value(&self) -> &FieldValue {
        &self.default
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.applies_when.as_ref()
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.rules.iter().any(|r| matches!(r, Rule::Required))
    }

    /// Every other field this one depends on, through its predicate or its rules.
    pub fn reads(&self) -> BTreeSet<String> {
        self.applies_when
            .iter()
            .flat_map(|c| c.reads())
            .chain(self.rules.iter().flat_map(|r| r.reads()))
            .filter(|k| *k != self.key)
            .map(str::to_string)
            .collect()
    }
}
