//! Per-field validation rules
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::lookups::RemoteLookups;
use super::values::{is_present, FieldValue, FormValues};

static LABEL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*/)?[A-Za-z0-9]([-A-Za-z0-9_.]{0,61}[A-Za-z0-9])?$",
    )
    .expect("label key pattern")
});

static LABEL_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]([-A-Za-z0-9_.]{0,61}[A-Za-z0-9])?)?$").expect("label value pattern")
});

/// Signature of a [`Rule::Custom`] check: owning key, snapshot, lookups.
pub type RuleFn = Arc<dyn Fn(&str, &FormValues, &RemoteLookups) -> Option<String> + Send + Sync>;

/// The field a rule is being evaluated for.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub key: &'a str,
    pub label: &'a str,
}

/// A validation rule attached to one field.
///
/// Cross-field rules read sibling values from the snapshot but the error they
/// produce is always recorded under the owning field.
#[derive(Clone)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Pattern { regex: Regex, message: String },
    Range { min: Option<f64>, max: Option<f64> },
    MustBeTrue { message: String },
    /// Owning number must be `>=` the number in `other`. Skipped while `other`
    /// is not applicable, so a hidden sibling's stale value never blocks.
    GreaterOrEqualField { other: String, message: String },
    /// Owning field or at least one of `others` must be filled in.
    AtLeastOneOf { others: Vec<String>, message: String },
    UniqueLabelKeys,
    LabelFormat,
    /// Value must appear in a pre-fetched list. Skipped while the list is not loaded.
    InLookup { list: String },
    /// Reads a pre-fetched verdict for the value. Skipped when none was fetched.
    RemoteCheck { check: String },
    /// RFC 3339 timestamp, optionally strictly after the lookups' `as_of` time.
    Timestamp { future_only: bool },
    Custom { reads: Vec<String>, check: RuleFn },
}

impl Rule {
    /// Build a pattern rule. Panics on an invalid pattern: rule sets are static.
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Self {
        Rule::Pattern {
            regex: Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule pattern {pattern:?}: {e}")),
            message: message.into(),
        }
    }

    pub fn range(min: impl Into<Option<f64>>, max: impl Into<Option<f64>>) -> Self {
        Rule::Range {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn must_be_true(message: impl Into<String>) -> Self {
        Rule::MustBeTrue {
            message: message.into(),
        }
    }

    pub fn greater_or_equal(other: impl Into<String>, message: impl Into<String>) -> Self {
        Rule::GreaterOrEqualField {
            other: other.into(),
            message: message.into(),
        }
    }

    pub fn at_least_one_of(others: &[&str], message: impl Into<String>) -> Self {
        Rule::AtLeastOneOf {
            others: others.iter().map(|k| k.to_string()).collect(),
            message: message.into(),
        }
    }

    pub fn in_lookup(list: impl Into<String>) -> Self {
        Rule::InLookup { list: list.into() }
    }

    pub fn remote_check(check: impl Into<String>) -> Self {
        Rule::RemoteCheck {
            check: check.into(),
        }
    }

    pub fn custom<F>(reads: &[&str], check: F) -> Self
    where
        F: Fn(&str, &FormValues, &RemoteLookups) -> Option<String> + Send + Sync + 'static,
    {
        Rule::Custom {
            reads: reads.iter().map(|k| k.to_string()).collect(),
            check: Arc::new(check),
        }
    }

    /// Sibling field keys this rule reads.
    pub fn reads(&self) -> Vec<&str> {
        match self {
            Rule::GreaterOrEqualField { other, .. } => vec![other.as_str()],
            Rule::AtLeastOneOf { others, .. } => others.iter().map(String::as_str).collect(),
            Rule::Custom { reads, .. } => reads.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Sibling that must itself be applicable for the rule to run.
    pub fn requires_applicable(&self) -> Option<&str> {
        match self {
            Rule::GreaterOrEqualField { other, .. } => Some(other.as_str()),
            _ => None,
        }
    }

    /// Rules that still run when the owning value is empty.
    fn checks_empty(&self) -> bool {
        matches!(
            self,
            Rule::Required | Rule::MustBeTrue { .. } | Rule::AtLeastOneOf { .. } | Rule::Custom { .. }
        )
    }

    /// Run the rule, returning the error message on failure.
    pub fn check(&self, field: FieldContext<'_>, values: &FormValues, lookups: &RemoteLookups) -> Option<String> {
        let value = values.get(field.key).unwrap_or(&Value::Null);
        if !is_present(value) && !self.checks_empty() {
            return None;
        }
        match self {
            Rule::Required => (!is_present(value)).then(|| format!("{} is required", field.label)),
            Rule::MinLength(min) => text_len(value)
                .filter(|len| len < min)
                .map(|_| format!("{} must be at least {} characters", field.label, min)),
            Rule::MaxLength(max) => text_len(value)
                .filter(|len| len > max)
                .map(|_| format!("{} may not exceed {} characters", field.label, max)),
            Rule::Pattern { regex, message } => value
                .as_str()
                .filter(|s| !regex.is_match(s.trim()))
                .map(|_| message.clone()),
            Rule::Range { min, max } => {
                let n = value.as_f64()?;
                if let Some(min) = min.filter(|m| n < *m) {
                    return Some(format!("{} must be at least {}", field.label, format_number(min)));
                }
                if let Some(max) = max.filter(|m| n > *m) {
                    return Some(format!("{} may not exceed {}", field.label, format_number(max)));
                }
                None
            }
            Rule::MustBeTrue { message } => (value != &Value::Bool(true)).then(|| message.clone()),
            Rule::GreaterOrEqualField { other, message } => {
                let own = value.as_f64()?;
                let other = values.number(other)?;
                (own < other).then(|| message.clone())
            }
            Rule::AtLeastOneOf { others, message } => {
                let any = is_present(value) || others.iter().any(|k| values.is_present(k));
                (!any).then(|| message.clone())
            }
            Rule::UniqueLabelKeys => {
                let mut seen = HashSet::new();
                label_entries(value)
                    .into_iter()
                    .find(|(key, _)| !key.is_empty() && !seen.insert(*key))
                    .map(|(key, _)| format!("Each label must have a unique key; `{}` is used more than once", key))
            }
            Rule::LabelFormat => label_entries(value).into_iter().find_map(|(key, val)| {
                if key.is_empty() {
                    Some("Every label needs a key".to_string())
                } else if !LABEL_KEY.is_match(key) {
                    Some(format!("`{}` is not a valid label key", key))
                } else if !LABEL_VALUE.is_match(val) {
                    Some(format!("`{}` is not a valid value for label `{}`", val, key))
                } else {
                    None
                }
            }),
            Rule::InLookup { list } => {
                let s = value.as_str()?.trim();
                let options = lookups.list(list)?;
                (!options.iter().any(|o| o == s))
                    .then(|| format!("`{}` is not an available {}", s, field.label.to_lowercase()))
            }
            Rule::RemoteCheck { check } => {
                let s = value.as_str()?.trim();
                lookups.check(check, s).flatten().map(str::to_string)
            }
            Rule::Timestamp { future_only } => {
                let s = value.as_str()?.trim();
                match DateTime::parse_from_rfc3339(s) {
                    Err(_) => Some(format!(
                        "{} must be a timestamp such as 2026-01-31T09:00:00Z",
                        field.label
                    )),
                    Ok(ts) if *future_only && ts <= lookups.as_of() => {
                        Some(format!("{} must be in the future", field.label))
                    }
                    Ok(_) => None,
                }
            }
            Rule::Custom { check, .. } => check(field.key, values, lookups),
        }
    }
}

fn text_len(value: &FieldValue) -> Option<usize> {
    value.as_str().map(|s| s.trim().chars().count())
}

/// `(key, value)` pairs of a label list. Entries that are not objects read as empty.
fn label_entries(value: &FieldValue) -> Vec<(&str, &str)> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let key = item.get("key").and_then(Value::as_str).unwrap_or("").trim();
                    let val = item.get("value").and_then(Value::as_str).unwrap_or("").trim();
                    (key, val)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "Required"),
            Rule::MinLength(n) => write!(f, "MinLength({})", n),
            Rule::MaxLength(n) => write!(f, "MaxLength({})", n),
            Rule::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Rule::Range { min, max } => write!(f, "Range({:?}..{:?})", min, max),
            Rule::MustBeTrue { .. } => write!(f, "MustBeTrue"),
            Rule::GreaterOrEqualField { other, .. } => write!(f, "GreaterOrEqual({})", other),
            Rule::AtLeastOneOf { others, .. } => write!(f, "AtLeastOneOf({})", others.join(", ")),
            Rule::UniqueLabelKeys => write!(f, "UniqueLabelKeys"),
            Rule::LabelFormat => write!(f, "LabelFormat"),
            Rule::InLookup { list } => write!(f, "InLookup({})", list),
            Rule::RemoteCheck { check } => write!(f, "RemoteCheck({})", check),
            Rule::Timestamp { future_only } => write!(f, "Timestamp(future_only: {})", future_only),
            Rule::Custom { reads, .. } => write!(f, "Custom({})", reads.join(", ")),
        }
    }
}
