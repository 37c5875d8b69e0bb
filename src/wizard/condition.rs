//! Visibility predicates for fields and steps
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::values::{is_present, type_name, FormValues};

/// Escape hatch for predicates the declarative variants cannot express.
pub type PredicateFn = Arc<dyn Fn(&FormValues) -> Result<bool, String> + Send + Sync>;

/// A pure predicate over [`FormValues`].
///
/// Conditions only read field values, never the applicability of other fields, so
/// they can be evaluated in any order.
#[derive(Clone)]
pub enum Condition {
    Equals { key: String, value: Value },
    NotEquals { key: String, value: Value },
    OneOf { key: String, values: Vec<Value> },
    /// Boolean field is `true`. An unset field reads as `false`.
    Truthy(String),
    IsSet(String),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Custom {
        reads: Vec<String>,
        predicate: PredicateFn,
    },
}

impl Condition {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::NotEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn one_of<V: Into<Value>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Condition::OneOf {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn truthy(key: impl Into<String>) -> Self {
        Condition::Truthy(key.into())
    }

    pub fn is_set(key: impl Into<String>) -> Self {
        Condition::IsSet(key.into())
    }

    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }

    pub fn custom<F>(reads: &[&str], predicate: F) -> Self
    where
        F: Fn(&FormValues) -> Result<bool, String> + Send + Sync + 'static,
    {
        Condition::Custom {
            reads: reads.iter().map(|k| k.to_string()).collect(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate against a snapshot. An `Err` means the predicate could not decide,
    /// for example because a value has the wrong type for the comparison.
    pub fn evaluate(&self, values: &FormValues) -> Result<bool, String> {
        match self {
            Condition::Equals { key, value } => compare(values, key, value),
            Condition::NotEquals { key, value } => compare(values, key, value).map(|eq| !eq),
            Condition::OneOf { key, values: options } => {
                for option in options {
                    if compare(values, key, option)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Truthy(key) => match lookup(values, key)? {
                Value::Bool(b) => Ok(*b),
                Value::Null => Ok(false),
                other => Err(format!("`{}` holds a {}, expected a boolean", key, type_name(other))),
            },
            Condition::IsSet(key) => Ok(is_present(lookup(values, key)?)),
            Condition::Not(inner) => inner.evaluate(values).map(|b| !b),
            Condition::All(conditions) => {
                for c in conditions {
                    if !c.evaluate(values)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Any(conditions) => {
                for c in conditions {
                    if c.evaluate(values)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Custom { predicate, .. } => predicate(values),
        }
    }

    /// Field keys this condition reads.
    pub fn reads(&self) -> Vec<&str> {
        match self {
            Condition::Equals { key, .. }
            | Condition::NotEquals { key, .. }
            | Condition::OneOf { key, .. }
            | Condition::Truthy(key)
            | Condition::IsSet(key) => vec![key.as_str()],
            Condition::Not(inner) => inner.reads(),
            Condition::All(conditions) | Condition::Any(conditions) => {
                conditions.iter().flat_map(|c| c.reads()).collect()
            }
            Condition::Custom { reads, .. } => reads.iter().map(String::as_str).collect(),
        }
    }
}

fn lookup<'v>(values: &'v FormValues, key: &str) -> Result<&'v Value, String> {
    values
        .get(key)
        .ok_or_else(|| format!("`{}` has no value", key))
}

fn compare(values: &FormValues, key: &str, expected: &Value) -> Result<bool, String> {
    let actual = lookup(values, key)?;
    if actual.is_null() || expected.is_null() {
        return Ok(actual == expected);
    }
    if std::mem::discriminant(actual) != std::mem::discriminant(expected) {
        return Err(format!(
            "cannot compare `{}` ({}) with a {}",
            key,
            type_name(actual),
            type_name(expected)
        ));
    }
    Ok(actual == expected)
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { key, value } => write!(f, "{} == {}", key, value),
            Condition::NotEquals { key, value } => write!(f, "{} != {}", key, value),
            Condition::OneOf { key, values } => write!(f, "{} in {:?}", key, values),
            Condition::Truthy(key) => write!(f, "{}", key),
            Condition::IsSet(key) => write!(f, "set({})", key),
            Condition::Not(inner) => write!(f, "!({:?})", inner),
            Condition::All(c) => f.debug_tuple("All").field(c).finish(),
            Condition::Any(c) => f.debug_tuple("Any").field(c).finish(),
            Condition::Custom { reads, .. } => write!(f, "custom({})", reads.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values() -> FormValues {
        [
            ("provider", json!("aws")),
            ("autoscaling", json!(true)),
            ("replicas", json!(3)),
            ("proxy", Value::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_equals_and_one_of() {
        let v = values();
        assert_eq!(Condition::equals("provider", "aws").evaluate(&v), Ok(true));
        assert_eq!(Condition::not_equals("provider", "aws").evaluate(&v), Ok(false));
        assert_eq!(Condition::one_of("provider", ["gcp", "aws"]).evaluate(&v), Ok(true));
    }

    #[test]
    fn test_null_compares_without_error() {
        let v = values();
        assert_eq!(Condition::equals("proxy", "x").evaluate(&v), Ok(false));
        assert_eq!(Condition::is_set("proxy").evaluate(&v), Ok(false));
    }

    #[test]
    fn test_type_mismatch_is_an_evaluation_error() {
        let v = values();
        assert!(Condition::equals("replicas", "3").evaluate(&v).is_err());
        assert!(Condition::truthy("provider").evaluate(&v).is_err());
        assert!(Condition::truthy("missing").evaluate(&v).is_err());
    }

    #[test]
    fn test_combinators() {
        let v = values();
        let c = Condition::All(vec![
            Condition::truthy("autoscaling"),
            Condition::equals("provider", "gcp").negate(),
        ]);
        assert_eq!(c.evaluate(&v), Ok(true));
        assert_eq!(c.reads(), vec!["autoscaling", "provider"]);
    }

    #[test]
    fn test_custom_reads_are_declared() {
        let c = Condition::custom(&["replicas"], |v| Ok(v.integer("replicas").unwrap_or(0) > 2));
        assert_eq!(c.evaluate(&values()), Ok(true));
        assert_eq!(c.reads(), vec!["replicas"]);
    }
}
