use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pre-fetched remote data that rules read synchronously.
///
/// `lists` hold option sets (machine types, upgrade versions). `checks` hold a
/// verdict per value for a named remote check: `None` passed, `Some(msg)` failed.
/// `as_of` is the moment the snapshot was taken and is the clock time-based rules
/// compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLookups {
    #[serde(default)]
    lists: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    checks: BTreeMap<String, BTreeMap<String, Option<String>>>,
    #[serde(default = "Utc::now")]
    as_of: DateTime<Utc>,
}

impl Default for RemoteLookups {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteLookups {
    pub fn new() -> Self {
        Self {
            lists: BTreeMap::new(),
            checks: BTreeMap::new(),
            as_of: Utc::now(),
        }
    }

    pub fn at(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_list<I, S>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_list(name, items.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_check(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        failure: Option<String>,
    ) -> Self {
        self.checks
            .entry(name.into())
            .or_default()
            .insert(value.into(), failure);
        self
    }

    pub fn insert_list(&mut self, name: impl Into<String>, items: Vec<String>) {
        self.lists.insert(name.into(), items);
    }

    /// `None` means the list was never fetched.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(Vec::as_slice)
    }

    /// `None` when no verdict was pre-fetched for this value.
    pub fn check(&self, name: &str, value: &str) -> Option<Option<&str>> {
        self.checks
            .get(name)
            .and_then(|verdicts| verdicts.get(value))
            .map(|failure| failure.as_deref())
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}
