use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered label/value pairs shown to a human. Values may carry HTML links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Details(Vec<(String, String)>);

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `label`, replacing an earlier value in place so ordering is kept.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.0.push((label, value)),
        }
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, value);
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of one checklist item for one course.
///
/// `internal` carries identifiers for remediation callers (forum id, course
/// module id, ...). It is never meant for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Details,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub internal: BTreeMap<String, String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            message: message.into(),
            details: Details::new(),
            internal: BTreeMap::new(),
        }
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn with_internal(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.internal.insert(key.into(), value.to_string());
        self
    }
}
