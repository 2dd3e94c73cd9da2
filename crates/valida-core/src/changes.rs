use serde::{Deserialize, Serialize};

use crate::ids::*;

/// Longest validation name the issues table stores.
pub const MAX_VALIDATION_NAME_CHARS: usize = 255;

/// A single state transition planned by the history tracker. The store applies
/// a whole plan for one course as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssueChange {
    Open { validation: String },
    Refresh { issue_id: IssueId },
    Resolve { issue_id: IssueId },
}

/// Selection used by issue listings and reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    pub open_only: bool,
    pub course_id: Option<CourseId>,
    pub validation: Option<String>,
}

impl IssueFilter {
    pub fn open() -> Self {
        Self {
            open_only: true,
            ..Self::default()
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, issue: &crate::Issue) -> bool {
        if self.open_only && !issue.is_open() {
            return false;
        }
        if let Some(c) = self.course_id {
            if issue.course_id != c {
                return false;
            }
        }
        match &self.validation {
            Some(v) => &issue.validation == v,
            None => true,
        }
    }
}

/// Clamps a check name to what the issues table can hold, on a char boundary.
pub fn truncate_validation_name(name: &str) -> String {
    name.chars().take(MAX_VALIDATION_NAME_CHARS).collect()
}
