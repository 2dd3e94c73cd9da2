use anyhow::Result;
use serde::Serialize;
use tracing::debug;
use valida_core::{CheckResult, CourseId, IssueChange};
use valida_storage::IssueStore;

use crate::planner::plan_changes;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub opened: usize,
    pub refreshed: usize,
    pub resolved: usize,
}

impl HistorySummary {
    pub fn from_changes(changes: &[IssueChange]) -> Self {
        let mut s = Self::default();
        for c in changes {
            match c {
                IssueChange::Open { .. } => s.opened += 1,
                IssueChange::Refresh { .. } => s.refreshed += 1,
                IssueChange::Resolve { .. } => s.resolved += 1,
            }
        }
        s
    }
}

/// Updates the issue history of one course with the results of a run.
pub fn record_course_results(
    store: &dyn IssueStore,
    course_id: CourseId,
    results: &[CheckResult],
    now_unix: i64,
) -> Result<HistorySummary> {
    let open = store.open_issues(course_id)?;
    let changes = plan_changes(&open, results);
    if !changes.is_empty() {
        store.apply_changes(course_id, &changes, now_unix)?;
    }
    let summary = HistorySummary::from_changes(&changes);
    debug!(
        course_id = course_id.get(),
        opened = summary.opened,
        refreshed = summary.refreshed,
        resolved = summary.resolved,
        "issue history updated"
    );
    Ok(summary)
}
