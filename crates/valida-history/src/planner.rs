use std::collections::BTreeMap;

use valida_core::{truncate_validation_name, CheckResult, Issue, IssueChange};

/// Reduces a run to `name -> passed`. A repeated name keeps its last result.
pub fn outcome_by_name(results: &[CheckResult]) -> BTreeMap<String, bool> {
    let mut by_name = BTreeMap::new();
    for r in results {
        if r.name.is_empty() {
            continue;
        }
        by_name.insert(truncate_validation_name(&r.name), r.passed);
    }
    by_name
}

/// Plans the issue transitions for one course run.
///
/// - failing check with an open issue: refresh it
/// - failing check without one: open a new issue
/// - passing check with an open issue: resolve it
///
/// Open issues for checks absent from `results` are left alone.
pub fn plan_changes(open: &[Issue], results: &[CheckResult]) -> Vec<IssueChange> {
    let outcomes = outcome_by_name(results);
    let mut changes = vec![];

    for (name, passed) in &outcomes {
        if *passed {
            continue;
        }
        match open.iter().find(|i| i.is_open() && &i.validation == name) {
            Some(issue) => changes.push(IssueChange::Refresh { issue_id: issue.id }),
            None => changes.push(IssueChange::Open {
                validation: name.clone(),
            }),
        }
    }

    for issue in open.iter().filter(|i| i.is_open()) {
        if outcomes.get(&issue.validation) == Some(&true) {
            changes.push(IssueChange::Resolve { issue_id: issue.id });
        }
    }

    changes
}
