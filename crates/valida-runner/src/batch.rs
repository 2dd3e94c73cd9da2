use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use valida_core::{Course, CourseId};
use valida_history::record_course_results;
use valida_rules::{Engine, ValidationConfig};
use valida_storage::{CourseRepository, IssueStore};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub opened: usize,
    pub resolved: usize,
    /// Course id and error text for every course that could not be checked.
    pub failures: Vec<(CourseId, String)>,
}

/// Whether the batch job should look at `course` at all.
pub fn is_batch_candidate(course: &Course, config: &ValidationConfig, site_course: CourseId) -> bool {
    course.visible && course.id != site_course && config.is_category_allowed(course.category)
}

/// Validates every eligible course and records the results in the issue
/// history. A failing course is logged and counted; the batch carries on.
pub fn validate_all_courses(
    repo: &dyn CourseRepository,
    store: &dyn IssueStore,
    config: &ValidationConfig,
    site_course: CourseId,
    now_unix: i64,
) -> Result<BatchSummary> {
    let engine = Engine::new();
    let mut summary = BatchSummary::default();

    for course in repo.list_courses()? {
        if !is_batch_candidate(&course, config, site_course) {
            summary.skipped += 1;
            continue;
        }

        let outcome = engine
            .run(repo, &course, config)
            .map_err(anyhow::Error::from)
            .and_then(|results| record_course_results(store, course.id, &results, now_unix));

        match outcome {
            Ok(h) => {
                summary.processed += 1;
                summary.opened += h.opened;
                summary.resolved += h.resolved;
            }
            Err(e) => {
                warn!(course_id = course.id.get(), shortname = %course.shortname, error = %format!("{e:#}"), "error validating course");
                summary.errors += 1;
                summary.failures.push((course.id, format!("{e:#}")));
            }
        }
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        errors = summary.errors,
        "validate all courses finished"
    );
    Ok(summary)
}
