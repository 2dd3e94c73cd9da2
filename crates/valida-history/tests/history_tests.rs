use valida_core::{CheckResult, CourseId, IssueFilter, IssueState};
use valida_history::{record_course_results, HistorySummary};
use valida_storage::{InMemoryStorage, IssueStore};

fn result(name: &str, passed: bool) -> CheckResult {
    CheckResult::new(name, passed, "")
}

#[test]
fn test_repeated_failures_keep_one_open_issue() {
    let store = InMemoryStorage::new();
    let c = CourseId(2);
    let run = vec![result("Fecha de fin", false), result("Controles", true)];

    let first = record_course_results(&store, c, &run, 100).unwrap();
    assert_eq!(
        first,
        HistorySummary {
            opened: 1,
            refreshed: 0,
            resolved: 0
        }
    );
    let second = record_course_results(&store, c, &run, 200).unwrap();
    assert_eq!(second.refreshed, 1);

    let open = store.open_issues(c).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].first_seen, 100);
    assert_eq!(open[0].last_seen, 200);
}

#[test]
fn test_refailure_after_resolution_opens_a_new_row() {
    let store = InMemoryStorage::new();
    let c = CourseId(2);

    record_course_results(&store, c, &[result("Tablón de anuncios", false)], 100).unwrap();
    let s = record_course_results(&store, c, &[result("Tablón de anuncios", true)], 200).unwrap();
    assert_eq!(s.resolved, 1);
    assert!(store.open_issues(c).unwrap().is_empty());

    record_course_results(&store, c, &[result("Tablón de anuncios", false)], 300).unwrap();
    let all = store.list_issues(&IssueFilter::all()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].first_seen, 300);
    assert_eq!(all[0].state, IssueState::Open);
    assert_eq!(all[1].resolved_at, Some(200));
}

#[test]
fn test_absent_checks_leave_open_issues_alone() {
    let store = InMemoryStorage::new();
    let c = CourseId(2);
    record_course_results(&store, c, &[result("Flujo de trabajo en tareas", false)], 100).unwrap();

    let s = record_course_results(&store, c, &[result("Fecha de inicio", true)], 200).unwrap();
    assert_eq!(s, HistorySummary::default());
    let open = store.open_issues(c).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].last_seen, 100);
}

#[test]
fn test_courses_are_tracked_independently() {
    let store = InMemoryStorage::new();
    record_course_results(&store, CourseId(2), &[result("A", false)], 100).unwrap();
    record_course_results(&store, CourseId(3), &[result("A", true)], 100).unwrap();
    assert_eq!(store.open_issues(CourseId(2)).unwrap().len(), 1);
    assert!(store.open_issues(CourseId(3)).unwrap().is_empty());
}
