use valida_core::{
    truncate_validation_name, CategoryWeight, CourseId, GradeCategory, GradeCategoryId, Issue, IssueFilter, IssueId,
    IssueState, MAX_VALIDATION_NAME_CHARS,
};

fn issue(id: i64, course: i64, validation: &str, resolved_at: Option<i64>) -> Issue {
    Issue {
        id: IssueId(id),
        course_id: CourseId(course),
        validation: validation.to_string(),
        state: if resolved_at.is_some() { IssueState::Resolved } else { IssueState::Open },
        first_seen: 10,
        last_seen: 20,
        resolved_at,
    }
}

#[test]
fn test_weight_override_selects_second_coefficient() {
    let w = CategoryWeight {
        aggregation_coef: 0.0,
        aggregation_coef2: 0.25,
        weight_override: true,
    };
    assert_eq!(w.effective(), 0.25);

    let w = CategoryWeight { weight_override: false, ..w };
    assert_eq!(w.effective(), 0.0);
}

#[test]
fn test_root_category_is_depth_one() {
    let root = GradeCategory {
        id: GradeCategoryId(1),
        name: "?".into(),
        depth: 1,
        weight: None,
    };
    let child = GradeCategory {
        id: GradeCategoryId(2),
        name: "Controles".into(),
        depth: 2,
        weight: None,
    };
    assert!(root.is_root());
    assert!(!child.is_root());
}

#[test]
fn test_issue_filter_open_only() {
    let open = issue(1, 5, "Fecha de inicio", None);
    let resolved = issue(2, 5, "Fecha de inicio", Some(30));
    let f = IssueFilter::open();
    assert!(f.matches(&open));
    assert!(!f.matches(&resolved));
    assert!(IssueFilter::all().matches(&resolved));
}

#[test]
fn test_issue_filter_by_course_and_validation() {
    let i = issue(1, 5, "Fecha de fin", None);
    let f = IssueFilter {
        open_only: false,
        course_id: Some(CourseId(6)),
        validation: None,
    };
    assert!(!f.matches(&i));
    let f = IssueFilter {
        open_only: false,
        course_id: Some(CourseId(5)),
        validation: Some("Fecha de fin".into()),
    };
    assert!(f.matches(&i));
}

#[test]
fn test_truncate_validation_name_respects_chars() {
    let long: String = "í".repeat(300);
    let t = truncate_validation_name(&long);
    assert_eq!(t.chars().count(), MAX_VALIDATION_NAME_CHARS);
    assert_eq!(truncate_validation_name("Fecha de inicio"), "Fecha de inicio");
}
