//! Aggregations over the issue history, plus CSV/JSON export.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use serde::Serialize;
use valida_core::{Course, CourseId, Issue, IssueFilter, IssueState};
use valida_rules::rules::format_timestamp;
use valida_storage::{CourseRepository, IssueStore};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueRow {
    pub id: i64,
    pub course_id: CourseId,
    pub shortname: String,
    pub fullname: String,
    pub validation: String,
    pub state: IssueState,
    pub first_seen: i64,
    pub last_seen: i64,
    pub resolved_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Overview {
    /// Courses with at least one history row.
    pub courses_validated: usize,
    pub courses_with_issues: usize,
    pub courses_ok: usize,
    pub open_issues: usize,
    /// Percentage of validated courses without open issues.
    pub compliance_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationCount {
    pub validation: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CourseIssues {
    pub course_id: CourseId,
    pub shortname: String,
    pub fullname: String,
    pub open_issues: usize,
    pub validations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OkCourse {
    pub course_id: CourseId,
    pub shortname: String,
    pub fullname: String,
    pub last_seen: i64,
}

fn course_names(repo: &dyn CourseRepository) -> Result<HashMap<CourseId, Course>> {
    Ok(repo.list_courses()?.into_iter().map(|c| (c.id, c)).collect())
}

fn names_of(courses: &HashMap<CourseId, Course>, id: CourseId) -> (String, String) {
    courses
        .get(&id)
        .map(|c| (c.shortname.clone(), c.fullname.clone()))
        .unwrap_or_default()
}

/// Issues matching `filter`, newest first, with course names attached.
pub fn issue_listing(repo: &dyn CourseRepository, store: &dyn IssueStore, filter: &IssueFilter) -> Result<Vec<IssueRow>> {
    let courses = course_names(repo)?;
    let rows = store
        .list_issues(filter)?
        .into_iter()
        .map(|i| {
            let (shortname, fullname) = names_of(&courses, i.course_id);
            IssueRow {
                id: i.id.get(),
                course_id: i.course_id,
                shortname,
                fullname,
                validation: i.validation,
                state: i.state,
                first_seen: i.first_seen,
                last_seen: i.last_seen,
                resolved_at: i.resolved_at,
            }
        })
        .collect();
    Ok(rows)
}

fn open_by_course(issues: &[Issue]) -> BTreeMap<CourseId, Vec<&Issue>> {
    let mut by_course: BTreeMap<CourseId, Vec<&Issue>> = BTreeMap::new();
    for i in issues.iter().filter(|i| i.is_open()) {
        by_course.entry(i.course_id).or_default().push(i);
    }
    by_course
}

pub fn overview(store: &dyn IssueStore) -> Result<Overview> {
    let all = store.list_issues(&IssueFilter::all())?;
    let validated: std::collections::BTreeSet<CourseId> = all.iter().map(|i| i.course_id).collect();
    let with_issues = open_by_course(&all).len();
    let open_issues = all.iter().filter(|i| i.is_open()).count();
    let courses_ok = validated.len() - with_issues;
    let compliance_rate = if validated.is_empty() {
        0.0
    } else {
        courses_ok as f64 * 100.0 / validated.len() as f64
    };
    Ok(Overview {
        courses_validated: validated.len(),
        courses_with_issues: with_issues,
        courses_ok,
        open_issues,
        compliance_rate,
    })
}

/// Open issue counts per check, most frequent first.
pub fn issues_by_validation(store: &dyn IssueStore) -> Result<Vec<ValidationCount>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for i in store.list_issues(&IssueFilter::open())? {
        *counts.entry(i.validation).or_default() += 1;
    }
    let mut out: Vec<ValidationCount> = counts
        .into_iter()
        .map(|(validation, count)| ValidationCount { validation, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.validation.cmp(&b.validation)));
    Ok(out)
}

/// Courses with open issues, most issues first, each with its failing checks.
pub fn courses_with_issues(repo: &dyn CourseRepository, store: &dyn IssueStore) -> Result<Vec<CourseIssues>> {
    let courses = course_names(repo)?;
    let open = store.list_issues(&IssueFilter::open())?;
    let mut out: Vec<CourseIssues> = open_by_course(&open)
        .into_iter()
        .map(|(course_id, issues)| {
            let (shortname, fullname) = names_of(&courses, course_id);
            let mut validations: Vec<String> = issues.iter().map(|i| i.validation.clone()).collect();
            validations.sort();
            CourseIssues {
                course_id,
                shortname,
                fullname,
                open_issues: issues.len(),
                validations,
            }
        })
        .collect();
    out.sort_by(|a, b| b.open_issues.cmp(&a.open_issues).then(a.course_id.cmp(&b.course_id)));
    Ok(out)
}

pub fn top_courses(repo: &dyn CourseRepository, store: &dyn IssueStore, limit: usize) -> Result<Vec<CourseIssues>> {
    let mut all = courses_with_issues(repo, store)?;
    all.truncate(limit);
    Ok(all)
}

/// Validated courses with no open issue, most recently checked first.
pub fn ok_courses(repo: &dyn CourseRepository, store: &dyn IssueStore) -> Result<Vec<OkCourse>> {
    let courses = course_names(repo)?;
    let all = store.list_issues(&IssueFilter::all())?;
    let open = open_by_course(&all);

    let mut last_seen: BTreeMap<CourseId, i64> = BTreeMap::new();
    for i in &all {
        let seen = last_seen.entry(i.course_id).or_insert(i.last_seen);
        *seen = (*seen).max(i.last_seen).max(i.resolved_at.unwrap_or(0));
    }

    let mut out: Vec<OkCourse> = last_seen
        .into_iter()
        .filter(|(id, _)| !open.contains_key(id))
        .map(|(course_id, last_seen)| {
            let (shortname, fullname) = names_of(&courses, course_id);
            OkCourse {
                course_id,
                shortname,
                fullname,
                last_seen,
            }
        })
        .collect();
    out.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.course_id.cmp(&b.course_id)));
    Ok(out)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// RFC 4180 CSV of an issue listing, dates as `dd/mm/yyyy hh:mm` UTC.
pub fn issues_to_csv(rows: &[IssueRow]) -> String {
    let header = ["id", "courseid", "shortname", "course", "validation", "state", "firstseen", "lastseen", "resolvedat"];
    let mut out = csv_line(&header.map(String::from));
    for r in rows {
        out.push_str(&csv_line(&[
            r.id.to_string(),
            r.course_id.to_string(),
            r.shortname.clone(),
            r.fullname.clone(),
            r.validation.clone(),
            match r.state {
                IssueState::Open => "open".to_string(),
                IssueState::Resolved => "resolved".to_string(),
            },
            format_timestamp(r.first_seen),
            format_timestamp(r.last_seen),
            r.resolved_at.map(format_timestamp).unwrap_or_default(),
        ]));
    }
    out
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use valida_core::{CategoryId, IssueChange, IssueId};
    use valida_storage::{CourseData, InMemoryStorage};

    fn course(id: i64, fullname: &str) -> Course {
        Course {
            id: CourseId(id),
            category: CategoryId(3),
            shortname: format!("C{id}"),
            fullname: fullname.into(),
            visible: true,
            start_date: 0,
            end_date: 0,
            enable_completion: false,
            show_completion_conditions: false,
            show_activity_dates: false,
        }
    }

    fn open(store: &InMemoryStorage, course: i64, names: &[&str], now: i64) {
        let changes: Vec<IssueChange> = names
            .iter()
            .map(|n| IssueChange::Open { validation: n.to_string() })
            .collect();
        store.apply_changes(CourseId(course), &changes, now).unwrap();
    }

    fn seeded() -> InMemoryStorage {
        let store = InMemoryStorage::new();
        store.insert_course(CourseData::new(course(2, "Álgebra, grupo \"A\"")));
        store.insert_course(CourseData::new(course(3, "Cálculo")));
        store.insert_course(CourseData::new(course(4, "Física")));
        open(&store, 2, &["Controles", "Fecha de fin"], 100);
        open(&store, 3, &["Controles"], 200);
        open(&store, 4, &["Fecha de fin"], 50);
        // Course 4 resolves its only issue.
        let id = store.open_issues(CourseId(4)).unwrap()[0].id;
        store.apply_changes(CourseId(4), &[IssueChange::Resolve { issue_id: id }], 300).unwrap();
        store
    }

    #[test]
    fn test_overview_counts_compliance() {
        let store = seeded();
        let o = overview(&store).unwrap();
        assert_eq!(o.courses_validated, 3);
        assert_eq!(o.courses_with_issues, 2);
        assert_eq!(o.courses_ok, 1);
        assert_eq!(o.open_issues, 3);
        assert!((o.compliance_rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_history_has_zero_rate() {
        let o = overview(&InMemoryStorage::new()).unwrap();
        assert_eq!(o.courses_validated, 0);
        assert_eq!(o.compliance_rate, 0.0);
    }

    #[test]
    fn test_groups_by_validation_and_course() {
        let store = seeded();
        let by_validation = issues_by_validation(&store).unwrap();
        assert_eq!(by_validation[0], ValidationCount { validation: "Controles".into(), count: 2 });
        assert_eq!(by_validation[1].count, 1);

        let courses = courses_with_issues(&store, &store).unwrap();
        assert_eq!(courses[0].course_id, CourseId(2));
        assert_eq!(courses[0].validations, vec!["Controles", "Fecha de fin"]);
        assert_eq!(top_courses(&store, &store, 1).unwrap().len(), 1);

        let ok = ok_courses(&store, &store).unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].fullname, "Física");
        assert_eq!(ok[0].last_seen, 300);
    }

    #[test]
    fn test_listing_respects_filter() {
        let store = seeded();
        let all = issue_listing(&store, &store, &IssueFilter::all()).unwrap();
        assert_eq!(all.len(), 4);
        let open = issue_listing(&store, &store, &IssueFilter::open()).unwrap();
        assert_eq!(open.len(), 3);
        assert_eq!(open[0].course_id, CourseId(3));
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let rows = vec![IssueRow {
            id: IssueId(1).get(),
            course_id: CourseId(2),
            shortname: "C2".into(),
            fullname: "Álgebra, grupo \"A\"".into(),
            validation: "Controles".into(),
            state: IssueState::Open,
            first_seen: 1_700_000_000,
            last_seen: 1_700_000_000,
            resolved_at: None,
        }];
        let csv = issues_to_csv(&rows);
        let lines: Vec<&str> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "id,courseid,shortname,course,validation,state,firstseen,lastseen,resolvedat");
        assert_eq!(
            lines[1],
            "1,2,C2,\"Álgebra, grupo \"\"A\"\"\",Controles,open,14/11/2023 22:13,14/11/2023 22:13,"
        );
    }

    #[test]
    fn test_json_export_is_an_array() {
        let store = seeded();
        let rows = issue_listing(&store, &store, &IssueFilter::open()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&to_json(&rows).unwrap()).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 3);
        assert_eq!(v[0]["state"], "open");
    }
}
