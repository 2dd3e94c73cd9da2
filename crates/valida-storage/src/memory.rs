use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use valida_core::{
    Assignment, Course, CourseId, CourseModule, Forum, GradeCategory, GradeItem, Issue, IssueChange, IssueFilter,
    IssueId, IssueState, Label, ModuleType, ModuleTypeId, SectionId, UrlResource,
};

use crate::traits::{CourseRepository, IssueStore};

/// Module types the checks look up by name.
pub const STANDARD_MODULE_TYPES: [&str; 4] = ["assign", "forum", "label", "url"];

/// Everything stored for one course.
#[derive(Clone, Debug)]
pub struct CourseData {
    pub course: Course,
    pub section_zero: Option<SectionId>,
    pub modules: Vec<CourseModule>,
    pub forums: Vec<Forum>,
    pub urls: Vec<UrlResource>,
    pub labels: Vec<Label>,
    pub grade_categories: Vec<GradeCategory>,
    pub grade_items: Vec<GradeItem>,
    pub assignments: Vec<Assignment>,
}

impl CourseData {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            section_zero: None,
            modules: vec![],
            forums: vec![],
            urls: vec![],
            labels: vec![],
            grade_categories: vec![],
            grade_items: vec![],
            assignments: vec![],
        }
    }
}

/// In-memory storage for tests and snapshot checks. Not durable.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    module_types: Vec<ModuleType>,
    courses: BTreeMap<CourseId, CourseData>,
    issues: Vec<Issue>,
    next_issue_id: i64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage with `assign`, `forum`, `label` and `url` already installed.
    pub fn with_standard_modules() -> Self {
        let s = Self::new();
        for name in STANDARD_MODULE_TYPES {
            s.add_module_type(name);
        }
        s
    }

    /// Registers a module type, returning the existing id when already known.
    pub fn add_module_type(&self, name: &str) -> ModuleTypeId {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner.module_types.iter().find(|m| m.name == name) {
            return m.id;
        }
        let id = ModuleTypeId(inner.module_types.len() as i64 + 1);
        inner.module_types.push(ModuleType { id, name: name.to_string() });
        id
    }

    pub fn module_type_id(&self, name: &str) -> Option<ModuleTypeId> {
        let inner = self.inner.lock().unwrap();
        inner.module_types.iter().find(|m| m.name == name).map(|m| m.id)
    }

    pub fn insert_course(&self, data: CourseData) {
        let mut inner = self.inner.lock().unwrap();
        inner.courses.insert(data.course.id, data);
    }

    fn with_course<T>(&self, course_id: CourseId, f: impl FnOnce(&CourseData) -> Vec<T>) -> Vec<T> {
        let inner = self.inner.lock().unwrap();
        inner.courses.get(&course_id).map(f).unwrap_or_default()
    }
}

impl CourseRepository for InMemoryStorage {
    fn list_courses(&self) -> anyhow::Result<Vec<Course>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.courses.values().map(|d| d.course.clone()).collect())
    }

    fn course(&self, course_id: CourseId) -> anyhow::Result<Option<Course>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.courses.get(&course_id).map(|d| d.course.clone()))
    }

    fn section_zero(&self, course_id: CourseId) -> anyhow::Result<Option<SectionId>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.courses.get(&course_id).and_then(|d| d.section_zero))
    }

    fn module_type(&self, name: &str) -> anyhow::Result<Option<ModuleType>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.module_types.iter().find(|m| m.name == name).cloned())
    }

    fn course_modules(&self, course_id: CourseId) -> anyhow::Result<Vec<CourseModule>> {
        Ok(self.with_course(course_id, |d| d.modules.clone()))
    }

    fn forums(&self, course_id: CourseId) -> anyhow::Result<Vec<Forum>> {
        Ok(self.with_course(course_id, |d| d.forums.clone()))
    }

    fn urls(&self, course_id: CourseId) -> anyhow::Result<Vec<UrlResource>> {
        Ok(self.with_course(course_id, |d| d.urls.clone()))
    }

    fn labels(&self, course_id: CourseId) -> anyhow::Result<Vec<Label>> {
        Ok(self.with_course(course_id, |d| d.labels.clone()))
    }

    fn grade_categories(&self, course_id: CourseId) -> anyhow::Result<Vec<GradeCategory>> {
        Ok(self.with_course(course_id, |d| d.grade_categories.clone()))
    }

    fn grade_items(&self, course_id: CourseId) -> anyhow::Result<Vec<GradeItem>> {
        Ok(self.with_course(course_id, |d| d.grade_items.clone()))
    }

    fn assignments(&self, course_id: CourseId) -> anyhow::Result<Vec<Assignment>> {
        Ok(self.with_course(course_id, |d| d.assignments.clone()))
    }
}

impl IssueStore for InMemoryStorage {
    fn open_issues(&self, course_id: CourseId) -> anyhow::Result<Vec<Issue>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .issues
            .iter()
            .filter(|i| i.course_id == course_id && i.is_open())
            .cloned()
            .collect())
    }

    fn apply_changes(&self, course_id: CourseId, changes: &[IssueChange], now_unix: i64) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        // Work on a copy so a rejected change leaves the history untouched.
        let mut issues = inner.issues.clone();
        let mut next_id = inner.next_issue_id;

        for change in changes {
            match change {
                IssueChange::Open { validation } => {
                    if issues
                        .iter()
                        .any(|i| i.course_id == course_id && i.is_open() && &i.validation == validation)
                    {
                        bail!("open issue already exists for course {} / {}", course_id, validation);
                    }
                    next_id += 1;
                    issues.push(Issue {
                        id: IssueId(next_id),
                        course_id,
                        validation: validation.clone(),
                        state: IssueState::Open,
                        first_seen: now_unix,
                        last_seen: now_unix,
                        resolved_at: None,
                    });
                }
                IssueChange::Refresh { issue_id } => {
                    let issue = find_open(&mut issues, course_id, *issue_id)?;
                    issue.last_seen = now_unix;
                }
                IssueChange::Resolve { issue_id } => {
                    let issue = find_open(&mut issues, course_id, *issue_id)?;
                    issue.state = IssueState::Resolved;
                    issue.resolved_at = Some(now_unix);
                }
            }
        }

        inner.issues = issues;
        inner.next_issue_id = next_id;
        Ok(())
    }

    fn list_issues(&self, filter: &IssueFilter) -> anyhow::Result<Vec<Issue>> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<Issue> = inner.issues.iter().filter(|i| filter.matches(i)).cloned().collect();
        out.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(b.id.cmp(&a.id)));
        Ok(out)
    }
}

fn find_open(issues: &mut [Issue], course_id: CourseId, issue_id: IssueId) -> anyhow::Result<&mut Issue> {
    issues
        .iter_mut()
        .find(|i| i.id == issue_id && i.course_id == course_id && i.is_open())
        .ok_or_else(|| anyhow!("no open issue {} for course {}", issue_id, course_id))
}
