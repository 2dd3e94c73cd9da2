use valida_core::{
    Assignment, Course, CourseId, CourseModule, Forum, GradeCategory, GradeItem, Issue, IssueChange, IssueFilter,
    Label, ModuleType, SectionId, UrlResource,
};

/// Read-only access to the course data the checks inspect. Every method is
/// keyed by course so implementations can issue one narrow query each.
pub trait CourseRepository: Send + Sync {
    /// Visible and hidden courses, ordered by id.
    fn list_courses(&self) -> anyhow::Result<Vec<Course>>;
    fn course(&self, course_id: CourseId) -> anyhow::Result<Option<Course>>;

    fn section_zero(&self, course_id: CourseId) -> anyhow::Result<Option<SectionId>>;
    /// Looks up an installed module type (`forum`, `label`, ...) by name.
    fn module_type(&self, name: &str) -> anyhow::Result<Option<ModuleType>>;
    fn course_modules(&self, course_id: CourseId) -> anyhow::Result<Vec<CourseModule>>;

    fn forums(&self, course_id: CourseId) -> anyhow::Result<Vec<Forum>>;
    fn urls(&self, course_id: CourseId) -> anyhow::Result<Vec<UrlResource>>;
    fn labels(&self, course_id: CourseId) -> anyhow::Result<Vec<Label>>;

    fn grade_categories(&self, course_id: CourseId) -> anyhow::Result<Vec<GradeCategory>>;
    fn grade_items(&self, course_id: CourseId) -> anyhow::Result<Vec<GradeItem>>;
    fn assignments(&self, course_id: CourseId) -> anyhow::Result<Vec<Assignment>>;
}

/// Persistence for the open/resolved issue history.
pub trait IssueStore: Send + Sync {
    /// Issues of one course whose `resolved_at` is unset.
    fn open_issues(&self, course_id: CourseId) -> anyhow::Result<Vec<Issue>>;

    /// Applies a planned set of transitions for one course atomically.
    fn apply_changes(&self, course_id: CourseId, changes: &[IssueChange], now_unix: i64) -> anyhow::Result<()>;

    /// Issues matching `filter`, most recently seen first.
    fn list_issues(&self, filter: &IssueFilter) -> anyhow::Result<Vec<Issue>>;
}
