use valida_core::{CheckResult, Course, CourseModuleId};

use crate::config::ValidationConfig;
use crate::facts::CourseFacts;
use crate::text::escape_html;

/// Inputs every rule sees for one course.
pub struct RuleContext<'a> {
    pub course: &'a Course,
    pub config: &'a ValidationConfig,
    pub facts: &'a CourseFacts,
}

impl RuleContext<'_> {
    fn site(&self) -> &str {
        self.config.site_url.trim_end_matches('/')
    }

    /// Link to the settings page of a course module.
    pub fn edit_link(&self, cm: CourseModuleId, text: &str) -> String {
        format!(
            "<a href=\"{}/course/modedit.php?update={}\" target=\"_blank\">{}</a>",
            self.site(),
            cm,
            escape_html(text)
        )
    }

    pub fn url_view_link(&self, cm: CourseModuleId) -> String {
        format!("{}/mod/url/view.php?id={}", self.site(), cm)
    }
}

/// One checklist item. Returns `None` when the item does not apply to the
/// course (e.g. assignment checks on a course without assignments).
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;
    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult>;
}
