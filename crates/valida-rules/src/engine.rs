use valida_core::{CheckResult, Course};
use valida_storage::CourseRepository;

use crate::config::ValidationConfig;
use crate::error::EngineError;
use crate::facts::CourseFacts;
use crate::rule::{Rule, RuleContext};
use crate::rules::*;

/// The checklist in report order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    let [news, students, tutoring] = required_forums();
    vec![
        Box::new(DateMatchRule::start()),
        Box::new(DateMatchRule::end()),
        Box::new(ForumRule::new(news)),
        Box::new(ForumRule::new(students)),
        Box::new(ForumRule::new(tutoring)),
        Box::new(SyllabusRule),
        Box::new(TutoringRule),
        Box::new(ScheduleRule::gradable_activities()),
        Box::new(ScheduleRule::live_sessions()),
        Box::new(GradebookCategoriesRule),
        Box::new(CategorizedActivitiesRule),
        Box::new(MarkingWorkflowRule),
        Box::new(CourseCompletionRule),
        Box::new(ActivityCompletionRule),
        Box::new(FlagRule::completion_conditions()),
        Box::new(FlagRule::activity_dates()),
    ]
}

pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Loads the course facts and evaluates every rule.
    pub fn run(
        &self,
        repo: &dyn CourseRepository,
        course: &Course,
        config: &ValidationConfig,
    ) -> Result<Vec<CheckResult>, EngineError> {
        let facts = CourseFacts::load(repo, course)?;
        Ok(self.evaluate(course, config, &facts))
    }

    /// Pure part of [`Engine::run`]: rules that do not apply are skipped.
    pub fn evaluate(&self, course: &Course, config: &ValidationConfig, facts: &CourseFacts) -> Vec<CheckResult> {
        let ctx = RuleContext { course, config, facts };
        self.rules.iter().filter_map(|rule| rule.eval(&ctx)).collect()
    }
}

/// Runs the default checklist against one course.
pub fn validate(
    repo: &dyn CourseRepository,
    course: &Course,
    config: &ValidationConfig,
) -> Result<Vec<CheckResult>, EngineError> {
    Engine::new().run(repo, course, config)
}
