use std::collections::HashMap;

use valida_core::*;

use crate::config::ValidationConfig;
use crate::facts::CourseFacts;
use crate::rule::{Rule, RuleContext};

pub const FORUM: ModuleTypeId = ModuleTypeId(1);
pub const LABEL: ModuleTypeId = ModuleTypeId(2);
pub const URL: ModuleTypeId = ModuleTypeId(3);
pub const ASSIGN: ModuleTypeId = ModuleTypeId(4);
pub const QUIZ: ModuleTypeId = ModuleTypeId(5);

pub const SECTION0: SectionId = SectionId(10);
pub const SECTION1: SectionId = SectionId(11);

pub fn course() -> Course {
    Course {
        id: CourseId(2),
        category: CategoryId(3),
        shortname: "MAT101".into(),
        fullname: "Matemáticas I".into(),
        visible: true,
        start_date: 0,
        end_date: 0,
        enable_completion: false,
        show_completion_conditions: false,
        show_activity_dates: false,
    }
}

pub fn facts() -> CourseFacts {
    CourseFacts {
        section_zero: Some(SECTION0),
        forum_type: FORUM,
        label_type: LABEL,
        url_type: Some(URL),
        assign_type: Some(ASSIGN),
        item_module_types: HashMap::from([("assign".to_string(), ASSIGN), ("quiz".to_string(), QUIZ)]),
        modules: vec![],
        forums: vec![],
        urls: vec![],
        labels: vec![],
        grade_categories: vec![],
        grade_items: vec![],
        assignments: vec![],
    }
}

pub fn place(facts: &mut CourseFacts, cm: i64, module: ModuleTypeId, instance: i64, section: SectionId) {
    facts.modules.push(CourseModule {
        id: CourseModuleId(cm),
        module,
        instance: InstanceId(instance),
        section,
        completion: CompletionTracking::None,
    });
}

pub fn add_forum(facts: &mut CourseFacts, id: i64, name: &str, forum_type: ForumType, section: SectionId) {
    facts.forums.push(Forum {
        id: InstanceId(id),
        name: name.into(),
        forum_type,
    });
    place(facts, 100 + id, FORUM, id, section);
}

pub fn add_label(facts: &mut CourseFacts, id: i64, html: &str) {
    facts.labels.push(Label {
        id: InstanceId(id),
        intro: html.into(),
    });
    place(facts, 200 + id, LABEL, id, SECTION0);
}

pub fn add_url(facts: &mut CourseFacts, id: i64, name: &str, target: &str) {
    facts.urls.push(UrlResource {
        id: InstanceId(id),
        name: name.into(),
        external_url: target.into(),
    });
    place(facts, 300 + id, URL, id, SECTION0);
}

pub fn eval_with(rule: &dyn Rule, course: &Course, config: &ValidationConfig, facts: &CourseFacts) -> Option<CheckResult> {
    let ctx = RuleContext { course, config, facts };
    let res = rule.eval(&ctx);
    if let Some(r) = &res {
        assert_eq!(r.name, rule.name());
    }
    res
}

pub fn eval(rule: &dyn Rule, course: &Course, facts: &CourseFacts) -> Option<CheckResult> {
    let config = ValidationConfig {
        site_url: "https://campus.test".into(),
        ..ValidationConfig::default()
    };
    eval_with(rule, course, &config, facts)
}

pub const TUTORING_HTML: &str = "<p><strong>Profesor:</strong> Ana Ruiz</p>\
    <p>Correo electrónico: ana@udima.es</p><p>Teléfono: 918 000 000</p>\
    <p>Extensión: 123</p><p>Horario de tutorías: lunes 10-12</p>";
