use serde::{Deserialize, Serialize};

use crate::{ids::*, model::*};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub category: CategoryId,
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Unix timestamp, 0 when unset.
    #[serde(default)]
    pub start_date: i64,
    #[serde(default)]
    pub end_date: i64,
    #[serde(default)]
    pub enable_completion: bool,
    #[serde(default)]
    pub show_completion_conditions: bool,
    #[serde(default)]
    pub show_activity_dates: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleType {
    pub id: ModuleTypeId,
    pub name: String,
}

/// Placement of one activity/resource instance inside a course.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: CourseModuleId,
    pub module: ModuleTypeId,
    pub instance: InstanceId,
    pub section: SectionId,
    #[serde(default)]
    pub completion: CompletionTracking,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    pub id: InstanceId,
    pub name: String,
    #[serde(rename = "type")]
    pub forum_type: ForumType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResource {
    pub id: InstanceId,
    pub name: String,
    pub external_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: InstanceId,
    /// Rich-text HTML body.
    pub intro: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    #[serde(default)]
    pub aggregation_coef: f64,
    #[serde(default)]
    pub aggregation_coef2: f64,
    #[serde(default)]
    pub weight_override: bool,
}

impl CategoryWeight {
    /// The stored weight field that is authoritative for this category.
    pub fn effective(&self) -> f64 {
        if self.weight_override {
            self.aggregation_coef2
        } else {
            self.aggregation_coef
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeCategory {
    pub id: GradeCategoryId,
    pub name: String,
    /// 1 for the course root ("uncategorised") category.
    pub depth: i64,
    #[serde(default)]
    pub weight: Option<CategoryWeight>,
}

impl GradeCategory {
    pub fn is_root(&self) -> bool {
        self.depth <= 1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradeItem {
    pub id: GradeItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category_id: Option<GradeCategoryId>,
    pub item_type: GradeItemType,
    /// Module type name (`assign`, `quiz`, ...) for `mod` items.
    #[serde(default)]
    pub item_module: Option<String>,
    #[serde(default)]
    pub item_instance: Option<InstanceId>,
}

impl GradeItem {
    pub fn is_module_item(&self) -> bool {
        self.item_type == GradeItemType::Mod
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: InstanceId,
    pub name: String,
    #[serde(default)]
    pub marking_workflow: bool,
}

/// One persisted open/resolved history row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub course_id: CourseId,
    pub validation: String,
    pub state: IssueState,
    pub first_seen: i64,
    pub last_seen: i64,
    pub resolved_at: Option<i64>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}
