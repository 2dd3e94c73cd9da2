use std::collections::HashMap;

use valida_core::{
    Assignment, Course, CourseModule, Forum, GradeCategory, GradeItem, InstanceId, Label, ModuleTypeId, SectionId,
    UrlResource,
};
use valida_storage::CourseRepository;

use crate::error::EngineError;

pub const FORUM_MODULE: &str = "forum";
pub const LABEL_MODULE: &str = "label";
pub const URL_MODULE: &str = "url";
pub const ASSIGN_MODULE: &str = "assign";

/// Everything the checks read about one course, fetched up front so the
/// rules themselves stay pure.
#[derive(Clone, Debug)]
pub struct CourseFacts {
    pub section_zero: Option<SectionId>,
    pub forum_type: ModuleTypeId,
    pub label_type: ModuleTypeId,
    pub url_type: Option<ModuleTypeId>,
    pub assign_type: Option<ModuleTypeId>,
    /// Module types referenced by `mod` grade items, keyed by name.
    pub item_module_types: HashMap<String, ModuleTypeId>,
    pub modules: Vec<CourseModule>,
    pub forums: Vec<Forum>,
    pub urls: Vec<UrlResource>,
    pub labels: Vec<Label>,
    pub grade_categories: Vec<GradeCategory>,
    pub grade_items: Vec<GradeItem>,
    pub assignments: Vec<Assignment>,
}

impl CourseFacts {
    /// Reads the course facts. Fails only when the repository errors or the
    /// `forum`/`label` module types are missing from the host schema.
    pub fn load(repo: &dyn CourseRepository, course: &Course) -> Result<Self, EngineError> {
        let id = course.id;
        let section_zero = repo.section_zero(id).map_err(EngineError::Repository)?;

        let forum_type = required_module_type(repo, FORUM_MODULE)?;
        let label_type = required_module_type(repo, LABEL_MODULE)?;
        let url_type = optional_module_type(repo, URL_MODULE)?;
        let assign_type = optional_module_type(repo, ASSIGN_MODULE)?;

        let grade_items = repo.grade_items(id).map_err(EngineError::Repository)?;
        let mut item_module_types = HashMap::new();
        for name in grade_items.iter().filter_map(|i| i.item_module.as_deref()) {
            if item_module_types.contains_key(name) {
                continue;
            }
            if let Some(t) = optional_module_type(repo, name)? {
                item_module_types.insert(name.to_string(), t);
            }
        }

        Ok(Self {
            section_zero,
            forum_type,
            label_type,
            url_type,
            assign_type,
            item_module_types,
            modules: repo.course_modules(id).map_err(EngineError::Repository)?,
            forums: repo.forums(id).map_err(EngineError::Repository)?,
            urls: repo.urls(id).map_err(EngineError::Repository)?,
            labels: repo.labels(id).map_err(EngineError::Repository)?,
            grade_categories: repo.grade_categories(id).map_err(EngineError::Repository)?,
            grade_items,
            assignments: repo.assignments(id).map_err(EngineError::Repository)?,
        })
    }

    pub fn in_section_zero(&self, cm: &CourseModule) -> bool {
        self.section_zero == Some(cm.section)
    }

    /// The course module placing `instance` of the given type, if any.
    pub fn module_for(&self, module: ModuleTypeId, instance: InstanceId) -> Option<&CourseModule> {
        self.modules.iter().find(|cm| cm.module == module && cm.instance == instance)
    }

    pub fn module_for_item(&self, item: &GradeItem) -> Option<&CourseModule> {
        let module = self.item_module_types.get(item.item_module.as_deref()?)?;
        self.module_for(*module, item.item_instance?)
    }

    /// Section-0 placements of `module` paired with their instance record,
    /// in course-module order. Placements without a record are skipped.
    pub fn section_zero_instances<'a, T>(
        &'a self,
        module: ModuleTypeId,
        records: &'a [T],
        id_of: impl Fn(&T) -> InstanceId,
    ) -> Vec<(&'a CourseModule, &'a T)> {
        self.modules
            .iter()
            .filter(|cm| cm.module == module && self.in_section_zero(cm))
            .filter_map(|cm| records.iter().find(|r| id_of(*r) == cm.instance).map(|r| (cm, r)))
            .collect()
    }

    pub fn section_zero_labels(&self) -> Vec<(&CourseModule, &Label)> {
        self.section_zero_instances(self.label_type, &self.labels, |l| l.id)
    }

    pub fn section_zero_urls(&self) -> Vec<(&CourseModule, &UrlResource)> {
        match self.url_type {
            Some(t) => self.section_zero_instances(t, &self.urls, |u| u.id),
            None => vec![],
        }
    }

    pub fn module_grade_items(&self) -> Vec<&GradeItem> {
        self.grade_items.iter().filter(|i| i.is_module_item()).collect()
    }
}

fn required_module_type(repo: &dyn CourseRepository, name: &str) -> Result<ModuleTypeId, EngineError> {
    optional_module_type(repo, name)?.ok_or_else(|| EngineError::MissingModuleType(name.to_string()))
}

fn optional_module_type(repo: &dyn CourseRepository, name: &str) -> Result<Option<ModuleTypeId>, EngineError> {
    Ok(repo.module_type(name).map_err(EngineError::Repository)?.map(|m| m.id))
}
