use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use valida_core::{
    Assignment, CompletionTracking, Course, CourseModule, CourseModuleId, Forum, GradeCategory, GradeItem, InstanceId,
    Label, SectionId, UrlResource,
};

use crate::memory::{CourseData, InMemoryStorage};

/// A course and its facts as written by hand or exported from a campus,
/// with module placements referring to module types by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub course: Course,
    #[serde(default)]
    pub section_zero: Option<SectionId>,
    #[serde(default)]
    pub modules: Vec<ModulePlacement>,
    #[serde(default)]
    pub forums: Vec<Forum>,
    #[serde(default)]
    pub urls: Vec<UrlResource>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub grade_categories: Vec<GradeCategory>,
    #[serde(default)]
    pub grade_items: Vec<GradeItem>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModulePlacement {
    pub id: CourseModuleId,
    /// Module type name, e.g. `forum`.
    pub module: String,
    pub instance: InstanceId,
    pub section: SectionId,
    #[serde(default)]
    pub completion: CompletionTracking,
}

pub fn load_course_snapshot(path: &Path) -> Result<CourseSnapshot> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read course snapshot: {}", path.display()))?;
    let snap: CourseSnapshot = serde_yaml::from_str(&s).with_context(|| format!("parse course snapshot yaml: {}", path.display()))?;
    validate_snapshot(&snap)?;
    Ok(snap)
}

pub fn validate_snapshot(snap: &CourseSnapshot) -> Result<()> {
    if snap.course.id.get() <= 0 {
        return Err(anyhow!("course snapshot must carry a positive course id"));
    }
    let mut seen = std::collections::HashSet::new();
    for m in &snap.modules {
        if !seen.insert(m.id) {
            return Err(anyhow!("duplicate course module id {} in snapshot", m.id));
        }
        if m.module.trim().is_empty() {
            return Err(anyhow!("course module {} has no module type", m.id));
        }
    }
    Ok(())
}

impl InMemoryStorage {
    /// Adds a snapshot course, registering any module type it mentions.
    pub fn insert_snapshot(&self, snap: &CourseSnapshot) {
        let modules = snap
            .modules
            .iter()
            .map(|m| CourseModule {
                id: m.id,
                module: self.add_module_type(&m.module),
                instance: m.instance,
                section: m.section,
                completion: m.completion,
            })
            .collect();
        self.insert_course(CourseData {
            course: snap.course.clone(),
            section_zero: snap.section_zero,
            modules,
            forums: snap.forums.clone(),
            urls: snap.urls.clone(),
            labels: snap.labels.clone(),
            grade_categories: snap.grade_categories.clone(),
            grade_items: snap.grade_items.clone(),
            assignments: snap.assignments.clone(),
        });
    }
}
