//! Checks over graded activities and course-level completion settings.

use valida_core::{CheckResult, Course, Details, GradeItem};

use crate::rule::{Rule, RuleContext};
use crate::text::escape_html;

fn item_link(ctx: &RuleContext<'_>, item: &GradeItem) -> String {
    match ctx.facts.module_for_item(item) {
        Some(cm) => ctx.edit_link(cm.id, &item.name),
        None => escape_html(&item.name),
    }
}

fn id_list<T: ToString>(ids: impl IntoIterator<Item = T>) -> String {
    ids.into_iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

pub struct CategorizedActivitiesRule;

impl Rule for CategorizedActivitiesRule {
    fn name(&self) -> &str {
        "Actividades evaluables categorizadas"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let items = ctx.facts.module_grade_items();
        if items.is_empty() {
            return None;
        }

        let categories = &ctx.facts.grade_categories;
        let uncategorized: Vec<&GradeItem> = items
            .into_iter()
            .filter(|item| match item.category_id {
                Some(id) => categories.iter().find(|c| c.id == id).map_or(true, |c| c.is_root()),
                None => true,
            })
            .collect();

        let passed = uncategorized.is_empty();
        let mut details = Details::new();
        let message = if passed {
            details.insert("Estado", "Todas las actividades evaluables tienen categoría");
            "Actividades evaluables correctamente categorizadas"
        } else {
            details.insert("Estado", format!("{} actividades sin categoría", uncategorized.len()));
            details.insert(
                "Actividades sin categoría",
                uncategorized.iter().map(|i| item_link(ctx, i)).collect::<Vec<_>>().join("<br>"),
            );
            "Hay actividades evaluables en la categoría raíz del calificador"
        };

        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if !passed {
            result = result.with_internal("grade_item_ids", id_list(uncategorized.iter().map(|i| i.id)));
        }
        Some(result)
    }
}

pub struct MarkingWorkflowRule;

impl Rule for MarkingWorkflowRule {
    fn name(&self) -> &str {
        "Flujo de trabajo en tareas"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let facts = ctx.facts;
        if facts.assignments.is_empty() {
            return None;
        }

        let without: Vec<_> = facts.assignments.iter().filter(|a| !a.marking_workflow).collect();
        let passed = without.is_empty();
        let mut details = Details::new().with("Tareas revisadas", facts.assignments.len().to_string());
        if !passed {
            let links: Vec<String> = without
                .iter()
                .map(|a| {
                    match facts.assign_type.and_then(|t| facts.module_for(t, a.id)) {
                        Some(cm) => ctx.edit_link(cm.id, &a.name),
                        None => escape_html(&a.name),
                    }
                })
                .collect();
            details.insert("Tareas sin flujo de trabajo", links.join("<br>"));
        }

        let message = if passed {
            "Todas las tareas tienen activado el flujo de trabajo de calificación"
        } else {
            "Hay tareas sin el flujo de trabajo de calificación activado"
        };
        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if !passed {
            result = result.with_internal("assign_ids", id_list(without.iter().map(|a| a.id)));
        }
        Some(result)
    }
}

pub struct CourseCompletionRule;

impl Rule for CourseCompletionRule {
    fn name(&self) -> &str {
        "Finalización del curso habilitada"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let passed = ctx.course.enable_completion;
        let message = if passed {
            "El seguimiento de finalización está habilitado"
        } else {
            "El seguimiento de finalización NO está habilitado en el curso"
        };
        Some(CheckResult::new(self.name(), passed, message))
    }
}

/// Every graded activity must define completion conditions. Only meaningful
/// once completion tracking is enabled at course level.
pub struct ActivityCompletionRule;

impl Rule for ActivityCompletionRule {
    fn name(&self) -> &str {
        "Condiciones de finalización en actividades evaluables"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        if !ctx.course.enable_completion {
            return None;
        }
        let items = ctx.facts.module_grade_items();
        if items.is_empty() {
            return None;
        }

        let without: Vec<&GradeItem> = items
            .into_iter()
            .filter(|item| {
                !ctx.facts
                    .module_for_item(item)
                    .is_some_and(|cm| cm.completion.is_configured())
            })
            .collect();

        let passed = without.is_empty();
        let mut details = Details::new();
        if !passed {
            details.insert(
                "Actividades sin condiciones",
                without.iter().map(|i| item_link(ctx, i)).collect::<Vec<_>>().join("<br>"),
            );
        }
        let message = if passed {
            "Todas las actividades evaluables tienen condiciones de finalización"
        } else {
            "Hay actividades evaluables sin condiciones de finalización"
        };

        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if !passed {
            result = result.with_internal("grade_item_ids", id_list(without.iter().map(|i| i.id)));
        }
        Some(result)
    }
}

/// A boolean course display setting that must be switched on.
pub struct FlagRule {
    name: &'static str,
    read: fn(&Course) -> bool,
}

impl FlagRule {
    pub fn completion_conditions() -> Self {
        Self {
            name: "Mostrar condiciones de finalización",
            read: |c| c.show_completion_conditions,
        }
    }

    pub fn activity_dates() -> Self {
        Self {
            name: "Mostrar fechas de actividades",
            read: |c| c.show_activity_dates,
        }
    }
}

impl Rule for FlagRule {
    fn name(&self) -> &str {
        self.name
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let passed = (self.read)(ctx.course);
        let (message, state) = if passed {
            ("Opción activada", "Sí")
        } else {
            ("Opción desactivada", "No")
        };
        let details = Details::new().with("Activado", state);
        Some(CheckResult::new(self.name, passed, message).with_details(details))
    }
}
