use valida_core::{CheckResult, Details};

use crate::rule::{Rule, RuleContext};
use crate::text::name_key;

pub const REQUIRED_CATEGORIES: [&str; 5] = [
    "Actividades de aprendizaje",
    "Controles",
    "Actividades de evaluación continua",
    "Examen final",
    NON_GRADABLE_CATEGORY,
];

pub const NON_GRADABLE_CATEGORY: &str = "Actividades no evaluables";

/// Weights within this distance of zero count as zero.
pub const WEIGHT_TOLERANCE: f64 = 1e-5;

pub struct GradebookCategoriesRule;

impl Rule for GradebookCategoriesRule {
    fn name(&self) -> &str {
        "Categorías del calificador"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let categories = &ctx.facts.grade_categories;
        let missing: Vec<&str> = REQUIRED_CATEGORIES
            .iter()
            .copied()
            .filter(|req| !categories.iter().any(|c| name_key(&c.name) == name_key(req)))
            .collect();

        let non_gradable_key = name_key(NON_GRADABLE_CATEGORY);
        let non_gradable: Vec<_> = categories.iter().filter(|c| name_key(&c.name) == non_gradable_key).collect();
        let weighted = non_gradable.iter().find(|c| c.weight.is_some()).or(non_gradable.first());
        let weight = weighted.and_then(|c| c.weight).map(|w| w.effective());
        let weight_ok = weight.map_or(true, |w| w.abs() <= WEIGHT_TOLERANCE);

        let mut details = Details::new()
            .with("Requeridas", REQUIRED_CATEGORIES.join(", "))
            .with("Faltan", if missing.is_empty() { "-".to_string() } else { missing.join(", ") })
            .with(
                format!("Peso \"{NON_GRADABLE_CATEGORY}\""),
                weight.map_or_else(|| "-".to_string(), |w| w.to_string()),
            );
        if !weight_ok {
            details.insert("Error peso", format!("La categoría \"{NON_GRADABLE_CATEGORY}\" debe tener peso 0"));
        }

        let passed = missing.is_empty() && weight_ok;
        let message = if passed {
            "Todas las categorías requeridas están presentes y el peso es correcto".to_string()
        } else {
            format!("Faltan categorías o el peso de \"{NON_GRADABLE_CATEGORY}\" no es 0")
        };

        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if !missing.is_empty() {
            result = result.with_internal("missing_categories", missing.join("|"));
        }
        if let Some(c) = weighted {
            result = result.with_internal("non_gradable_category_id", c.id);
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::*;
    use valida_core::{CategoryWeight, GradeCategory, GradeCategoryId};

    fn category(id: i64, name: &str, weight: Option<CategoryWeight>) -> GradeCategory {
        GradeCategory {
            id: GradeCategoryId(id),
            name: name.into(),
            depth: 2,
            weight,
        }
    }

    fn full_gradebook(weight: Option<CategoryWeight>) -> crate::facts::CourseFacts {
        let mut f = facts();
        f.grade_categories.push(GradeCategory {
            id: GradeCategoryId(1),
            name: "MAT101".into(),
            depth: 1,
            weight: None,
        });
        for (i, name) in REQUIRED_CATEGORIES.iter().enumerate() {
            let w = if *name == NON_GRADABLE_CATEGORY { weight } else { None };
            f.grade_categories.push(category(i as i64 + 2, &name.to_uppercase(), w));
        }
        f
    }

    fn weight(coef: f64, coef2: f64, weight_override: bool) -> Option<CategoryWeight> {
        Some(CategoryWeight {
            aggregation_coef: coef,
            aggregation_coef2: coef2,
            weight_override,
        })
    }

    #[test]
    fn test_all_categories_with_zero_weight_pass() {
        let r = eval(&GradebookCategoriesRule, &course(), &full_gradebook(weight(0.0, 0.0, false))).unwrap();
        assert!(r.passed);
        assert_eq!(r.details.get("Faltan"), Some("-"));
        assert_eq!(r.details.get("Peso \"Actividades no evaluables\""), Some("0"));
        assert_eq!(r.internal.get("non_gradable_category_id").map(String::as_str), Some("6"));
    }

    #[test]
    fn test_unknown_weight_is_accepted() {
        let r = eval(&GradebookCategoriesRule, &course(), &full_gradebook(None)).unwrap();
        assert!(r.passed);
        assert_eq!(r.details.get("Peso \"Actividades no evaluables\""), Some("-"));
    }

    #[test]
    fn test_override_flag_selects_the_weight_field() {
        // Non-zero coef ignored when the override points at coef2.
        let r = eval(&GradebookCategoriesRule, &course(), &full_gradebook(weight(0.3, 0.0, true))).unwrap();
        assert!(r.passed);

        let r = eval(&GradebookCategoriesRule, &course(), &full_gradebook(weight(0.0, 0.3, true))).unwrap();
        assert!(!r.passed);
        assert_eq!(
            r.details.get("Error peso"),
            Some("La categoría \"Actividades no evaluables\" debe tener peso 0")
        );
        assert_eq!(r.message, "Faltan categorías o el peso de \"Actividades no evaluables\" no es 0");
    }

    #[test]
    fn test_tiny_weight_within_tolerance_passes_with_matching_message() {
        let r = eval(&GradebookCategoriesRule, &course(), &full_gradebook(weight(0.000001, 0.0, false))).unwrap();
        assert!(r.passed);
        assert_eq!(r.message, "Todas las categorías requeridas están presentes y el peso es correcto");
    }

    #[test]
    fn test_lists_missing_categories() {
        let mut f = facts();
        f.grade_categories.push(category(2, " controles ", None));
        let r = eval(&GradebookCategoriesRule, &course(), &f).unwrap();
        assert!(!r.passed);
        assert_eq!(
            r.details.get("Faltan"),
            Some("Actividades de aprendizaje, Actividades de evaluación continua, Examen final, Actividades no evaluables")
        );
        assert!(r.details.get("Error peso").is_none());
    }
}
