use valida_core::{CheckResult, CourseModule, Details, Forum, ForumType};

use crate::rule::{Rule, RuleContext};
use crate::text::name_key;

/// A forum every course must have in section 0.
#[derive(Clone, Debug)]
pub struct RequiredForum {
    pub name: &'static str,
    pub forum_type: ForumType,
}

pub fn required_forums() -> [RequiredForum; 3] {
    [
        RequiredForum {
            name: "Tablón de anuncios",
            forum_type: ForumType::News,
        },
        RequiredForum {
            name: "Foro de comunicación entre estudiantes",
            forum_type: ForumType::General,
        },
        RequiredForum {
            name: "Foro de tutorías de la asignatura",
            forum_type: ForumType::General,
        },
    ]
}

enum Placement<'a> {
    Found(&'a CourseModule),
    OutOfSection(&'a Forum),
    WrongType(&'a Forum),
    Missing,
}

impl Placement<'_> {
    fn rank(&self) -> u8 {
        match self {
            Placement::Found(_) => 3,
            Placement::OutOfSection(_) => 2,
            Placement::WrongType(_) => 1,
            Placement::Missing => 0,
        }
    }
}

pub struct ForumRule {
    required: RequiredForum,
}

impl ForumRule {
    pub fn new(required: RequiredForum) -> Self {
        Self { required }
    }

    fn locate<'a>(&self, ctx: &'a RuleContext<'_>) -> Placement<'a> {
        let facts = ctx.facts;
        let wanted = name_key(self.required.name);
        let mut best = Placement::Missing;

        for forum in facts.forums.iter().filter(|f| name_key(&f.name) == wanted) {
            let candidate = if forum.forum_type != self.required.forum_type {
                Placement::WrongType(forum)
            } else {
                match facts.module_for(facts.forum_type, forum.id) {
                    Some(cm) if facts.in_section_zero(cm) => Placement::Found(cm),
                    _ => Placement::OutOfSection(forum),
                }
            };
            if candidate.rank() > best.rank() {
                best = candidate;
            }
            if matches!(best, Placement::Found(_)) {
                break;
            }
        }
        best
    }
}

impl Rule for ForumRule {
    fn name(&self) -> &str {
        self.required.name
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let placement = self.locate(ctx);
        let passed = matches!(placement, Placement::Found(_));
        let mut details = Details::new().with("Nombre buscado", self.required.name);
        let mut result = CheckResult::new(self.name(), passed, if passed { "Validado" } else { "No validado" });

        match placement {
            Placement::Found(cm) => {
                details.insert("Estado", "Encontrado en la primera sección");
                result = result.with_internal("cmid", cm.id);
            }
            Placement::OutOfSection(forum) => {
                details.insert("Estado", "No encontrado o fuera de sección");
                result = result.with_internal("forum_id", forum.id);
            }
            Placement::WrongType(forum) => {
                details.insert("Estado", "Encontrado con tipo incorrecto");
                details.insert("Tipo detectado", forum.forum_type.as_str());
                details.insert("Tipo requerido", self.required.forum_type.as_str());
                result = result
                    .with_internal("forum_id", forum.id)
                    .with_internal("detected_type", forum.forum_type.as_str());
            }
            Placement::Missing => {
                details.insert("Estado", "No encontrado o fuera de sección");
            }
        }

        result = result.with_internal("required_type", self.required.forum_type.as_str());
        Some(result.with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::*;

    fn announcements() -> ForumRule {
        ForumRule::new(required_forums()[0].clone())
    }

    #[test]
    fn test_news_forum_in_section_zero_passes_case_insensitively() {
        let mut f = facts();
        add_forum(&mut f, 1, "  TABLÓN DE ANUNCIOS ", ForumType::News, SECTION0);
        let r = eval(&announcements(), &course(), &f).unwrap();
        assert!(r.passed);
        assert_eq!(r.details.get("Estado"), Some("Encontrado en la primera sección"));
        assert_eq!(r.internal.get("cmid").map(String::as_str), Some("101"));
    }

    #[test]
    fn test_wrong_type_records_detected_type() {
        let mut f = facts();
        add_forum(&mut f, 4, "Tablón de anuncios", ForumType::General, SECTION0);
        let r = eval(&announcements(), &course(), &f).unwrap();
        assert!(!r.passed);
        assert_eq!(r.details.get("Tipo detectado"), Some("general"));
        assert_eq!(r.details.get("Tipo requerido"), Some("news"));
        assert_eq!(r.internal.get("forum_id").map(String::as_str), Some("4"));
        assert_eq!(r.internal.get("detected_type").map(String::as_str), Some("general"));
    }

    #[test]
    fn test_forum_outside_section_zero_fails() {
        let mut f = facts();
        add_forum(&mut f, 1, "Tablón de anuncios", ForumType::News, SECTION1);
        let r = eval(&announcements(), &course(), &f).unwrap();
        assert!(!r.passed);
        assert_eq!(r.details.get("Estado"), Some("No encontrado o fuera de sección"));
        assert!(r.details.get("Tipo detectado").is_none());
    }

    #[test]
    fn test_correct_forum_wins_over_wrong_type_duplicate() {
        let mut f = facts();
        add_forum(&mut f, 1, "Foro de tutorías de la asignatura", ForumType::QAndA, SECTION0);
        add_forum(&mut f, 2, "Foro de tutorías de la asignatura", ForumType::General, SECTION0);
        let rule = ForumRule::new(required_forums()[2].clone());
        let r = eval(&rule, &course(), &f).unwrap();
        assert!(r.passed);
    }

    #[test]
    fn test_missing_section_zero_reports_not_found() {
        let mut f = facts();
        add_forum(&mut f, 1, "Tablón de anuncios", ForumType::News, SECTION0);
        f.section_zero = None;
        let r = eval(&announcements(), &course(), &f).unwrap();
        assert!(!r.passed);
    }
}
