use valida_core::{CheckResult, CourseModule, Details, UrlResource};

use crate::rule::{Rule, RuleContext};
use crate::text::{escape_html, name_key};

pub const SYLLABUS_TITLE: &str = "Guía Docente";
const UNACCENTED_TITLE: &str = "guia docente";

/// Section 0 must link the syllabus on the institutional site.
pub struct SyllabusRule;

impl SyllabusRule {
    fn is_title_match(url: &UrlResource) -> bool {
        name_key(&url.name).starts_with(&name_key(SYLLABUS_TITLE))
    }

    fn is_near_miss(url: &UrlResource) -> bool {
        name_key(&url.name).starts_with(UNACCENTED_TITLE)
    }

    fn has_valid_target(url: &UrlResource, prefix: &str) -> bool {
        url.external_url.trim().starts_with(prefix)
    }
}

impl Rule for SyllabusRule {
    fn name(&self) -> &str {
        "Guía Docente en bloque cero"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let prefix = ctx.config.syllabus_url_prefix.as_str();
        let urls = ctx.facts.section_zero_urls();

        let matches: Vec<(&CourseModule, &UrlResource)> =
            urls.iter().copied().filter(|(_, u)| Self::is_title_match(u)).collect();
        let chosen = matches
            .iter()
            .find(|(_, u)| Self::has_valid_target(u, prefix))
            .or_else(|| matches.first())
            .copied();

        let mut details = Details::new().with("Nombre buscado", SYLLABUS_TITLE);
        let (passed, message) = match chosen {
            Some((cm, url)) => {
                let url_ok = Self::has_valid_target(url, prefix);
                details.insert(
                    "Estado",
                    format!(
                        "Encontrada en la sección 0 <a href=\"{}\" target=\"_blank\">Ver</a>",
                        ctx.url_view_link(cm.id)
                    ),
                );
                details.insert("URL", escape_html(url.external_url.trim()));
                if url_ok {
                    details.insert("Validación URL", "La URL es válida");
                    (true, "Guía Docente encontrada y URL válida")
                } else {
                    details.insert(
                        "Validación URL",
                        format!("La URL NO es válida (debe empezar por {prefix})"),
                    );
                    (false, "Guía Docente encontrada pero URL NO válida")
                }
            }
            None => {
                details.insert("Estado", "No encontrada en la sección 0");
                details.insert("URL", "-");
                details.insert("Validación URL", "-");
                if urls.iter().any(|(_, u)| Self::is_near_miss(u)) {
                    details.insert(
                        "Aviso",
                        "Existe una URL llamada \"Guia Docente\" (sin acento en la i). \
                         Debe llamarse exactamente \"Guía Docente\".",
                    );
                }
                (false, "Guía Docente NO encontrada")
            }
        };

        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if let Some((cm, url)) = chosen {
            result = result.with_internal("cmid", cm.id).with_internal("url_id", url.id);
        }
        Some(result)
    }
}
