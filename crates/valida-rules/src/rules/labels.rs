use std::sync::OnceLock;

use regex::Regex;
use valida_core::{CheckResult, Details};

use crate::rule::{Rule, RuleContext};
use crate::text::{has_table, html_to_text, phrase_pattern, searchable_text};

/// A key the tutoring label must mention, with accepted spellings.
#[derive(Clone, Copy, Debug)]
pub struct KeyPhrase {
    pub label: &'static str,
    pub variants: &'static [&'static str],
}

impl KeyPhrase {
    /// Any variant, starting on a word boundary so `hotel.` never reads as `Tel.`.
    fn pattern(&self) -> Regex {
        let alternatives: Vec<String> = self.variants.iter().map(|v| regex::escape(v)).collect();
        Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|"))).unwrap()
    }
}

pub const TUTORING_KEYS: [KeyPhrase; 5] = [
    KeyPhrase {
        label: "Profesor:",
        variants: &["Profesor:", "Profesora:", "Profesor/a:", "Profesores:"],
    },
    KeyPhrase {
        label: "Correo electrónico:",
        variants: &["Correo electrónico:", "Correo:", "Email:", "E-mail:"],
    },
    KeyPhrase {
        label: "Teléfono",
        variants: &["Teléfono", "Telefono", "Tlf", "Tel."],
    },
    KeyPhrase {
        label: "Extensión",
        variants: &["Extensión", "Extension", "Ext."],
    },
    KeyPhrase {
        label: "Horario de tutorías",
        variants: &["Horario de tutorías", "Horario de tutoría", "Horario de atención"],
    },
];

fn key_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| TUTORING_KEYS.iter().map(KeyPhrase::pattern).collect())
}

/// Labels of the tutoring keys absent from `html`, in declaration order.
pub fn missing_keys(html: &str) -> Vec<&'static str> {
    let text = searchable_text(html);
    TUTORING_KEYS
        .iter()
        .zip(key_patterns())
        .filter(|(_, re)| !re.is_match(&text))
        .map(|(k, _)| k.label)
        .collect()
}

pub fn is_tutoring_text(html: &str) -> bool {
    missing_keys(html).is_empty()
}

fn key_labels() -> String {
    TUTORING_KEYS.iter().map(|k| k.label).collect::<Vec<_>>().join(", ")
}

pub struct TutoringRule;

impl Rule for TutoringRule {
    fn name(&self) -> &str {
        "Datos de tutoría en bloque cero"
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let mut best: Option<(Vec<&'static str>, valida_core::CourseModuleId)> = None;
        for (cm, label) in ctx.facts.section_zero_labels() {
            let missing = missing_keys(&label.intro);
            let better = match &best {
                Some((current, _)) => missing.len() < current.len(),
                None => true,
            };
            if better {
                let done = missing.is_empty();
                best = Some((missing, cm.id));
                if done {
                    break;
                }
            }
        }

        let passed = matches!(&best, Some((missing, _)) if missing.is_empty());
        let mut details = Details::new()
            .with("Claves buscadas", key_labels())
            .with("Estado", if passed { "Encontrado" } else { "No encontrado" });
        if !passed {
            let missing = match &best {
                Some((missing, _)) => missing.join(", "),
                None => key_labels(),
            };
            details.insert("Faltan", missing);
        }

        let message = if passed {
            "Datos de tutoría encontrados"
        } else {
            "No se han encontrado los datos de tutoría requeridos"
        };
        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if let Some((_, cm)) = best {
            result = result.with_internal("label_cmid", cm);
        }
        Some(result)
    }
}

/// A section-0 label holding a table under a fixed heading.
pub struct ScheduleRule {
    name: &'static str,
    phrase: &'static str,
    pattern: Regex,
    found: &'static str,
    not_found: &'static str,
}

impl ScheduleRule {
    pub fn gradable_activities() -> Self {
        Self::new(
            "Cronograma de actividades calificables en bloque cero",
            "CRONOGRAMA DE ACTIVIDADES CALIFICABLES",
            "Cronograma encontrado",
            "No se ha encontrado el cronograma en la sección 0",
        )
    }

    pub fn live_sessions() -> Self {
        Self::new(
            "Cronograma de sesiones síncronas en bloque cero",
            "CRONOGRAMA DE SESIONES SÍNCRONAS",
            "Cronograma de sesiones encontrado",
            "No se ha encontrado el cronograma de sesiones en la sección 0",
        )
    }

    fn new(name: &'static str, phrase: &'static str, found: &'static str, not_found: &'static str) -> Self {
        Self {
            name,
            phrase,
            pattern: phrase_pattern(phrase),
            found,
            not_found,
        }
    }
}

impl Rule for ScheduleRule {
    fn name(&self) -> &str {
        self.name
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let mut hit = None;
        let mut text_without_table = false;
        for (cm, label) in ctx.facts.section_zero_labels() {
            if !self.pattern.is_match(&html_to_text(&label.intro)) || is_tutoring_text(&label.intro) {
                continue;
            }
            if has_table(&label.intro) {
                hit = Some(cm.id);
                break;
            }
            text_without_table = true;
        }

        let passed = hit.is_some();
        let state = match (passed, text_without_table) {
            (true, _) => "Encontrado",
            (false, true) => "Texto encontrado sin tabla",
            (false, false) => "No encontrado",
        };
        let details = Details::new()
            .with(
                "Requisito",
                format!(
                    "Debe existir un recurso de tipo \"Text and media area\" (label) en la sección 0 \
                     que contenga una tabla y el texto: {}",
                    self.phrase
                ),
            )
            .with("Estado", state);

        let mut result = CheckResult::new(self.name, passed, if passed { self.found } else { self.not_found })
            .with_details(details);
        if let Some(cm) = hit {
            result = result.with_internal("label_cmid", cm);
        }
        Some(result)
    }
}
