use time::macros::format_description;
use time::OffsetDateTime;
use valida_core::{CheckResult, Details};

use crate::rule::{Rule, RuleContext};

pub const NOT_AVAILABLE: &str = "No disponible";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

/// Course start/end date must equal the configured reference timestamp.
pub struct DateMatchRule {
    field: DateField,
}

impl DateMatchRule {
    pub fn start() -> Self {
        Self { field: DateField::Start }
    }

    pub fn end() -> Self {
        Self { field: DateField::End }
    }
}

impl Rule for DateMatchRule {
    fn name(&self) -> &str {
        match self.field {
            DateField::Start => "Fecha de inicio",
            DateField::End => "Fecha de fin",
        }
    }

    fn eval(&self, ctx: &RuleContext<'_>) -> Option<CheckResult> {
        let (course_value, configured, label) = match self.field {
            DateField::Start => (ctx.course.start_date, ctx.config.start_date, "Fecha Inicio"),
            DateField::End => (ctx.course.end_date, ctx.config.end_date, "Fecha Fin"),
        };
        let configured = configured.filter(|v| *v != 0);
        let passed = course_value != 0 && configured == Some(course_value);

        let details = Details::new()
            .with("Curso", format_optional(Some(course_value).filter(|v| *v != 0)))
            .with("Configuración", format_optional(configured));
        let message = if passed {
            format!("{label} validada")
        } else {
            format!("{label} NO validada")
        };

        let mut result = CheckResult::new(self.name(), passed, message).with_details(details);
        if let Some(c) = configured {
            result = result.with_internal("configured_date", c);
        }
        Some(result)
    }
}

fn format_optional(ts: Option<i64>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `dd/mm/yyyy hh:mm` in UTC; falls back to the raw number when out of range.
pub fn format_timestamp(ts: i64) -> String {
    let fmt = format_description!("[day]/[month]/[year] [hour]:[minute]");
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(fmt).ok())
        .unwrap_or_else(|| ts.to_string())
}
