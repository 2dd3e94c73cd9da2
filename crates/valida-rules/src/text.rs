//! Plain-text views of label HTML bodies.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<(?:script|style)\b.*?</(?:script|style)\s*>").unwrap())
}

fn block_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?(?:p|div|br|hr|td|th|tr|li|ul|ol|table|thead|tbody|tfoot|caption|h[1-6]|blockquote|section|article)\b[^>]*>")
            .unwrap()
    })
}

fn any_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap())
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<table\b").unwrap())
}

/// Strips markup, decodes entities and collapses whitespace.
///
/// Block-level tags become a space so cell and paragraph contents do not run
/// together; inline tags vanish so `<b>Profesor</b>:` still reads `Profesor:`.
pub fn html_to_text(html: &str) -> String {
    let s = script_re().replace_all(html, " ");
    let s = block_tag_re().replace_all(&s, " ");
    let s = any_tag_re().replace_all(&s, "");
    let s = decode_entities(&s);
    whitespace_re().replace_all(&s, " ").trim().to_string()
}

/// Lower-cased [`html_to_text`], the form key phrases are searched in.
pub fn searchable_text(html: &str) -> String {
    html_to_text(html).to_lowercase()
}

pub fn decode_entities(s: &str) -> String {
    entity_re()
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "Aacute" => 'Á',
        "Eacute" => 'É',
        "Iacute" => 'Í',
        "Oacute" => 'Ó',
        "Uacute" => 'Ú',
        "ntilde" => 'ñ',
        "Ntilde" => 'Ñ',
        "uuml" => 'ü',
        "Uuml" => 'Ü',
        "ordm" => 'º',
        "ordf" => 'ª',
        "iexcl" => '¡',
        "iquest" => '¿',
        "laquo" => '«',
        "raquo" => '»',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "euro" => '€',
        _ => return None,
    };
    Some(c)
}

/// True when the raw HTML contains a `<table>` element.
pub fn has_table(html: &str) -> bool {
    table_re().is_match(html)
}

/// Case-insensitive pattern matching the words of `phrase` in sequence with
/// any run of whitespace between them.
pub fn phrase_pattern(phrase: &str) -> Regex {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"(?i){}", words.join(r"\s+"))).unwrap()
}

/// Case-insensitive, whitespace-trimmed comparison key for names.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
