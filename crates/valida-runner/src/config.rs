use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};
use valida_core::{CategoryId, CourseId};
use valida_rules::{ValidationConfig, DEFAULT_SYLLABUS_URL_PREFIX};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub validation: ValidationSection,
    pub site: SiteConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateSetting>,
    #[serde(default)]
    pub allowed_categories: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus_url_prefix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    #[serde(default = "default_site_course")]
    pub site_course_id: i64,
}

fn default_site_course() -> i64 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: String,
}

/// A reference date: either a unix timestamp or `YYYY-MM-DD[ HH:MM]` in UTC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateSetting {
    Timestamp(i64),
    Text(String),
}

impl DateSetting {
    pub fn to_unix(&self) -> Result<i64> {
        match self {
            DateSetting::Timestamp(ts) => Ok(*ts),
            DateSetting::Text(s) => parse_date(s),
        }
    }
}

/// Parses `YYYY-MM-DD HH:MM` or `YYYY-MM-DD` (midnight) as UTC.
pub fn parse_date(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<i64>() {
        return Ok(ts);
    }
    let with_time = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(dt) = PrimitiveDateTime::parse(s, with_time) {
        return Ok(dt.assume_utc().unix_timestamp());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    let date = Date::parse(s, date_only).map_err(|e| anyhow!("invalid date `{s}`: {e}"))?;
    Ok(date.midnight().assume_utc().unix_timestamp())
}

impl Config {
    pub fn default_for_site(base_url: &str) -> Self {
        Self {
            validation: ValidationSection {
                syllabus_url_prefix: Some(DEFAULT_SYLLABUS_URL_PREFIX.to_string()),
                ..ValidationSection::default()
            },
            site: SiteConfig {
                base_url: base_url.to_string(),
                site_course_id: default_site_course(),
            },
            storage: StorageConfig {
                db_path: "~/.valida/valida.db".to_string(),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Database location with `~` expanded.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.db_path).to_string())
    }

    pub fn site_course(&self) -> CourseId {
        CourseId(self.site.site_course_id)
    }

    pub fn to_validation_config(&self) -> Result<ValidationConfig> {
        let v = &self.validation;
        let start_date = v.start_date.as_ref().map(DateSetting::to_unix).transpose().context("validation.start_date")?;
        let end_date = v.end_date.as_ref().map(DateSetting::to_unix).transpose().context("validation.end_date")?;
        Ok(ValidationConfig {
            start_date,
            end_date,
            allowed_categories: v.allowed_categories.iter().copied().map(CategoryId).collect(),
            site_url: self.site.base_url.trim_end_matches('/').to_string(),
            syllabus_url_prefix: v
                .syllabus_url_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_SYLLABUS_URL_PREFIX.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parses_both_date_forms() {
        assert_eq!(parse_date("2023-11-14 22:13").unwrap(), 1_699_999_980);
        assert_eq!(parse_date("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_date("1970-01-02").unwrap(), 86_400);
        assert!(parse_date("14/11/2023").is_err());
    }

    #[test]
    fn test_reads_toml_with_mixed_date_settings() {
        let cfg: Config = toml::from_str(
            r#"
[validation]
start_date = "2025-10-01 00:00"
end_date = 1769817600
allowed_categories = [3, 7]

[site]
base_url = "https://campus.example.org/"

[storage]
db_path = "/tmp/valida.db"
"#,
        )
        .unwrap();
        assert_eq!(cfg.site.site_course_id, 1);
        let v = cfg.to_validation_config().unwrap();
        assert_eq!(v.start_date, Some(1_759_276_800));
        assert_eq!(v.end_date, Some(1_769_817_600));
        assert_eq!(v.allowed_categories, vec![CategoryId(3), CategoryId(7)]);
        assert_eq!(v.site_url, "https://campus.example.org");
        assert_eq!(v.syllabus_url_prefix, DEFAULT_SYLLABUS_URL_PREFIX);
    }

    #[test]
    fn test_bad_date_names_the_setting() {
        let mut cfg = Config::default_for_site("https://x");
        cfg.validation.end_date = Some(DateSetting::Text("soon".into()));
        let err = cfg.to_validation_config().unwrap_err();
        assert!(format!("{err:#}").contains("validation.end_date"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg").join("valida.toml");
        let mut cfg = Config::default_for_site("https://campus.test");
        cfg.validation.start_date = Some(DateSetting::Text("2025-10-01 00:00".into()));
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn test_absolute_db_path_is_kept() {
        let mut cfg = Config::default_for_site("https://x");
        cfg.storage.db_path = "/var/lib/valida/valida.db".into();
        assert_eq!(cfg.db_path(), PathBuf::from("/var/lib/valida/valida.db"));
    }
}
