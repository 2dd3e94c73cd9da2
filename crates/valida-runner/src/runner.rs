use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tracing::info;
use valida_core::{CheckResult, Course, CourseId};
use valida_history::{record_course_results, HistorySummary};
use valida_rules::{validate, ValidationConfig};
use valida_storage::{load_course_snapshot, CourseRepository, InMemoryStorage};
use valida_storage_sqlite::SqliteStorage;

use crate::batch::{validate_all_courses, BatchSummary};
use crate::{util::now_unix, Config};

const DEFAULT_SITE_URL: &str = "http://localhost";

pub struct Runner {
    pub config_path: PathBuf,
    pub cfg: Config,
    pub validation: ValidationConfig,
    pub storage: SqliteStorage,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CheckOptions {
    /// Write the results into the issue history.
    pub record: bool,
    /// Check the course even when the batch job would skip it.
    pub force: bool,
}

/// Results of checking one course.
#[derive(Clone, Debug, Serialize)]
pub struct CourseCheck {
    pub course: Course,
    pub results: Vec<CheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySummary>,
}

impl CourseCheck {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

impl Runner {
    /// Loads `config_path`, writing a default configuration when it is missing.
    pub fn open(config_path: PathBuf) -> Result<Self> {
        let cfg = if config_path.exists() {
            Config::load_from(&config_path)?
        } else {
            let cfg = Config::default_for_site(DEFAULT_SITE_URL);
            cfg.save_to(&config_path)?;
            cfg
        };
        let validation = cfg.to_validation_config()?;
        let storage = SqliteStorage::open(&cfg.db_path())?;
        Ok(Self {
            config_path,
            cfg,
            validation,
            storage,
        })
    }

    pub fn init(config_path: &Path, site_url: Option<&str>) -> Result<()> {
        if !config_path.exists() {
            Config::default_for_site(site_url.unwrap_or(DEFAULT_SITE_URL)).save_to(config_path)?;
        }
        let cfg = Config::load_from(config_path)?;
        // create db
        let _ = SqliteStorage::open(&cfg.db_path())?;
        Ok(())
    }

    pub fn check_course(&self, course_id: CourseId, opts: CheckOptions) -> Result<CourseCheck> {
        let course = self
            .storage
            .course(course_id)?
            .ok_or_else(|| anyhow!("course {course_id} not found"))?;
        if !opts.force {
            if course.id == self.cfg.site_course() {
                bail!("course {course_id} is the site course (use --force to check it anyway)");
            }
            if !self.validation.is_category_allowed(course.category) {
                bail!(
                    "course {course_id} is in category {}, outside the allowed categories (use --force)",
                    course.category
                );
            }
        }

        let results = validate(&self.storage, &course, &self.validation)
            .with_context(|| format!("validate course {course_id}"))?;
        let history = if opts.record {
            Some(record_course_results(&self.storage, course.id, &results, now_unix())?)
        } else {
            None
        };
        Ok(CourseCheck {
            course,
            results,
            history,
        })
    }

    pub fn validate_all(&self) -> Result<BatchSummary> {
        validate_all_courses(
            &self.storage,
            &self.storage,
            &self.validation,
            self.cfg.site_course(),
            now_unix(),
        )
    }

    /// Loads a YAML course snapshot into the database, replacing that course.
    pub fn import_snapshot(&self, path: &Path) -> Result<CourseId> {
        let snap = load_course_snapshot(path)?;
        self.storage.import_snapshot(&snap)?;
        info!(course_id = snap.course.id.get(), path = %path.display(), "snapshot imported");
        Ok(snap.course.id)
    }
}

/// Checks a YAML snapshot without touching any database.
pub fn check_snapshot(path: &Path, validation: &ValidationConfig) -> Result<CourseCheck> {
    let snap = load_course_snapshot(path)?;
    let storage = InMemoryStorage::with_standard_modules();
    storage.insert_snapshot(&snap);
    let results = validate(&storage, &snap.course, validation)
        .with_context(|| format!("validate snapshot {}", path.display()))?;
    Ok(CourseCheck {
        course: snap.course,
        results,
        history: None,
    })
}
