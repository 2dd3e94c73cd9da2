use std::path::PathBuf;

use tempfile::{tempdir, TempDir};
use valida_core::{CourseId, IssueFilter};
use valida_runner::report::{issue_listing, overview};
use valida_runner::{check_snapshot, CheckOptions, Config, DateSetting, Runner};
use valida_storage::IssueStore;

const SNAPSHOT: &str = r#"
course:
  id: 7
  category: 3
  shortname: MAT101
  fullname: Matemáticas I
  start_date: 1759276800
  end_date: 1769817600
  enable_completion: true
section_zero: 70
modules:
  - { id: 700, module: forum, instance: 1, section: 70 }
  - { id: 701, module: url, instance: 1, section: 70 }
  - { id: 702, module: quiz, instance: 3, section: 71, completion: automatic }
forums:
  - { id: 1, name: "Tablón de anuncios", type: news }
urls:
  - { id: 1, name: "Guía Docente", external_url: "https://www.udima.es/mat101.pdf" }
grade_categories:
  - { id: 1, name: MAT101, depth: 1 }
grade_items:
  - { id: 10, name: Control 1, category_id: 1, item_type: mod, item_module: quiz, item_instance: 3 }
"#;

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("valida.toml");
    let mut cfg = Config::default_for_site("https://campus.test");
    cfg.storage.db_path = dir.path().join("valida.db").to_string_lossy().into_owned();
    cfg.validation.start_date = Some(DateSetting::Text("2025-10-01 00:00".into()));
    cfg.validation.end_date = Some(DateSetting::Timestamp(1_769_817_600));
    cfg.save_to(&config_path).unwrap();

    let snap_path = dir.path().join("mat101.yaml");
    std::fs::write(&snap_path, SNAPSHOT).unwrap();
    (dir, config_path, snap_path)
}

fn result<'a>(check: &'a valida_runner::CourseCheck, name: &str) -> &'a valida_core::CheckResult {
    check.results.iter().find(|r| r.name == name).unwrap()
}

#[test]
fn test_init_keeps_existing_config_and_creates_db() {
    let (dir, config_path, _) = setup();
    Runner::init(&config_path, Some("https://other.test")).unwrap();
    let loaded = Config::load_from(&config_path).unwrap();
    assert_eq!(loaded.site.base_url, "https://campus.test");
    assert!(dir.path().join("valida.db").exists());
}

#[test]
fn test_snapshot_check_runs_in_memory() {
    let (_dir, config_path, snap_path) = setup();
    let cfg = Config::load_from(&config_path).unwrap();
    let check = check_snapshot(&snap_path, &cfg.to_validation_config().unwrap()).unwrap();

    assert_eq!(check.course.id, CourseId(7));
    assert!(result(&check, "Fecha de inicio").passed);
    assert!(result(&check, "Fecha de fin").passed);
    assert!(result(&check, "Tablón de anuncios").passed);
    assert!(result(&check, "Guía Docente en bloque cero").passed);
    assert!(!result(&check, "Actividades evaluables categorizadas").passed);
    assert!(result(&check, "Condiciones de finalización en actividades evaluables").passed);
    assert!(check.history.is_none());
}

#[test]
fn test_import_check_record_and_report() {
    let (_dir, config_path, snap_path) = setup();
    let runner = Runner::open(config_path).unwrap();
    let id = runner.import_snapshot(&snap_path).unwrap();

    let dry = runner.check_course(id, CheckOptions::default()).unwrap();
    assert!(dry.history.is_none());
    assert!(runner.storage.list_issues(&IssueFilter::all()).unwrap().is_empty());

    let recorded = runner
        .check_course(
            id,
            CheckOptions {
                record: true,
                force: false,
            },
        )
        .unwrap();
    let history = recorded.history.unwrap();
    assert_eq!(history.opened, recorded.failed());
    assert_eq!(recorded.results, dry.results);

    let o = overview(&runner.storage).unwrap();
    assert_eq!(o.courses_validated, 1);
    assert_eq!(o.courses_with_issues, 1);
    let rows = issue_listing(&runner.storage, &runner.storage, &IssueFilter::open()).unwrap();
    assert!(rows.iter().all(|r| r.fullname == "Matemáticas I"));

    // A batch over the same data refreshes instead of duplicating.
    let summary = runner.validate_all().unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.opened, 0);
    assert_eq!(runner.storage.open_issues(id).unwrap().len(), history.opened);
}

#[test]
fn test_disallowed_category_needs_force() {
    let (_dir, config_path, snap_path) = setup();
    let mut cfg = Config::load_from(&config_path).unwrap();
    cfg.validation.allowed_categories = vec![99];
    cfg.save_to(&config_path).unwrap();

    let runner = Runner::open(config_path).unwrap();
    let id = runner.import_snapshot(&snap_path).unwrap();
    assert!(runner.check_course(id, CheckOptions::default()).is_err());
    let forced = CheckOptions {
        record: false,
        force: true,
    };
    assert!(runner.check_course(id, forced).is_ok());

    let summary = runner.validate_all().unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped, 1);
}

#[test]
fn test_unknown_course_is_an_error() {
    let (_dir, config_path, _) = setup();
    let runner = Runner::open(config_path).unwrap();
    let err = runner.check_course(CourseId(404), CheckOptions::default()).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_imported_course_without_modules_reports_failures() {
    let (dir, config_path, _) = setup();
    let empty = dir.path().join("vacio.yaml");
    std::fs::write(&empty, "course: { id: 8, category: 3, fullname: Vacío }\nsection_zero: 80\n").unwrap();

    let runner = Runner::open(config_path).unwrap();
    let id = runner.import_snapshot(&empty).unwrap();
    let check = runner.check_course(id, CheckOptions::default()).unwrap();

    assert!(!result(&check, "Tablón de anuncios").passed);
    assert!(!result(&check, "Datos de tutoría en bloque cero").passed);
    assert!(!result(&check, "Guía Docente en bloque cero").passed);

    let summary = runner.validate_all().unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors, 0);
}
