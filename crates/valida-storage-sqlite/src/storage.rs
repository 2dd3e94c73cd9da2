use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use valida_core::{
    Assignment, CategoryId, CategoryWeight, CompletionTracking, Course, CourseId, CourseModule, CourseModuleId, Forum,
    ForumType, GradeCategory, GradeCategoryId, GradeItem, GradeItemId, GradeItemType, InstanceId, Issue, IssueChange,
    IssueFilter, IssueId, IssueState, Label, ModuleType, ModuleTypeId, SectionId, UrlResource,
};
use valida_storage::{CourseRepository, CourseSnapshot, IssueStore, STANDARD_MODULE_TYPES};

const COURSE_COLUMNS: &str = "id, category, shortname, fullname, visible, startdate, enddate, enablecompletion, \
                              showcompletionconditions, showactivitydates";

const ISSUE_COLUMNS: &str = "id, courseid, validation, state, firstseen, lastseen, resolvedat";

/// SQLite backend over the host-shaped course tables plus the issue table.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(include_str!("../migrations/0001_issues.sql"))
            .context("create issue tables")?;
        conn.execute_batch(include_str!("../migrations/0002_course_schema.sql"))
            .context("create course tables")?;
        for name in STANDARD_MODULE_TYPES {
            conn.execute("INSERT OR IGNORE INTO mdl_modules(name) VALUES (?1)", params![name])
                .with_context(|| format!("register module type {name}"))?;
        }
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn course_from_row(r: &Row<'_>) -> rusqlite::Result<Course> {
        Ok(Course {
            id: CourseId(r.get(0)?),
            category: CategoryId(r.get(1)?),
            shortname: r.get(2)?,
            fullname: r.get(3)?,
            visible: r.get::<_, i64>(4)? != 0,
            start_date: r.get(5)?,
            end_date: r.get(6)?,
            enable_completion: r.get::<_, i64>(7)? != 0,
            show_completion_conditions: r.get::<_, i64>(8)? != 0,
            show_activity_dates: r.get::<_, i64>(9)? != 0,
        })
    }

    fn issue_from_row(r: &Row<'_>) -> rusqlite::Result<Issue> {
        Ok(Issue {
            id: IssueId(r.get(0)?),
            course_id: CourseId(r.get(1)?),
            validation: r.get(2)?,
            state: IssueState::from_i64(r.get(3)?),
            first_seen: r.get(4)?,
            last_seen: r.get(5)?,
            resolved_at: r.get(6)?,
        })
    }

    /// Collects a per-course query into a vector.
    fn query_course<T>(
        &self,
        sql: &str,
        course_id: CourseId,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![course_id.0], map)?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Replaces everything stored for the snapshot's course.
    pub fn import_snapshot(&self, snap: &CourseSnapshot) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let course = &snap.course;
        let id = course.id.0;
        let tx = conn.unchecked_transaction()?;

        for (table, column) in [
            ("mdl_course_sections", "course"),
            ("mdl_course_modules", "course"),
            ("mdl_forum", "course"),
            ("mdl_url", "course"),
            ("mdl_label", "course"),
            ("mdl_grade_categories", "courseid"),
            ("mdl_grade_items", "courseid"),
            ("mdl_assign", "course"),
            ("mdl_course", "id"),
        ] {
            tx.execute(&format!("DELETE FROM {table} WHERE {column} = ?1"), params![id])?;
        }

        tx.execute(
            &format!("INSERT INTO mdl_course({COURSE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                id,
                course.category.0,
                course.shortname,
                course.fullname,
                course.visible as i64,
                course.start_date,
                course.end_date,
                course.enable_completion as i64,
                course.show_completion_conditions as i64,
                course.show_activity_dates as i64
            ],
        )?;

        // Section 0 first, then every other section a module points at.
        let mut sections: Vec<SectionId> = snap.section_zero.into_iter().collect();
        let others: BTreeSet<SectionId> = snap
            .modules
            .iter()
            .map(|m| m.section)
            .filter(|s| Some(*s) != snap.section_zero)
            .collect();
        sections.extend(others);
        let first_number = if snap.section_zero.is_some() { 0 } else { 1 };
        for (n, section) in sections.iter().enumerate() {
            tx.execute(
                "INSERT INTO mdl_course_sections(id, course, section) VALUES (?1, ?2, ?3)",
                params![section.0, id, n as i64 + first_number],
            )
            .with_context(|| format!("insert section {section} of course {id}"))?;
        }

        for m in &snap.modules {
            tx.execute("INSERT OR IGNORE INTO mdl_modules(name) VALUES (?1)", params![m.module])?;
            let module: i64 =
                tx.query_row("SELECT id FROM mdl_modules WHERE name = ?1", params![m.module], |r| r.get(0))?;
            tx.execute(
                "INSERT INTO mdl_course_modules(id, course, module, instance, section, completion)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![m.id.0, id, module, m.instance.0, m.section.0, m.completion.as_i64()],
            )
            .with_context(|| format!("insert course module {}", m.id))?;
        }

        for f in &snap.forums {
            tx.execute(
                "INSERT INTO mdl_forum(id, course, type, name) VALUES (?1, ?2, ?3, ?4)",
                params![f.id.0, id, f.forum_type.as_str(), f.name],
            )?;
        }
        for u in &snap.urls {
            tx.execute(
                "INSERT INTO mdl_url(id, course, name, externalurl) VALUES (?1, ?2, ?3, ?4)",
                params![u.id.0, id, u.name, u.external_url],
            )?;
        }
        for l in &snap.labels {
            tx.execute(
                "INSERT INTO mdl_label(id, course, intro) VALUES (?1, ?2, ?3)",
                params![l.id.0, id, l.intro],
            )?;
        }
        for a in &snap.assignments {
            tx.execute(
                "INSERT INTO mdl_assign(id, course, name, markingworkflow) VALUES (?1, ?2, ?3, ?4)",
                params![a.id.0, id, a.name, a.marking_workflow as i64],
            )?;
        }

        for item in &snap.grade_items {
            tx.execute(
                "INSERT INTO mdl_grade_items(id, courseid, categoryid, itemname, itemtype, itemmodule, iteminstance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    item.id.0,
                    id,
                    item.category_id.map(|c| c.0),
                    item.name,
                    item.item_type.as_str(),
                    item.item_module,
                    item.item_instance.map(|i| i.0)
                ],
            )
            .with_context(|| format!("insert grade item {}", item.id))?;
        }
        for c in &snap.grade_categories {
            tx.execute(
                "INSERT INTO mdl_grade_categories(id, courseid, fullname, depth) VALUES (?1, ?2, ?3, ?4)",
                params![c.id.0, id, c.name, c.depth],
            )?;
            // The host keeps category weights on the category's own grade item.
            // A snapshot that already lists that item gets the weight written onto it.
            if let Some(w) = c.weight {
                let updated = tx.execute(
                    "UPDATE mdl_grade_items
                        SET aggregationcoef = ?3, aggregationcoef2 = ?4, weightoverride = ?5
                      WHERE courseid = ?1 AND itemtype = 'category' AND iteminstance = ?2",
                    params![id, c.id.0, w.aggregation_coef, w.aggregation_coef2, w.weight_override as i64],
                )?;
                if updated > 0 {
                    continue;
                }
                tx.execute(
                    "INSERT INTO mdl_grade_items(courseid, itemname, itemtype, iteminstance,
                                                 aggregationcoef, aggregationcoef2, weightoverride)
                     VALUES (?1, ?2, 'category', ?3, ?4, ?5, ?6)",
                    params![id, c.name, c.id.0, w.aggregation_coef, w.aggregation_coef2, w.weight_override as i64],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl CourseRepository for SqliteStorage {
    fn list_courses(&self) -> Result<Vec<Course>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {COURSE_COLUMNS} FROM mdl_course ORDER BY id"))?;
        let rows = stmt.query_map([], Self::course_from_row)?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn course(&self, course_id: CourseId) -> Result<Option<Course>> {
        let conn = self.conn.lock().unwrap();
        let course = conn
            .query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM mdl_course WHERE id = ?1"),
                params![course_id.0],
                Self::course_from_row,
            )
            .optional()?;
        Ok(course)
    }

    fn section_zero(&self, course_id: CourseId) -> Result<Option<SectionId>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                "SELECT id FROM mdl_course_sections WHERE course = ?1 AND section = 0 ORDER BY id LIMIT 1",
                params![course_id.0],
                |r| r.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(SectionId))
    }

    fn module_type(&self, name: &str) -> Result<Option<ModuleType>> {
        let conn = self.conn.lock().unwrap();
        let m = conn
            .query_row("SELECT id, name FROM mdl_modules WHERE name = ?1", params![name], |r| {
                Ok(ModuleType {
                    id: ModuleTypeId(r.get(0)?),
                    name: r.get(1)?,
                })
            })
            .optional()?;
        Ok(m)
    }

    fn course_modules(&self, course_id: CourseId) -> Result<Vec<CourseModule>> {
        self.query_course(
            "SELECT id, module, instance, section, completion FROM mdl_course_modules WHERE course = ?1 ORDER BY id",
            course_id,
            |r| {
                Ok(CourseModule {
                    id: CourseModuleId(r.get(0)?),
                    module: ModuleTypeId(r.get(1)?),
                    instance: InstanceId(r.get(2)?),
                    section: SectionId(r.get(3)?),
                    completion: CompletionTracking::from_i64(r.get(4)?),
                })
            },
        )
    }

    fn forums(&self, course_id: CourseId) -> Result<Vec<Forum>> {
        self.query_course(
            "SELECT id, name, type FROM mdl_forum WHERE course = ?1 ORDER BY id",
            course_id,
            |r| {
                Ok(Forum {
                    id: InstanceId(r.get(0)?),
                    name: r.get(1)?,
                    forum_type: ForumType::parse(&r.get::<_, String>(2)?),
                })
            },
        )
    }

    fn urls(&self, course_id: CourseId) -> Result<Vec<UrlResource>> {
        self.query_course(
            "SELECT id, name, externalurl FROM mdl_url WHERE course = ?1 ORDER BY id",
            course_id,
            |r| {
                Ok(UrlResource {
                    id: InstanceId(r.get(0)?),
                    name: r.get(1)?,
                    external_url: r.get(2)?,
                })
            },
        )
    }

    fn labels(&self, course_id: CourseId) -> Result<Vec<Label>> {
        self.query_course("SELECT id, intro FROM mdl_label WHERE course = ?1 ORDER BY id", course_id, |r| {
            Ok(Label {
                id: InstanceId(r.get(0)?),
                intro: r.get(1)?,
            })
        })
    }

    fn grade_categories(&self, course_id: CourseId) -> Result<Vec<GradeCategory>> {
        self.query_course(
            "SELECT gc.id, gc.fullname, gc.depth, gi.id, gi.aggregationcoef, gi.aggregationcoef2, gi.weightoverride
               FROM mdl_grade_categories gc
               LEFT JOIN mdl_grade_items gi
                 ON gi.id = (SELECT MIN(x.id) FROM mdl_grade_items x
                              WHERE x.courseid = gc.courseid AND x.itemtype = 'category' AND x.iteminstance = gc.id)
              WHERE gc.courseid = ?1
              ORDER BY gc.id",
            course_id,
            |r| {
                let item: Option<i64> = r.get(3)?;
                let weight = match item {
                    Some(_) => Some(CategoryWeight {
                        aggregation_coef: r.get(4)?,
                        aggregation_coef2: r.get(5)?,
                        weight_override: r.get::<_, i64>(6)? != 0,
                    }),
                    None => None,
                };
                Ok(GradeCategory {
                    id: GradeCategoryId(r.get(0)?),
                    name: r.get(1)?,
                    depth: r.get(2)?,
                    weight,
                })
            },
        )
    }

    fn grade_items(&self, course_id: CourseId) -> Result<Vec<GradeItem>> {
        self.query_course(
            "SELECT id, itemname, categoryid, itemtype, itemmodule, iteminstance
               FROM mdl_grade_items WHERE courseid = ?1 ORDER BY id",
            course_id,
            |r| {
                Ok(GradeItem {
                    id: GradeItemId(r.get(0)?),
                    name: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    category_id: r.get::<_, Option<i64>>(2)?.map(GradeCategoryId),
                    item_type: GradeItemType::parse(&r.get::<_, String>(3)?),
                    item_module: r.get(4)?,
                    item_instance: r.get::<_, Option<i64>>(5)?.map(InstanceId),
                })
            },
        )
    }

    fn assignments(&self, course_id: CourseId) -> Result<Vec<Assignment>> {
        self.query_course(
            "SELECT id, name, markingworkflow FROM mdl_assign WHERE course = ?1 ORDER BY id",
            course_id,
            |r| {
                Ok(Assignment {
                    id: InstanceId(r.get(0)?),
                    name: r.get(1)?,
                    marking_workflow: r.get::<_, i64>(2)? != 0,
                })
            },
        )
    }
}

impl IssueStore for SqliteStorage {
    fn open_issues(&self, course_id: CourseId) -> Result<Vec<Issue>> {
        self.query_course(
            &format!(
                "SELECT {ISSUE_COLUMNS} FROM mdl_block_validacursos_issues
                  WHERE courseid = ?1 AND resolvedat IS NULL ORDER BY id"
            ),
            course_id,
            Self::issue_from_row,
        )
    }

    fn apply_changes(&self, course_id: CourseId, changes: &[IssueChange], now_unix: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;

        for change in changes {
            match change {
                IssueChange::Open { validation } => {
                    tx.execute(
                        "INSERT INTO mdl_block_validacursos_issues
                           (courseid, validation, state, firstseen, lastseen, resolvedat, timecreated, timemodified)
                         VALUES (?1, ?2, ?3, ?4, ?4, NULL, ?4, ?4)",
                        params![course_id.0, validation, IssueState::Open.as_i64(), now_unix],
                    )
                    .with_context(|| format!("open issue for course {course_id} / {validation}"))?;
                }
                IssueChange::Refresh { issue_id } => {
                    let n = tx.execute(
                        "UPDATE mdl_block_validacursos_issues SET lastseen = ?1, timemodified = ?1
                          WHERE id = ?2 AND courseid = ?3 AND resolvedat IS NULL",
                        params![now_unix, issue_id.0, course_id.0],
                    )?;
                    if n == 0 {
                        bail!("no open issue {issue_id} for course {course_id}");
                    }
                }
                IssueChange::Resolve { issue_id } => {
                    let n = tx.execute(
                        "UPDATE mdl_block_validacursos_issues SET state = ?1, resolvedat = ?2, timemodified = ?2
                          WHERE id = ?3 AND courseid = ?4 AND resolvedat IS NULL",
                        params![IssueState::Resolved.as_i64(), now_unix, issue_id.0, course_id.0],
                    )?;
                    if n == 0 {
                        bail!("no open issue {issue_id} for course {course_id}");
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM mdl_block_validacursos_issues WHERE 1 = 1");
        let mut args: Vec<Value> = vec![];
        if filter.open_only {
            sql.push_str(" AND resolvedat IS NULL");
        }
        if let Some(c) = filter.course_id {
            args.push(Value::Integer(c.0));
            sql.push_str(&format!(" AND courseid = ?{}", args.len()));
        }
        if let Some(v) = &filter.validation {
            args.push(Value::Text(v.clone()));
            sql.push_str(&format!(" AND validation = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY lastseen DESC, id DESC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), Self::issue_from_row)?;
        let mut out = vec![];
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
