use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use valida_core::{CourseId, IssueFilter};
use valida_rules::text::html_to_text;
use valida_runner::report::{self, IssueRow};
use valida_runner::{check_snapshot, CheckOptions, Config, CourseCheck, Runner};

#[derive(Parser)]
#[command(name = "valida", version, about = "Course compliance checks and issue history")]
struct Cli {
    /// Configuration file (created with defaults when missing)
    #[arg(long, global = true, default_value = "valida.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration and create the database
    Init {
        #[arg(long)]
        site_url: Option<String>,
    },

    /// Check one course from the database
    Check {
        #[arg(long)]
        course: i64,
        #[arg(long)]
        json: bool,
        /// Update the issue history with the results
        #[arg(long)]
        record: bool,
        /// Check the course even outside the allowed categories
        #[arg(long)]
        force: bool,
    },

    /// Check a YAML course snapshot without a database
    CheckSnapshot {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Check every eligible course and record the results
    ValidateAll,

    /// Import a YAML course snapshot into the database
    Import { file: PathBuf },

    /// Issue history reports
    Report {
        /// Include resolved issues in the listing
        #[arg(long)]
        all: bool,
        #[arg(long)]
        validation: Option<String>,
        #[arg(long)]
        course: Option<i64>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[arg(long, value_enum, default_value_t = View::Issues)]
        view: View,
        /// Rows shown by the `top` view
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Csv,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Issues,
    Overview,
    Validations,
    Top,
    Courses,
    Ok,
}

fn print_check(check: &CourseCheck, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(check)?);
        return Ok(());
    }
    println!("{} ({}) [{}]", check.course.fullname, check.course.shortname, check.course.id);
    for r in &check.results {
        let mark = if r.passed { "OK  " } else { "FAIL" };
        println!("  [{mark}] {}: {}", r.name, r.message);
        for (label, value) in r.details.iter() {
            println!("         {label}: {}", html_to_text(value));
        }
    }
    println!("{} checks, {} failing", check.results.len(), check.failed());
    if let Some(h) = &check.history {
        println!(
            "history: {} opened, {} refreshed, {} resolved",
            h.opened, h.refreshed, h.resolved
        );
    }
    Ok(())
}

fn print_issue_rows(rows: &[IssueRow]) {
    for r in rows {
        let state = if r.resolved_at.is_some() { "resolved" } else { "open" };
        println!(
            "- #{} {} [{}] {} ({}) last seen {}",
            r.id,
            r.shortname,
            r.course_id,
            r.validation,
            state,
            valida_rules::rules::format_timestamp(r.last_seen)
        );
    }
    println!("{} issues", rows.len());
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    tracing::debug!(config = %cli.config.display(), "valida starting");

    match cli.cmd {
        Command::Init { site_url } => {
            Runner::init(&cli.config, site_url.as_deref())?;
            println!("Initialized valida with {}", cli.config.display());
        }
        Command::Check {
            course,
            json,
            record,
            force,
        } => {
            let r = Runner::open(cli.config)?;
            let check = r.check_course(CourseId(course), CheckOptions { record, force })?;
            print_check(&check, json)?;
        }
        Command::CheckSnapshot { file, json } => {
            let validation = if cli.config.exists() {
                Config::load_from(&cli.config)?.to_validation_config()?
            } else {
                Default::default()
            };
            let check = check_snapshot(&file, &validation)?;
            print_check(&check, json)?;
        }
        Command::ValidateAll => {
            let r = Runner::open(cli.config)?;
            let s = r.validate_all()?;
            println!(
                "Validate all courses: {} courses processed, {} skipped, {} errors.",
                s.processed, s.skipped, s.errors
            );
            for (course, err) in &s.failures {
                println!("  course {course}: {err}");
            }
        }
        Command::Import { file } => {
            let r = Runner::open(cli.config)?;
            let id = r.import_snapshot(&file)?;
            println!("Imported course {} from {}", id, file.display());
        }
        Command::Report {
            all,
            validation,
            course,
            format,
            view,
            limit,
        } => {
            let r = Runner::open(cli.config)?;
            let (repo, store) = (&r.storage, &r.storage);
            match view {
                View::Issues => {
                    let filter = IssueFilter {
                        open_only: !all,
                        course_id: course.map(CourseId),
                        validation,
                    };
                    let rows = report::issue_listing(repo, store, &filter)?;
                    match format {
                        Format::Text => print_issue_rows(&rows),
                        Format::Csv => print!("{}", report::issues_to_csv(&rows)),
                        Format::Json => println!("{}", report::to_json(&rows)?),
                    }
                }
                View::Overview => {
                    let o = report::overview(store)?;
                    if format == Format::Json {
                        println!("{}", report::to_json(&o)?);
                    } else {
                        println!("Courses validated: {}", o.courses_validated);
                        println!("Courses with open issues: {}", o.courses_with_issues);
                        println!("Courses without issues: {}", o.courses_ok);
                        println!("Open issues: {}", o.open_issues);
                        println!("Compliance rate: {:.1}%", o.compliance_rate);
                    }
                }
                View::Validations => {
                    let counts = report::issues_by_validation(store)?;
                    if format == Format::Json {
                        println!("{}", report::to_json(&counts)?);
                    } else {
                        for c in &counts {
                            println!("{:>5}  {}", c.count, c.validation);
                        }
                    }
                }
                View::Top | View::Courses => {
                    let courses = if view == View::Top {
                        report::top_courses(repo, store, limit)?
                    } else {
                        report::courses_with_issues(repo, store)?
                    };
                    if format == Format::Json {
                        println!("{}", report::to_json(&courses)?);
                    } else {
                        for c in &courses {
                            println!("{:>3}  {} [{}] {}", c.open_issues, c.shortname, c.course_id, c.fullname);
                            if view == View::Courses {
                                println!("     {}", c.validations.join(", "));
                            }
                        }
                    }
                }
                View::Ok => {
                    let courses = report::ok_courses(repo, store)?;
                    if format == Format::Json {
                        println!("{}", report::to_json(&courses)?);
                    } else {
                        for c in &courses {
                            println!("{} [{}] {}", c.shortname, c.course_id, c.fullname);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
