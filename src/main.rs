//! UXStudy - usability study session recorder
//!
//! A CLI that records each step of a moderated usability session into
//! append-only CSV datasets and aggregates them into a study report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid input, or the submission/report failed

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod session;
mod store;

use anyhow::{anyhow, Context, Result};
use cli::{Args, Command, TaskArgs};
use config::{Config, ReportFormat, StudyConfig, CONFIG_FILE_NAME};
use models::{Category, Record};
use session::TimedOutcome;
use std::path::{Path, PathBuf};
use store::{RecordStore, StoreConfig};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Presence checks before anything is submitted
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Config is read before logging so `[general] verbose` applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("UXStudy v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .uxstudy.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the data directory, tasks and study texts.");
    Ok(())
}

/// Initialize logging at the resolved level.
fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch one command.
async fn run(args: Args, config: Config) -> Result<()> {
    match &args.command {
        Command::Intro => {
            handle_intro(&config.study);
            Ok(())
        }
        Command::Tasks => {
            handle_tasks(&config.study);
            Ok(())
        }
        Command::Consent(consent) => submit(
            &config,
            Category::Consent,
            session::consent_record(&consent.name),
        ),
        Command::Demographics(demo) => {
            let familiarity = config
                .study
                .find_familiarity(&demo.familiarity)
                .ok_or_else(|| {
                    anyhow!(
                        "Unknown familiarity '{}'. Choose one of: {}",
                        demo.familiarity,
                        config.study.familiarity_levels.join(", ")
                    )
                })?;

            let record =
                session::demographic_record(&demo.name, demo.age, &demo.occupation, familiarity);
            submit(&config, Category::Demographic, record)
        }
        Command::Task(task) => handle_task(&config, task, !args.quiet).await,
        Command::Exit(exit) => submit(
            &config,
            Category::Exit,
            session::exit_record(exit.satisfaction, exit.difficulty, &exit.q1, &exit.q2, &exit.q3),
        ),
        Command::Report(_) => handle_report(&config),
        Command::InitConfig => handle_init_config(),
    }
}

/// Print the welcome text and the opening script.
fn handle_intro(study: &StudyConfig) {
    println!("# {}\n", study.title);
    println!("## Introduction\n");
    println!("{}\n", study.welcome);
    println!("## Opening Script\n");
    println!("{}\n", study.opening_script);
    println!("## Consent Form\n");
    println!("{}", study.consent_statement);
}

/// Print the task catalog.
fn handle_tasks(study: &StudyConfig) {
    if study.tasks.is_empty() {
        println!("No tasks are configured.");
        return;
    }

    for (i, task) in study.tasks.iter().enumerate() {
        println!("{}. {}", i + 1, task.name);
        println!("   {}\n", task.description);
    }
}

/// Record one task attempt, timing it interactively if asked.
async fn handle_task(config: &Config, task: &TaskArgs, show_progress: bool) -> Result<()> {
    let definition = config.study.find_task(&task.task).ok_or_else(|| {
        anyhow!(
            "Unknown task '{}'. Run `uxstudy tasks` to list the {} configured task(s).",
            task.task,
            config.study.tasks.len()
        )
    })?;

    println!("📋 {}", definition.name);
    println!("   {}\n", definition.description);

    let duration = if task.timed {
        match session::run_timed_task(&definition.name, show_progress).await? {
            TimedOutcome::Completed(seconds) => {
                println!("   Duration: {:.1}s", seconds);
                Some(seconds)
            }
            TimedOutcome::Aborted => {
                warn!("Timed attempt aborted; nothing saved");
                println!("\n⚠️  Task timing aborted. Nothing was saved.");
                return Ok(());
            }
        }
    } else {
        task.duration
    };

    let record = session::task_record(
        &definition.name,
        task.success.as_str(),
        duration,
        &task.notes,
    );
    submit(config, Category::Task, record)
}

/// Aggregate every dataset and emit the report.
fn handle_report(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let study_report =
        analysis::summarize_study(&store).context("Failed to load the study datasets")?;

    let output = match config.report.format {
        ReportFormat::Json => report::generate_json_report(&study_report)?,
        ReportFormat::Markdown => report::generate_markdown_report(
            &study_report,
            &config.study.title,
            config.report.bar_width,
        ),
    };

    match config.report.output {
        Some(ref path) => {
            let path = Path::new(path);
            report::write_report(&output, path)?;

            println!("📊 Study Summary:");
            for line in analysis::generate_summary_text(&study_report).lines() {
                println!("   {}", line);
            }
            println!("\n✅ Report saved to: {}", path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Append a record and report the outcome.
fn submit(config: &Config, category: Category, record: Record) -> Result<()> {
    let store = open_store(config)?;

    if let Some(drift) = store.check_drift(category, &record)? {
        debug!("Submission differs from {} header: {:?}", category, drift);
    }

    store
        .append(category, record)
        .with_context(|| format!("Failed to save {} record", category))?;

    info!("Saved {} record to {}", category, store.dataset_path(category).display());
    println!("✅ {}", saved_message(category));
    Ok(())
}

/// Confirmation shown after a successful submission.
fn saved_message(category: Category) -> &'static str {
    match category {
        Category::Consent => "Consent recorded. You may proceed to the demographics section.",
        Category::Demographic => "Demographic information recorded.",
        Category::Task => "Task results saved.",
        Category::Exit => "Exit questionnaire data saved.",
    }
}

/// Open the record store configured for this run.
fn open_store(config: &Config) -> Result<RecordStore> {
    RecordStore::open(StoreConfig::from(&config.store)).context("Failed to open the record store")
}

/// Where the configuration of this run came from.
enum ConfigSource {
    Explicit(PathBuf),
    Default,
    Builtin,
    Fallback(String),
}

impl ConfigSource {
    /// Report the source once logging is up.
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(reason) => warn!("Failed to load config: {}", reason),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    Ok(match Config::load_default() {
        Ok(Some(config)) => (config, ConfigSource::Default),
        Ok(None) => (Config::default(), ConfigSource::Builtin),
        Err(e) => (Config::default(), ConfigSource::Fallback(format!("{:#}", e))),
    })
}
