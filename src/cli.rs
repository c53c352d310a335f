//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ReportFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// UXStudy - usability study session recorder
///
/// Records consent, demographics, task performance and exit questionnaire
/// answers into append-only CSV datasets, and aggregates them into a report.
///
/// Examples:
///   uxstudy intro
///   uxstudy consent --name "Ada Lovelace" --agree
///   uxstudy demographics --name Ada --age 36 --occupation Teacher --familiarity "Very familiar"
///   uxstudy task --task 1 --success yes --timed --notes "used the search box"
///   uxstudy exit --satisfaction 4 --difficulty 2 --q3 "A site map"
///   uxstudy report --format json --output report.json
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .uxstudy.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the study datasets
    #[arg(long, value_name = "DIR", env = "UXSTUDY_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Session steps and reporting.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the welcome text and the moderator's opening script
    Intro,
    /// Record participant consent
    Consent(ConsentArgs),
    /// Record the demographic questionnaire
    Demographics(DemographicsArgs),
    /// List the study tasks
    Tasks,
    /// Record the result of one task attempt
    Task(TaskArgs),
    /// Record the exit questionnaire
    Exit(ExitArgs),
    /// Aggregate all datasets into a report
    Report(ReportArgs),
    /// Generate a default .uxstudy.toml configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ConsentArgs {
    /// Participant name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Confirm the participant has read and agrees to the consent form
    #[arg(long)]
    pub agree: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DemographicsArgs {
    /// Participant name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Age in years
    #[arg(long, value_parser = clap::value_parser!(u32).range(18..=120))]
    pub age: u32,

    /// Occupation
    #[arg(long, default_value = "")]
    pub occupation: String,

    /// Familiarity with similar tools (one of the configured levels)
    #[arg(long, value_name = "LEVEL")]
    pub familiarity: String,
}

/// Outcome of a task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskOutcome {
    Yes,
    No,
    Partial,
}

impl TaskOutcome {
    /// Value written to the `success` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Yes => "Yes",
            TaskOutcome::No => "No",
            TaskOutcome::Partial => "Partial",
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TaskArgs {
    /// Task name or number (see `uxstudy tasks`)
    #[arg(long)]
    pub task: String,

    /// Was the task completed successfully?
    #[arg(long, value_name = "OUTCOME")]
    pub success: TaskOutcome,

    /// Time taken, in seconds
    #[arg(long, value_name = "SECS", conflicts_with = "timed")]
    pub duration: Option<f64>,

    /// Time the attempt interactively: starts now, stops on Enter
    #[arg(long)]
    pub timed: bool,

    /// Observer notes (e.g., click paths, verbal comments)
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExitArgs {
    /// Overall satisfaction (1=Low, 5=High)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub satisfaction: u8,

    /// Overall difficulty (1=Easy, 5=Hard)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulty: u8,

    /// What features of the product were vague or confusing to you, if any?
    #[arg(long, default_value = "")]
    pub q1: String,

    /// What is your impression about navigating the product?
    #[arg(long, default_value = "")]
    pub q2: String,

    /// What else should be included in the product?
    #[arg(long, default_value = "")]
    pub q3: String,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Output file path; prints to stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// These are the presence checks a participant form would perform
    /// before anything is submitted.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Consent(consent) => {
                if consent.name.trim().is_empty() || !consent.agree {
                    return Err("Please enter your name and agree to the consent form \
                                before proceeding."
                        .to_string());
                }
            }
            Command::Task(task) => {
                if let Some(duration) = task.duration {
                    if !duration.is_finite() || duration < 0.0 {
                        return Err("Duration must be a non-negative number of seconds"
                            .to_string());
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins
    /// over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            data_dir: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    fn task_args(duration: Option<f64>) -> TaskArgs {
        TaskArgs {
            task: "1".to_string(),
            success: TaskOutcome::Yes,
            duration,
            timed: false,
            notes: String::new(),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_consent_requires_name_and_agreement() {
        let mut consent = ConsentArgs {
            name: "  ".to_string(),
            agree: true,
        };
        assert!(make_args(Command::Consent(consent.clone())).validate().is_err());

        consent.name = "Ada".to_string();
        consent.agree = false;
        assert!(make_args(Command::Consent(consent.clone())).validate().is_err());

        consent.agree = true;
        assert!(make_args(Command::Consent(consent)).validate().is_ok());
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert!(make_args(Command::Task(task_args(Some(-1.0)))).validate().is_err());
        assert!(make_args(Command::Task(task_args(Some(12.0)))).validate().is_ok());
        assert!(make_args(Command::Task(task_args(None))).validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Intro);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rating_range_is_enforced_by_parser() {
        let ok = Args::try_parse_from(["uxstudy", "exit", "--satisfaction", "5", "--difficulty", "1"]);
        assert!(ok.is_ok());

        let out_of_range =
            Args::try_parse_from(["uxstudy", "exit", "--satisfaction", "6", "--difficulty", "1"]);
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_parse_task_command() {
        let args = Args::try_parse_from([
            "uxstudy", "task", "--task", "2", "--success", "partial", "--duration", "41.5",
        ])
        .unwrap();

        match args.command {
            Command::Task(task) => {
                assert_eq!(task.success, TaskOutcome::Partial);
                assert_eq!(task.success.as_str(), "Partial");
                assert_eq!(task.duration, Some(41.5));
                assert_eq!(task.notes, "");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Tasks);
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
