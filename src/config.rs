//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.uxstudy.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".uxstudy.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreSettings,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Study content shown to participants.
    #[serde(default)]
    pub study: StudyConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding the CSV datasets.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: ReportFormat,

    /// Output file; the report goes to stdout when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Width of the longest bar in the success chart.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            output: None,
            bar_width: default_bar_width(),
        }
    }
}

fn default_bar_width() -> usize {
    30
}

/// A task participants are asked to attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub description: String,
}

/// Texts and choices presented during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_welcome")]
    pub welcome: String,

    /// Read aloud by the moderator before the first task.
    #[serde(default = "default_opening_script")]
    pub opening_script: String,

    #[serde(default = "default_consent_statement")]
    pub consent_statement: String,

    /// Answers accepted for the familiarity question.
    #[serde(default = "default_familiarity_levels")]
    pub familiarity_levels: Vec<String>,

    #[serde(default = "default_tasks")]
    pub tasks: Vec<TaskDefinition>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            welcome: default_welcome(),
            opening_script: default_opening_script(),
            consent_statement: default_consent_statement(),
            familiarity_levels: default_familiarity_levels(),
            tasks: default_tasks(),
        }
    }
}

fn default_title() -> String {
    "Usability Testing Tool".to_string()
}

fn default_welcome() -> String {
    "Welcome to the automated Usability Testing Tool. This application will guide \
     participants through consent, demographics, tasks, and feedback collection, and \
     then aggregate results into a report."
        .to_string()
}

fn default_opening_script() -> String {
    "Hi, thank you for participating in this usability test. We are testing the \
     interface, not you. Please think aloud as you perform each step. If you get stuck, \
     try to explore the interface; we'll answer any questions after the session."
        .to_string()
}

fn default_consent_statement() -> String {
    "I, _________________________, consent to the use of the information collected \
     during this usability test for the purpose of improving the product. I understand \
     that my personal information will be kept confidential and will not be used for \
     any commercial purpose."
        .to_string()
}

fn default_familiarity_levels() -> Vec<String> {
    vec!["Not at all familiar", "Somewhat familiar", "Very familiar"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tasks() -> Vec<TaskDefinition> {
    [
        (
            "Finding the Lesson Plans",
            "You need to incorporate censorship and art into your curriculum next month. \
             You have heard that the Blanton Museum has some TEKS aligned activities for \
             students. How would you find this resource?",
        ),
        (
            "TEKS Objectives Check",
            "Will the objectives and activities related to 'Overcoming Censorship Through \
             Art' meet the XY & Z TEKS you need to cover this month?",
        ),
        (
            "Materials Preparation",
            "What do you need to do to prepare to use 'Overcoming Censorship Through Art'?",
        ),
        (
            "Access Student Version",
            "How would you access the online student activities related to 'Overcoming \
             Censorship Through Art'?",
        ),
    ]
    .into_iter()
    .map(|(name, description)| TaskDefinition {
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

impl StudyConfig {
    /// Resolve a task by exact name (case-insensitive) or 1-based number.
    pub fn find_task(&self, selector: &str) -> Option<&TaskDefinition> {
        let selector = selector.trim();

        if let Ok(number) = selector.parse::<usize>() {
            return number.checked_sub(1).and_then(|i| self.tasks.get(i));
        }

        self.tasks
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(selector))
    }

    /// Resolve a familiarity answer (case-insensitive) to its configured spelling.
    pub fn find_familiarity(&self, answer: &str) -> Option<&str> {
        self.familiarity_levels
            .iter()
            .find(|level| level.eq_ignore_ascii_case(answer.trim()))
            .map(String::as_str)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.store.data_dir = data_dir.display().to_string();
        }

        if let crate::cli::Command::Report(ref report) = args.command {
            if let Some(format) = report.format {
                self.report.format = format;
            }
            if let Some(ref output) = report.output {
                self.report.output = Some(output.display().to_string());
            }
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
