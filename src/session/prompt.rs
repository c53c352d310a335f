//! Interactive timing of a task attempt.

use super::timer::TaskTimer;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// How a timed attempt ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimedOutcome {
    /// The observer stopped the timer; seconds elapsed.
    Completed(f64),
    /// The observer pressed Ctrl-C; nothing should be saved.
    Aborted,
}

/// Time a task attempt: start now, stop when Enter is pressed.
pub async fn run_timed_task(task_name: &str, show_progress: bool) -> Result<TimedOutcome> {
    let mut timer = TaskTimer::new();

    println!("⏱️  Timing task: {}", task_name);
    println!("   Press Enter when the participant finishes, or Ctrl-C to abort.\n");

    timer.start(Instant::now());
    info!("Task timer started for {}", task_name);

    let spinner = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(task_name.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let stopped = tokio::select! {
        line = lines.next_line() => Some(line),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match stopped {
        Some(line) => {
            line.context("Failed to read from stdin")?;
            let seconds = timer.stop(Instant::now())?;
            debug!("Task timer stopped after {:.1}s", seconds);
            Ok(TimedOutcome::Completed(seconds))
        }
        None => {
            info!("Task timer aborted for {}", task_name);
            Ok(TimedOutcome::Aborted)
        }
    }
}
