//! Task timer state machine.
//!
//! `Idle -> Running(start) -> Stopped(duration)`. The duration is handed to
//! the store as an ordinary `duration_seconds` field; the timer itself is
//! never persisted.

use std::time::Instant;
use thiserror::Error;

/// Errors from invalid timer transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("task timer is not running")]
    NotRunning,
}

/// Current state of a [`TaskTimer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerState {
    Idle,
    Running(Instant),
    Stopped(f64),
}

/// Times one task attempt.
#[derive(Debug, Clone)]
pub struct TaskTimer {
    state: TimerState,
}

impl Default for TaskTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Start (or restart) timing at `now`. A stopped duration is discarded.
    pub fn start(&mut self, now: Instant) {
        self.state = TimerState::Running(now);
    }

    /// Stop timing at `now` and return the elapsed seconds.
    pub fn stop(&mut self, now: Instant) -> Result<f64, TimerError> {
        match self.state {
            TimerState::Running(started) => {
                let seconds = now.saturating_duration_since(started).as_secs_f64();
                self.state = TimerState::Stopped(seconds);
                Ok(seconds)
            }
            _ => Err(TimerError::NotRunning),
        }
    }

    /// Recorded duration, if stopped.
    #[cfg(test)]
    pub fn duration_seconds(&self) -> Option<f64> {
        match self.state {
            TimerState::Stopped(seconds) => Some(seconds),
            _ => None,
        }
    }
}
