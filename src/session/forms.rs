//! Records submitted by each session step.
//!
//! Field names and order here define the columns of a fresh dataset.

use crate::models::Record;

/// Consent given by a named participant.
pub fn consent_record(name: &str) -> Record {
    Record::new()
        .with("name", name.trim())
        .with("consent_given", true)
}

/// Demographic questionnaire answers.
pub fn demographic_record(name: &str, age: u32, occupation: &str, familiarity: &str) -> Record {
    Record::new()
        .with("name", name.trim())
        .with("age", age)
        .with("occupation", occupation.trim())
        .with("familiarity", familiarity)
}

/// Result of one task attempt. An untimed attempt keeps an empty duration.
pub fn task_record(task_name: &str, success: &str, duration: Option<f64>, notes: &str) -> Record {
    let record = Record::new()
        .with("task_name", task_name)
        .with("success", success);

    let record = match duration {
        Some(seconds) => record.with("duration_seconds", seconds),
        None => record.with("duration_seconds", ""),
    };

    record.with("notes", notes)
}

/// Exit questionnaire answers.
pub fn exit_record(satisfaction: u8, difficulty: u8, q1: &str, q2: &str, q3: &str) -> Record {
    Record::new()
        .with("satisfaction", satisfaction)
        .with("difficulty", difficulty)
        .with("q1", q1)
        .with("q2", q2)
        .with("q3", q3)
}
