//! Aggregation of study datasets.
//!
//! This module derives the statistics shown in the report: the task
//! success distribution and the exit questionnaire averages. All functions
//! except [`summarize_study`] are pure.

use crate::models::{Category, ReportMetadata, StudyReport, Table};
use crate::store::{RecordStore, StoreError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column counted for the task success distribution.
pub const SUCCESS_COLUMN: &str = "success";
/// Column averaged as overall satisfaction.
pub const SATISFACTION_COLUMN: &str = "satisfaction";
/// Column averaged as overall difficulty.
pub const DIFFICULTY_COLUMN: &str = "difficulty";

/// Number of rows holding one distinct value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Arithmetic mean over the numeric cells of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mean {
    pub value: f64,
    /// Number of cells that contributed.
    pub samples: usize,
}

impl Mean {
    /// The mean rounded to two decimal places.
    pub fn display(&self) -> String {
        format!("{:.2}", self.value)
    }
}

/// Averages of the exit questionnaire ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitAverages {
    /// `None` when no row holds a numeric satisfaction.
    pub satisfaction: Option<Mean>,
    /// `None` when no row holds a numeric difficulty.
    pub difficulty: Option<Mean>,
}

/// A statistic derived from one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    /// Task outcomes, most frequent first.
    SuccessDistribution { counts: Vec<ValueCount> },
    /// Exit questionnaire means.
    ExitAverages(ExitAverages),
}

/// The raw table of one category plus its aggregate, if it has one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Category,
    pub raw_table: Table,
    pub aggregate: Option<Aggregate>,
}

/// Summarize one category's table.
///
/// Consent and demographic data have no aggregate, and neither does an
/// empty table.
pub fn summarize(category: Category, table: Table) -> CategoryReport {
    let aggregate = if table.is_empty() {
        None
    } else {
        match category {
            Category::Task => frequency_counts(&table, SUCCESS_COLUMN)
                .map(|counts| Aggregate::SuccessDistribution { counts }),
            Category::Exit => Some(Aggregate::ExitAverages(ExitAverages {
                satisfaction: column_mean(&table, SATISFACTION_COLUMN),
                difficulty: column_mean(&table, DIFFICULTY_COLUMN),
            })),
            Category::Consent | Category::Demographic => None,
        }
    };

    CategoryReport {
        category,
        raw_table: table,
        aggregate,
    }
}

/// Load and summarize every category, in report order.
pub fn summarize_study(store: &RecordStore) -> Result<StudyReport, StoreError> {
    let mut sections = Vec::with_capacity(Category::ALL.len());

    for category in Category::ALL {
        let table = store.load_all(category)?;
        debug!("Summarizing {} ({} rows)", category, table.len());
        sections.push(summarize(category, table));
    }

    let metadata = ReportMetadata {
        generated_at: Local::now().naive_local(),
        data_dir: store.root().display().to_string(),
        total_records: sections.iter().map(|s| s.raw_table.len()).sum(),
    };

    Ok(StudyReport { metadata, sections })
}

/// Count the distinct values of a column.
///
/// Missing cells are not counted. Values are ordered by descending count;
/// ties keep the order in which the values first appeared. Returns `None`
/// if the column does not exist.
pub fn frequency_counts(table: &Table, column: &str) -> Option<Vec<ValueCount>> {
    let mut counts: Vec<ValueCount> = Vec::new();

    for value in table.column(column)?.flatten() {
        match counts.iter_mut().find(|c| c.value == value) {
            Some(entry) => entry.count += 1,
            None => counts.push(ValueCount {
                value: value.to_string(),
                count: 1,
            }),
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by_key(|c| std::cmp::Reverse(c.count));
    Some(counts)
}

/// Mean of the numeric cells of a column.
///
/// Missing and non-numeric cells are skipped. Returns `None` if the column
/// does not exist or holds no numeric cell.
pub fn column_mean(table: &Table, column: &str) -> Option<Mean> {
    let (sum, samples) = table
        .column(column)?
        .filter_map(|cell| cell.and_then(parse_numeric))
        .fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));

    (samples > 0).then(|| Mean {
        value: sum / samples as f64,
        samples,
    })
}

/// Parse a cell as a finite number.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Share of rows per value, as fractions of the counted total.
pub fn success_rates(counts: &[ValueCount]) -> Vec<(String, f64)> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }

    counts
        .iter()
        .map(|c| (c.value.clone(), c.count as f64 / total as f64))
        .collect()
}

/// Short console summary of a study report.
pub fn generate_summary_text(report: &StudyReport) -> String {
    let mut lines = Vec::new();

    for section in &report.sections {
        lines.push(format!(
            "{}: {} record(s)",
            section.category.title(),
            section.raw_table.len()
        ));

        match &section.aggregate {
            Some(Aggregate::SuccessDistribution { counts }) => {
                let parts: Vec<String> = counts
                    .iter()
                    .map(|c| format!("{} {}", c.value, c.count))
                    .collect();
                lines.push(format!("  Success: {}", parts.join(" | ")));
            }
            Some(Aggregate::ExitAverages(averages)) => {
                lines.push(format!(
                    "  Avg Satisfaction: {} | Avg Difficulty: {}",
                    display_mean(averages.satisfaction.as_ref()),
                    display_mean(averages.difficulty.as_ref())
                ));
            }
            None => {}
        }
    }

    lines.join("\n")
}

/// Two-decimal rendering of an optional mean.
pub fn display_mean(mean: Option<&Mean>) -> String {
    mean.map(Mean::display).unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::store::StoreConfig;
    use tempfile::tempdir;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::with_columns(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_raw(row.iter());
        }
        table
    }

    fn counts(report: &CategoryReport) -> Vec<(&str, usize)> {
        match &report.aggregate {
            Some(Aggregate::SuccessDistribution { counts }) => {
                counts.iter().map(|c| (c.value.as_str(), c.count)).collect()
            }
            other => panic!("expected success distribution, got {:?}", other),
        }
    }

    fn averages(report: &CategoryReport) -> ExitAverages {
        match &report.aggregate {
            Some(Aggregate::ExitAverages(averages)) => *averages,
            other => panic!("expected exit averages, got {:?}", other),
        }
    }

    #[test]
    fn test_task_success_counts() {
        let t = table(
            &["task_name", "success"],
            &[&["a", "Yes"], &["b", "Yes"], &["c", "No"], &["d", "Partial"]],
        );

        let report = summarize(Category::Task, t);

        assert_eq!(counts(&report), vec![("Yes", 2), ("No", 1), ("Partial", 1)]);
        assert_eq!(report.raw_table.len(), 4);
    }

    #[test]
    fn test_task_counts_include_unexpected_values() {
        let t = table(
            &["success"],
            &[&["Abandoned"], &["No"], &["Abandoned"], &["No"], &["No"], &[""]],
        );

        let report = summarize(Category::Task, t);

        // Descending count; the missing cell is not a value.
        assert_eq!(counts(&report), vec![("No", 3), ("Abandoned", 2)]);
    }

    #[test]
    fn test_task_count_ties_keep_first_seen_order() {
        let t = table(&["success"], &[&["Partial"], &["Yes"], &["No"]]);

        let report = summarize(Category::Task, t);

        assert_eq!(counts(&report), vec![("Partial", 1), ("Yes", 1), ("No", 1)]);
    }

    #[test]
    fn test_task_without_success_column_has_no_aggregate() {
        let t = table(&["task_name"], &[&["a"]]);
        assert!(summarize(Category::Task, t).aggregate.is_none());
    }

    #[test]
    fn test_exit_means() {
        let t = table(
            &["satisfaction", "difficulty"],
            &[&["4", "2"], &["5", "3"], &["3", "2"]],
        );

        let a = averages(&summarize(Category::Exit, t));

        let satisfaction = a.satisfaction.unwrap();
        let difficulty = a.difficulty.unwrap();
        assert_eq!(satisfaction.display(), "4.00");
        assert_eq!(difficulty.display(), "2.33");
        assert_eq!(satisfaction.samples, 3);
        assert!((difficulty.value - 7.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_exit_means_skip_non_numeric() {
        let t = table(
            &["satisfaction", "difficulty"],
            &[&["N/A", "1"], &["4", ""], &["2", "x"], &["nan", "2"]],
        );

        let a = averages(&summarize(Category::Exit, t));

        let satisfaction = a.satisfaction.unwrap();
        assert_eq!(satisfaction.samples, 2);
        assert_eq!(satisfaction.display(), "3.00");
        assert_eq!(a.difficulty.unwrap().display(), "1.50");
    }

    #[test]
    fn test_exit_without_numeric_values() {
        let t = table(&["satisfaction", "q1"], &[&["N/A", "fine"]]);

        let a = averages(&summarize(Category::Exit, t));

        assert!(a.satisfaction.is_none());
        assert!(a.difficulty.is_none());
        assert_eq!(display_mean(a.satisfaction.as_ref()), "n/a");
    }

    #[test]
    fn test_consent_and_demographic_have_no_aggregate() {
        let t = table(&["name"], &[&["Ada"]]);
        assert!(summarize(Category::Consent, t.clone()).aggregate.is_none());
        assert!(summarize(Category::Demographic, t).aggregate.is_none());
    }

    #[test]
    fn test_empty_table_has_no_aggregate() {
        for category in Category::ALL {
            let report = summarize(category, Table::empty());
            assert!(report.raw_table.is_empty());
            assert!(report.aggregate.is_none());
        }
    }

    #[test]
    fn test_success_rates() {
        let rates = success_rates(&[
            ValueCount { value: "Yes".into(), count: 3 },
            ValueCount { value: "No".into(), count: 1 },
        ]);
        assert_eq!(rates, vec![("Yes".to_string(), 0.75), ("No".to_string(), 0.25)]);
        assert!(success_rates(&[]).is_empty());
    }

    #[test]
    fn test_summarize_study_reads_every_category() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(StoreConfig {
            root_path: dir.path().to_path_buf(),
        })
        .unwrap();
        for success in ["Yes", "Yes", "No", "Partial"] {
            store
                .append(Category::Task, Record::new().with("task_name", "Find").with("success", success))
                .unwrap();
        }
        for (s, d) in [(4u8, 2u8), (5, 3), (3, 2)] {
            store
                .append(Category::Exit, Record::new().with("satisfaction", s).with("difficulty", d))
                .unwrap();
        }

        let report = summarize_study(&store).unwrap();

        let order: Vec<_> = report.sections.iter().map(|s| s.category).collect();
        assert_eq!(order, Category::ALL.to_vec());
        assert_eq!(report.metadata.total_records, 7);
        let task = report.section(Category::Task).unwrap();
        assert_eq!(counts(task), vec![("Yes", 2), ("No", 1), ("Partial", 1)]);
        let exit = report.section(Category::Exit).unwrap();
        assert_eq!(averages(exit).satisfaction.unwrap().display(), "4.00");

        let text = generate_summary_text(&report);
        assert!(text.contains("Consent Data: 0 record(s)"));
        assert!(text.contains("Success: Yes 2 | No 1 | Partial 1"));
        assert!(text.contains("Avg Satisfaction: 4.00 | Avg Difficulty: 2.33"));
    }
}
