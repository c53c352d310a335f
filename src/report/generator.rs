//! Study report generation.
//!
//! This module renders an aggregated [`StudyReport`] as Markdown or JSON.

use crate::analysis::{display_mean, success_rates, Aggregate, CategoryReport, ExitAverages, ValueCount};
use crate::models::{ReportMetadata, StudyReport, Table};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &StudyReport, title: &str, bar_width: usize) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {} - Aggregated Results\n\n", title));
    output.push_str(&generate_metadata_section(&report.metadata));

    for section in &report.sections {
        output.push_str(&generate_category_section(section, bar_width));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!("- **Total Records:** {}\n", metadata.total_records));
    section.push('\n');

    section
}

/// Generate the section of one category: raw table plus aggregate.
fn generate_category_section(report: &CategoryReport, bar_width: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", report.category.title()));

    if report.raw_table.is_empty() {
        section.push_str(&format!(
            "*No {} data available yet.*\n\n",
            report.category.empty_label()
        ));
        return section;
    }

    section.push_str(&generate_table(&report.raw_table));

    match &report.aggregate {
        Some(Aggregate::SuccessDistribution { counts }) => {
            section.push_str(&generate_success_section(counts, bar_width));
        }
        Some(Aggregate::ExitAverages(averages)) => {
            section.push_str(&generate_averages_section(averages));
        }
        None => {}
    }

    section
}

/// Render a table as a Markdown table. Missing cells are left blank.
fn generate_table(table: &Table) -> String {
    let mut out = String::new();

    let header: Vec<String> = table.columns().iter().map(|c| escape_cell(c)).collect();
    out.push_str(&format!("| {} |\n", header.join(" | ")));
    out.push_str(&format!("|{}\n", ":---|".repeat(header.len())));

    for row in table.rows() {
        let cells: Vec<String> = row
            .cells()
            .iter()
            .map(|c| c.as_deref().map(escape_cell).unwrap_or_default())
            .collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    if !table.drifted_rows().is_empty() {
        out.push_str(&format!(
            "\n> ⚠️ {} row(s) did not match the dataset header and were realigned.\n",
            table.drifted_rows().len()
        ));
    }

    out.push('\n');
    out
}

/// Generate the task success distribution with a text bar chart.
fn generate_success_section(counts: &[ValueCount], bar_width: usize) -> String {
    let mut section = String::new();

    section.push_str("### Task Success Rate\n\n");

    if counts.is_empty() {
        section.push_str("*No task outcomes recorded.*\n\n");
        return section;
    }

    section.push_str("| Outcome | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for (count, (_, rate)) in counts.iter().zip(success_rates(counts)) {
        section.push_str(&format!(
            "| {} | {} | {:.0}% |\n",
            escape_cell(&count.value),
            count.count,
            rate * 100.0
        ));
    }
    section.push('\n');

    section.push_str("```\n");
    section.push_str(&render_bar_chart(counts, bar_width));
    section.push_str("```\n\n");

    section
}

/// Render counts as horizontal bars scaled to `width` characters.
fn render_bar_chart(counts: &[ValueCount], width: usize) -> String {
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0);
    let label_width = counts.iter().map(|c| c.value.chars().count()).max().unwrap_or(0);
    let mut chart = String::new();

    for c in counts {
        let len = if max == 0 {
            0
        } else {
            // Every non-zero count gets at least one block.
            ((c.count * width) / max).max(1)
        };
        chart.push_str(&format!(
            "{:<label_width$} {} {}\n",
            c.value,
            "█".repeat(len),
            c.count,
            label_width = label_width
        ));
    }

    chart
}

/// Generate the exit questionnaire averages.
fn generate_averages_section(averages: &ExitAverages) -> String {
    let mut section = String::new();

    section.push_str("### Exit Questionnaire Averages\n\n");
    section.push_str(&format!(
        "- **Avg Satisfaction:** {}\n",
        display_mean(averages.satisfaction.as_ref())
    ));
    section.push_str(&format!(
        "- **Avg Difficulty:** {}\n\n",
        display_mean(averages.difficulty.as_ref())
    ));

    section
}

/// Make text safe inside a Markdown table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by uxstudy*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &StudyReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{summarize, Mean};
    use crate::models::Category;
    use chrono::NaiveDate;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::with_columns(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_raw(row.iter());
        }
        table
    }

    fn create_test_report() -> StudyReport {
        let metadata = ReportMetadata {
            generated_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            data_dir: "data".to_string(),
            total_records: 6,
        };

        let sections = vec![
            summarize(
                Category::Consent,
                table(&["timestamp", "name", "consent_given"], &[&["t", "Ada | L", "true"]]),
            ),
            summarize(Category::Demographic, Table::empty()),
            summarize(
                Category::Task,
                table(
                    &["task_name", "success"],
                    &[&["Find", "Yes"], &["Find", "Yes"], &["Check", "No"], &["Prep", "Partial"]],
                ),
            ),
            summarize(
                Category::Exit,
                table(&["satisfaction", "difficulty"], &[&["4", "2"]]),
            ),
        ];

        StudyReport { metadata, sections }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(), "Usability Testing Tool", 10);

        assert!(markdown.contains("# Usability Testing Tool - Aggregated Results"));
        assert!(markdown.contains("## Consent Data"));
        assert!(markdown.contains("*No demographic data available yet.*"));
        assert!(markdown.contains("### Task Success Rate"));
        assert!(markdown.contains("| Yes | 2 | 50% |"));
        assert!(markdown.contains("- **Avg Satisfaction:** 4.00"));
        assert!(markdown.contains("- **Total Records:** 6"));
    }

    #[test]
    fn test_table_cells_are_escaped() {
        let markdown = generate_table(&table(&["name"], &[&["Ada | L"], &[""]]));

        assert!(markdown.contains("| Ada \\| L |"));
        assert!(markdown.contains("|  |"));
    }

    #[test]
    fn test_drifted_rows_are_called_out() {
        let markdown = generate_table(&table(&["a", "b"], &[&["1"]]));
        assert!(markdown.contains("1 row(s) did not match"));
    }

    #[test]
    fn test_bar_chart_scales_to_width() {
        let counts = vec![
            ValueCount { value: "Yes".into(), count: 4 },
            ValueCount { value: "Partial".into(), count: 1 },
        ];

        let chart = render_bar_chart(&counts, 8);
        let lines: Vec<_> = chart.lines().collect();

        assert_eq!(lines[0], format!("Yes     {} 4", "█".repeat(8)));
        assert_eq!(lines[1], format!("Partial {} 1", "█".repeat(2)));
    }

    #[test]
    fn test_averages_without_values() {
        let section = generate_averages_section(&ExitAverages {
            satisfaction: Some(Mean { value: 10.0 / 3.0, samples: 3 }),
            difficulty: None,
        });

        assert!(section.contains("Avg Satisfaction:** 3.33"));
        assert!(section.contains("Avg Difficulty:** n/a"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"sections\""));
        assert!(json.contains("\"kind\": \"success_distribution\""));
        assert!(json.contains("\"category\": \"exit\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sections"][2]["aggregate"]["counts"][0]["value"], "Yes");
    }
}
