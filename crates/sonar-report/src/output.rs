//! Report rendering: JSON (compact or pretty) or a plain table, to stdout or a file

use crate::prelude::{eprintln, println, *};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use sonar_report_core::coverage::{CoverageReport, PrCoverageReport};
use sonar_report_core::issues::{IssueReport, IssueType, Severity};
use sonar_report_core::measures::{MetricSet, MetricValue};
use sonar_report_core::uncovered::UncoveredLinesReport;

/// Human-readable rendering of a report
pub trait Render {
    fn render(&self) -> String;
}

/// Spinner on stderr, hidden with `--quiet`
pub fn spinner(global: &crate::Global, msg: impl Into<String>) -> ProgressBar {
    if global.quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(msg.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// Helper to set spinner message if spinner is present
pub fn set_spinner_msg(spinner: Option<&ProgressBar>, msg: impl Into<String>) {
    if let Some(s) = spinner {
        s.set_message(msg.into());
    }
}

/// Serialize a report according to the global flags
pub fn format_report<R: Serialize + Render>(
    report: &R,
    global: &crate::Global,
) -> Result<String, Error> {
    if global.table {
        return Ok(report.render());
    }

    let text = if global.pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    };

    text.map_err(|e| Error::Io {
        path: "<report>".to_string(),
        message: e.to_string(),
    })
}

/// Write a report to stdout or to `--output`
pub fn emit<R: Serialize + Render>(report: &R, global: &crate::Global) -> Result<()> {
    let text = format_report(report, global)?;

    match &global.output_path {
        Some(path) => {
            std::fs::write(path, &text).map_err(|e| Error::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            eprintln!("Report written to '{}'", path.display());
        }
        None => println!("{}", text),
    }

    Ok(())
}

/// Table text for a projected issue field: strings unquoted, other JSON as-is
fn field_text(field: &Option<serde_json::Value>) -> Option<String> {
    match field {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(text.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn display_value(value: Option<&Option<MetricValue>>) -> String {
    match value {
        Some(Some(v)) => v.to_string(),
        _ => "-".to_string(),
    }
}

fn metrics_table(columns: &[(&str, &MetricSet)]) -> prettytable::Table {
    let mut table = new_table();

    let mut header = vec![prettytable::Cell::new("Metric")];
    header.extend(columns.iter().map(|(name, _)| prettytable::Cell::new(name)));
    table.add_row(prettytable::Row::new(header));

    if let Some((_, first)) = columns.first() {
        for key in first.keys() {
            let mut row = vec![prettytable::Cell::new(key)];
            row.extend(
                columns
                    .iter()
                    .map(|(_, set)| prettytable::Cell::new(&display_value(set.get(key)))),
            );
            table.add_row(prettytable::Row::new(row));
        }
    }

    table
}

impl Render for IssueReport {
    fn render(&self) -> String {
        let scope = self
            .pull_request
            .as_ref()
            .map(|pr| f!("PR #{pr}"))
            .or_else(|| self.branch.as_ref().map(|b| f!("branch '{b}'")))
            .unwrap_or_default();

        let mut counts = new_table();
        counts.add_row(prettytable::row!["Severity", "Count", "Type", "Count"]);
        for (index, severity) in Severity::ALL.iter().enumerate() {
            let severity_count = self.summary.by_severity.get(severity).copied().unwrap_or(0);
            let (type_name, type_count) = match IssueType::ALL.get(index) {
                Some(issue_type) => (
                    issue_type.as_str().to_string(),
                    self.summary.by_type.get(issue_type).copied().unwrap_or(0).to_string(),
                ),
                None => (String::new(), String::new()),
            };
            counts.add_row(prettytable::row![
                severity.as_str(),
                severity_count,
                type_name,
                type_count
            ]);
        }

        let mut issues = new_table();
        issues.add_row(prettytable::row!["Key", "Severity", "Type", "Location", "Message"]);
        for issue in &self.issues {
            let location = match (field_text(&issue.component), field_text(&issue.line)) {
                (Some(component), Some(line)) => f!("{component}:{line}"),
                (Some(component), None) => component,
                _ => String::new(),
            };
            issues.add_row(prettytable::row![
                field_text(&issue.key).unwrap_or_else(|| "-".to_string()),
                field_text(&issue.severity).unwrap_or_else(|| "-".to_string()),
                field_text(&issue.issue_type).unwrap_or_else(|| "-".to_string()),
                location,
                field_text(&issue.message).unwrap_or_default()
            ]);
        }

        f!(
            "{} for {} ({}): {} issue(s)\n\n{}\n{}",
            self.report_type,
            self.project_key,
            scope,
            self.summary.total,
            counts,
            issues
        )
    }
}

impl Render for CoverageReport {
    fn render(&self) -> String {
        f!(
            "Coverage for {} on branch '{}'\n\n{}",
            self.project_key,
            self.branch,
            metrics_table(&[("Overall", &self.metrics), ("New code", &self.new_code)])
        )
    }
}

impl Render for PrCoverageReport {
    fn render(&self) -> String {
        f!(
            "Coverage for {} PR #{}\n\n{}",
            self.project_key,
            self.pull_request,
            metrics_table(&[("New code", &self.new_code)])
        )
    }
}

impl Render for UncoveredLinesReport {
    fn render(&self) -> String {
        let mut table = new_table();
        table.add_row(prettytable::row!["File", "Uncovered", "Lines"]);
        for file in &self.files {
            let lines = file
                .lines
                .iter()
                .map(|l| l.line.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(prettytable::row![
                file.path.as_deref().unwrap_or(&file.key),
                file.uncovered_lines,
                lines
            ]);
        }

        f!(
            "Uncovered lines for {}: {} line(s) in {} file(s)\n\n{}",
            self.project_key,
            self.summary.uncovered_lines,
            self.summary.files,
            table
        )
    }
}
