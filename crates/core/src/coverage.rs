//! Coverage report assembly for `/api/measures/component` responses

use crate::measures::{measures_to_set, select, strip_new_prefix, Measure, MetricSet};
use serde::{Deserialize, Serialize};

/// Current-code coverage metrics
pub const BRANCH_METRICS: [&str; 7] = [
    "coverage",
    "line_coverage",
    "branch_coverage",
    "lines_to_cover",
    "uncovered_lines",
    "uncovered_conditions",
    "conditions_to_cover",
];

/// New-code (leak period) coverage metrics
pub const NEW_CODE_METRICS: [&str; 7] = [
    "new_coverage",
    "new_line_coverage",
    "new_branch_coverage",
    "new_lines_to_cover",
    "new_uncovered_lines",
    "new_uncovered_conditions",
    "new_conditions_to_cover",
];

// =============================================================================
// API Response Types (Deserialization)
// =============================================================================

/// `/api/measures/component` response
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ComponentMeasuresResponse {
    #[serde(default)]
    pub component: ComponentMeasures,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ComponentMeasures {
    #[serde(default)]
    pub measures: Vec<Measure>,
}

// =============================================================================
// Output Domain Types
// =============================================================================

/// Coverage of a branch: current code plus new code
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CoverageReport {
    pub report_type: &'static str,
    pub project_key: String,
    pub branch: String,
    pub generated_at: String,
    pub metrics: MetricSet,
    pub new_code: MetricSet,
}

/// Coverage of a pull request
///
/// SonarQube only computes new-code metrics on pull requests, so there is no
/// `metrics` section at all.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PrCoverageReport {
    pub report_type: &'static str,
    pub project_key: String,
    pub pull_request: String,
    pub generated_at: String,
    pub new_code: MetricSet,
}

// =============================================================================
// Pure Transformation Functions
// =============================================================================

/// Every metric key requested for a branch, current-code keys first
pub fn branch_metric_keys() -> String {
    BRANCH_METRICS
        .iter()
        .chain(NEW_CODE_METRICS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(",")
}

/// Metric keys requested for a pull request
pub fn pr_metric_keys() -> String {
    NEW_CODE_METRICS.join(",")
}

/// New-code section: every new-code key, prefix stripped
fn new_code_section(measures: &MetricSet) -> MetricSet {
    strip_new_prefix(select(measures, &NEW_CODE_METRICS))
}

/// Build the branch coverage report
pub fn build_coverage_report(
    project_key: &str,
    branch: &str,
    response: ComponentMeasuresResponse,
    generated_at: String,
) -> CoverageReport {
    let measures = measures_to_set(&response.component.measures);

    CoverageReport {
        report_type: "coverage",
        project_key: project_key.to_string(),
        branch: branch.to_string(),
        generated_at,
        metrics: select(&measures, &BRANCH_METRICS),
        new_code: new_code_section(&measures),
    }
}

/// Build the pull request coverage report
pub fn build_pr_coverage_report(
    project_key: &str,
    pull_request: &str,
    response: ComponentMeasuresResponse,
    generated_at: String,
) -> PrCoverageReport {
    let measures = measures_to_set(&response.component.measures);

    PrCoverageReport {
        report_type: "pr_coverage",
        project_key: project_key.to_string(),
        pull_request: pull_request.to_string(),
        generated_at,
        new_code: new_code_section(&measures),
    }
}
