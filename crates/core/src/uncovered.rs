//! Uncovered-lines report: component tree filtering and source line selection
//!
//! Built in two phases by the shell: the file components of the project are
//! listed with their `uncovered_lines` metric, then the source of every file
//! with uncovered lines is fetched and reduced to the lines nobody executed.

use crate::measures::{to_numeric, Measure};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Metric used to select files from the component tree
pub const UNCOVERED_LINES_METRIC: &str = "uncovered_lines";

/// Component qualifier for files
pub const FILE_QUALIFIER: &str = "FIL";

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup tag pattern is valid"));

/// Error raised when a report is asked for without a usable code location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("either a branch or a pull request must be specified")]
    Missing,
    #[error("a branch ({branch}) and a pull request ({pull_request}) cannot be combined")]
    Conflicting {
        branch: String,
        pull_request: String,
    },
}

/// Where in the project's history a report looks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeLocation {
    Branch(String),
    PullRequest(String),
}

impl CodeLocation {
    /// Pick the location from optional selectors; exactly one must be set
    ///
    /// Empty strings count as not set.
    pub fn from_selectors(
        branch: Option<&str>,
        pull_request: Option<&str>,
    ) -> Result<Self, LocationError> {
        let branch = branch.filter(|b| !b.is_empty());
        let pull_request = pull_request.filter(|p| !p.is_empty());

        match (branch, pull_request) {
            (Some(branch), None) => Ok(CodeLocation::Branch(branch.to_string())),
            (None, Some(pr)) => Ok(CodeLocation::PullRequest(pr.to_string())),
            (None, None) => Err(LocationError::Missing),
            (Some(branch), Some(pr)) => Err(LocationError::Conflicting {
                branch: branch.to_string(),
                pull_request: pr.to_string(),
            }),
        }
    }

    /// The query parameter that scopes a request to this location
    pub fn query_param(&self) -> (&'static str, String) {
        match self {
            CodeLocation::Branch(branch) => ("branch", branch.clone()),
            CodeLocation::PullRequest(pr) => ("pullRequest", pr.clone()),
        }
    }
}

// =============================================================================
// API Response Types (Deserialization)
// =============================================================================

/// A component from `/api/measures/component_tree`
#[derive(Debug, Deserialize, Clone)]
pub struct TreeComponent {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub qualifier: Option<String>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

/// `/api/sources/lines` response
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceLinesResponse {
    #[serde(default)]
    pub sources: Vec<SourceLine>,
}

/// One line of source with its coverage data
#[derive(Debug, Deserialize, Clone)]
pub struct SourceLine {
    pub line: u64,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(rename = "lineHits", default)]
    pub line_hits: Option<i64>,
    #[serde(rename = "utLineHits", default)]
    pub ut_line_hits: Option<i64>,
}

// =============================================================================
// Output Domain Types
// =============================================================================

/// A file selected from the component tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncoveredFile {
    pub key: String,
    pub path: Option<String>,
    pub uncovered_lines: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UncoveredLine {
    pub line: u64,
    pub code: String,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FileUncoveredLines {
    pub key: String,
    pub path: Option<String>,
    pub uncovered_lines: u64,
    pub lines: Vec<UncoveredLine>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UncoveredSummary {
    pub files: usize,
    pub uncovered_lines: u64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct UncoveredLinesReport {
    pub report_type: &'static str,
    pub project_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<String>,
    pub generated_at: String,
    pub summary: UncoveredSummary,
    pub files: Vec<FileUncoveredLines>,
}

// =============================================================================
// Pure Transformation Functions
// =============================================================================

/// Keep the components whose `uncovered_lines` metric is greater than zero
pub fn files_with_uncovered_lines(components: Vec<TreeComponent>) -> Vec<UncoveredFile> {
    components
        .into_iter()
        .filter_map(|component| {
            let uncovered = component
                .measures
                .iter()
                .filter(|m| m.metric == UNCOVERED_LINES_METRIC)
                .filter_map(to_numeric)
                .filter_map(|v| v.as_f64())
                .last()?;

            if uncovered <= 0.0 {
                return None;
            }

            Some(UncoveredFile {
                path: component.path.or(component.name),
                key: component.key,
                uncovered_lines: uncovered as u64,
            })
        })
        .collect()
}

/// Lines of a file that were never executed
///
/// The hit count is `lineHits`, falling back to `utLineHits`. Lines without
/// any hit count are not executable and are skipped.
pub fn uncovered_source_lines(response: SourceLinesResponse) -> Vec<UncoveredLine> {
    response
        .sources
        .into_iter()
        .filter(|source| source.line_hits.or(source.ut_line_hits) == Some(0))
        .map(|source| UncoveredLine {
            line: source.line,
            code: strip_markup(source.code.as_deref().unwrap_or_default()),
        })
        .collect()
}

/// Remove syntax-highlighting tags and decode HTML entities
pub fn strip_markup(code: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(code, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// Assemble the uncovered-lines report; totals cover the given files only
pub fn build_uncovered_lines_report(
    project_key: &str,
    location: CodeLocation,
    files: Vec<(UncoveredFile, Vec<UncoveredLine>)>,
    generated_at: String,
) -> UncoveredLinesReport {
    let files: Vec<FileUncoveredLines> = files
        .into_iter()
        .map(|(file, lines)| FileUncoveredLines {
            key: file.key,
            path: file.path,
            uncovered_lines: file.uncovered_lines,
            lines,
        })
        .collect();

    let summary = UncoveredSummary {
        files: files.len(),
        uncovered_lines: files.iter().map(|f| f.uncovered_lines).sum(),
    };

    let (branch, pull_request) = match location {
        CodeLocation::Branch(branch) => (Some(branch), None),
        CodeLocation::PullRequest(pr) => (None, Some(pr)),
    };

    UncoveredLinesReport {
        report_type: "uncovered_lines",
        project_key: project_key.to_string(),
        branch,
        pull_request,
        generated_at,
        summary,
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn components(raw: serde_json::Value) -> Vec<TreeComponent> {
        serde_json::from_value(raw).unwrap()
    }

    // ============================================================================
    // CodeLocation tests
    // ============================================================================

    #[test]
    fn test_location_branch() {
        let location = CodeLocation::from_selectors(Some("main"), None).unwrap();

        assert_eq!(location, CodeLocation::Branch("main".to_string()));
        assert_eq!(location.query_param(), ("branch", "main".to_string()));
    }

    #[test]
    fn test_location_pull_request() {
        let location = CodeLocation::from_selectors(None, Some("42")).unwrap();

        assert_eq!(location.query_param(), ("pullRequest", "42".to_string()));
    }

    #[test]
    fn test_location_missing() {
        assert_eq!(
            CodeLocation::from_selectors(None, None),
            Err(LocationError::Missing)
        );
        assert_eq!(
            CodeLocation::from_selectors(Some(""), None),
            Err(LocationError::Missing)
        );
    }

    #[test]
    fn test_location_conflicting() {
        let result = CodeLocation::from_selectors(Some("main"), Some("42"));

        assert!(matches!(result, Err(LocationError::Conflicting { .. })));
    }

    // ============================================================================
    // Component tree filtering tests
    // ============================================================================

    #[test]
    fn test_files_with_uncovered_lines_filters_zero() {
        let files = files_with_uncovered_lines(components(json!([
            {"key": "p:src/a.py", "path": "src/a.py", "qualifier": "FIL",
             "measures": [{"metric": "uncovered_lines", "value": "3"}]},
            {"key": "p:src/b.py", "path": "src/b.py", "qualifier": "FIL",
             "measures": [{"metric": "uncovered_lines", "value": "0"}]},
            {"key": "p:src/c.py", "path": "src/c.py", "qualifier": "FIL", "measures": []}
        ])));

        assert_eq!(
            files,
            vec![UncoveredFile {
                key: "p:src/a.py".to_string(),
                path: Some("src/a.py".to_string()),
                uncovered_lines: 3,
            }]
        );
    }

    #[test]
    fn test_files_with_uncovered_lines_reads_period_value() {
        let files = files_with_uncovered_lines(components(json!([
            {"key": "p:src/a.py", "name": "a.py",
             "measures": [{"metric": "uncovered_lines", "period": {"value": "7"}}]}
        ])));

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].uncovered_lines, 7);
        assert_eq!(files[0].path.as_deref(), Some("a.py"));
    }

    // ============================================================================
    // Source line tests
    // ============================================================================

    #[test]
    fn test_uncovered_source_lines_keeps_zero_hits_only() {
        let response: SourceLinesResponse = serde_json::from_value(json!({
            "sources": [
                {"line": 1, "code": "<span class=\"k\">def</span> f():", "lineHits": 3},
                {"line": 2, "code": "    <span class=\"k\">return</span> a &lt; b", "lineHits": 0},
                {"line": 3, "code": ""},
                {"line": 4, "code": "x = 1", "utLineHits": 0},
                {"line": 5, "code": "y = 2", "utLineHits": 1}
            ]
        }))
        .unwrap();

        let lines = uncovered_source_lines(response);

        assert_eq!(
            lines,
            vec![
                UncoveredLine { line: 2, code: "    return a < b".to_string() },
                UncoveredLine { line: 4, code: "x = 1".to_string() },
            ]
        );
    }

    #[test]
    fn test_line_hits_preferred_over_ut_line_hits() {
        let response: SourceLinesResponse = serde_json::from_value(json!({
            "sources": [{"line": 1, "code": "a", "lineHits": 2, "utLineHits": 0}]
        }))
        .unwrap();

        assert!(uncovered_source_lines(response).is_empty());
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<span class=\"cd\">// a &amp; b</span>"),
            "// a & b"
        );
        assert_eq!(strip_markup("plain"), "plain");
    }

    // ============================================================================
    // Report assembly tests
    // ============================================================================

    #[test]
    fn test_report_totals_sum_retained_files() {
        let files = vec![
            (
                UncoveredFile { key: "p:a".into(), path: Some("a".into()), uncovered_lines: 3 },
                vec![UncoveredLine { line: 1, code: "x".into() }],
            ),
            (
                UncoveredFile { key: "p:b".into(), path: Some("b".into()), uncovered_lines: 5 },
                vec![],
            ),
        ];

        let report = build_uncovered_lines_report(
            "p",
            CodeLocation::PullRequest("42".into()),
            files,
            "2025-01-15T10:30:00.000000+00:00".into(),
        );
        let out = serde_json::to_value(&report).unwrap();

        assert_eq!(out["report_type"], "uncovered_lines");
        assert_eq!(out["pull_request"], "42");
        assert!(out.get("branch").is_none());
        assert_eq!(out["summary"], json!({"files": 2, "uncovered_lines": 8}));
        assert_eq!(out["files"][0]["lines"][0]["code"], "x");
    }
}
