//! Transformation functions for `/api/issues/search` results

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Statuses kept by the "all issues" report
///
/// ACCEPTED and WONTFIX are excluded even though SonarQube still reports them
/// as unresolved.
pub const OPEN_STATUSES: [&str; 3] = ["OPEN", "CONFIRMED", "REOPENED"];

// =============================================================================
// Domain Types
// =============================================================================

/// An issue projected to the fields the reports expose
///
/// Deserializing a raw SonarQube issue into this type is the projection: any
/// field not listed here is dropped, and a missing field becomes `null`. Kept
/// values pass through with whatever JSON type the server sent.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Issue {
    #[serde(default)]
    pub key: Option<Value>,
    #[serde(default)]
    pub rule: Option<Value>,
    #[serde(default)]
    pub severity: Option<Value>,
    #[serde(rename = "type", default)]
    pub issue_type: Option<Value>,
    #[serde(default)]
    pub component: Option<Value>,
    #[serde(default)]
    pub line: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub effort: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub assignee: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(rename = "creationDate", default)]
    pub creation_date: Option<Value>,
}

/// The string held by a projected field, if it is one
pub fn field_str(field: &Option<Value>) -> Option<&str> {
    field.as_ref().and_then(Value::as_str)
}

/// Severity buckets of the summary, in display order
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Blocker,
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BLOCKER" => Some(Severity::Blocker),
            "CRITICAL" => Some(Severity::Critical),
            "MAJOR" => Some(Severity::Major),
            "MINOR" => Some(Severity::Minor),
            "INFO" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blocker => "BLOCKER",
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Info => "INFO",
        }
    }
}

/// Issue type buckets of the summary, in display order
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Bug,
    Vulnerability,
    CodeSmell,
}

impl IssueType {
    pub const ALL: [IssueType; 3] = [
        IssueType::Bug,
        IssueType::Vulnerability,
        IssueType::CodeSmell,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BUG" => Some(IssueType::Bug),
            "VULNERABILITY" => Some(IssueType::Vulnerability),
            "CODE_SMELL" => Some(IssueType::CodeSmell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bug => "BUG",
            IssueType::Vulnerability => "VULNERABILITY",
            IssueType::CodeSmell => "CODE_SMELL",
        }
    }
}

/// Counts of an issue list by severity and type
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueSummary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<IssueType, usize>,
}

/// Which slice of the project an issue report covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueScope {
    /// Issues raised by a pull request
    PullRequest(String),
    /// Issues in the new-code period of a branch
    NewCode(String),
    /// Open issues on a branch
    Branch(String),
}

impl IssueScope {
    pub fn report_type(&self) -> String {
        match self {
            IssueScope::PullRequest(_) => "pr_issues".to_string(),
            IssueScope::NewCode(branch) => format!("new_issues_{branch}"),
            IssueScope::Branch(branch) => format!("all_issues_{branch}"),
        }
    }
}

/// Report for the `pr-issues`, `new-issues` and `all-issues` commands
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IssueReport {
    pub report_type: String,
    pub project_key: String,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub summary: IssueSummary,
    pub issues: Vec<Issue>,
}

// =============================================================================
// Pure Transformation Functions
// =============================================================================

/// Count issues by severity and type
///
/// Every bucket is present with zero counts. Severities or types outside the
/// known sets count toward `total` only.
pub fn summarize(issues: &[Issue]) -> IssueSummary {
    let mut by_severity: BTreeMap<Severity, usize> =
        Severity::ALL.iter().map(|s| (*s, 0)).collect();
    let mut by_type: BTreeMap<IssueType, usize> =
        IssueType::ALL.iter().map(|t| (*t, 0)).collect();

    for issue in issues {
        if let Some(severity) = field_str(&issue.severity).and_then(Severity::parse) {
            *by_severity.entry(severity).or_default() += 1;
        }
        if let Some(issue_type) = field_str(&issue.issue_type).and_then(IssueType::parse) {
            *by_type.entry(issue_type).or_default() += 1;
        }
    }

    IssueSummary {
        total: issues.len(),
        by_severity,
        by_type,
    }
}

/// Keep only issues whose status is OPEN, CONFIRMED or REOPENED
pub fn retain_open(issues: Vec<Issue>) -> Vec<Issue> {
    issues
        .into_iter()
        .filter(|issue| {
            field_str(&issue.status).is_some_and(|status| OPEN_STATUSES.contains(&status))
        })
        .collect()
}

/// Assemble an issue report
pub fn build_issue_report(
    scope: IssueScope,
    project_key: &str,
    issues: Vec<Issue>,
    generated_at: String,
) -> IssueReport {
    let report_type = scope.report_type();
    let (pull_request, branch) = match scope {
        IssueScope::PullRequest(pr) => (Some(pr), None),
        IssueScope::NewCode(branch) | IssueScope::Branch(branch) => (None, Some(branch)),
    };

    IssueReport {
        report_type,
        project_key: project_key.to_string(),
        generated_at,
        pull_request,
        branch,
        summary: summarize(&issues),
        issues,
    }
}
