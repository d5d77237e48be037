use super::{now, ISSUES_ENDPOINT};
use crate::client::SonarClient;
use crate::prelude::*;
use sonar_report_core::issues::{
    build_issue_report, retain_open, Issue, IssueReport, IssueScope, OPEN_STATUSES,
};

const RESULTS_KEY: &str = "issues";

/// Options for the `pr-issues` command
#[derive(Debug, clap::Args, Clone)]
pub struct PrIssuesOptions {
    /// Project alias from the configuration, or a raw project key
    #[clap(value_name = "PROJECT")]
    pub project: String,

    /// Pull request ID
    #[clap(value_name = "PR_ID")]
    pub pr_id: String,
}

/// Options for the `new-issues` and `all-issues` commands
#[derive(Debug, clap::Args, Clone)]
pub struct BranchIssuesOptions {
    /// Project alias from the configuration, or a raw project key
    #[clap(value_name = "PROJECT")]
    pub project: String,
}

async fn fetch_issues(
    client: &SonarClient,
    params: &[(&str, String)],
) -> Result<Vec<Issue>, Error> {
    client
        .get_paginated(ISSUES_ENDPOINT, params, RESULTS_KEY)
        .await
}

/// Unresolved issues raised by pull request `pr_id`
pub async fn pr_issues(
    client: &SonarClient,
    project_key: &str,
    pr_id: &str,
) -> Result<IssueReport, Error> {
    let params = [
        ("componentKeys", project_key.to_string()),
        ("pullRequest", pr_id.to_string()),
        ("resolved", "false".to_string()),
    ];

    let issues = fetch_issues(client, &params).await?;

    Ok(build_issue_report(
        IssueScope::PullRequest(pr_id.to_string()),
        project_key,
        issues,
        now(),
    ))
}

/// Unresolved issues in the new-code period of `branch`
pub async fn new_issues(
    client: &SonarClient,
    project_key: &str,
    branch: &str,
) -> Result<IssueReport, Error> {
    let params = [
        ("componentKeys", project_key.to_string()),
        ("branch", branch.to_string()),
        ("inNewCodePeriod", "true".to_string()),
        ("resolved", "false".to_string()),
    ];

    let issues = fetch_issues(client, &params).await?;

    Ok(build_issue_report(
        IssueScope::NewCode(branch.to_string()),
        project_key,
        issues,
        now(),
    ))
}

/// Open, non-accepted issues on `branch`
pub async fn all_issues(
    client: &SonarClient,
    project_key: &str,
    branch: &str,
) -> Result<IssueReport, Error> {
    let params = [
        ("componentKeys", project_key.to_string()),
        ("branch", branch.to_string()),
        ("resolved", "false".to_string()),
        ("statuses", OPEN_STATUSES.join(",")),
    ];

    let issues = retain_open(fetch_issues(client, &params).await?);

    Ok(build_issue_report(
        IssueScope::Branch(branch.to_string()),
        project_key,
        issues,
        now(),
    ))
}

/// Handle the `pr-issues` command
pub async fn pr_issues_handler(options: PrIssuesOptions, global: crate::Global) -> Result<()> {
    let session = crate::config::connect(&global)?;
    let project_key = session.resolve_project(&options.project)?;

    log::info!("Fetching PR issues for {} PR#{}", project_key, options.pr_id);
    let spinner = crate::output::spinner(
        &global,
        f!("Fetching issues for {} PR #{}...", project_key, options.pr_id),
    );
    let report = pr_issues(&session.client, &project_key, &options.pr_id).await;
    spinner.finish_and_clear();

    crate::output::emit(&report?, &global)
}

/// Handle the `new-issues` command
pub async fn new_issues_handler(options: BranchIssuesOptions, global: crate::Global) -> Result<()> {
    let session = crate::config::connect(&global)?;
    let project_key = session.resolve_project(&options.project)?;

    log::info!("Fetching new issues for {} on branch '{}'", project_key, global.branch);
    let spinner = crate::output::spinner(
        &global,
        f!("Fetching new-code issues for {} on '{}'...", project_key, global.branch),
    );
    let report = new_issues(&session.client, &project_key, &global.branch).await;
    spinner.finish_and_clear();

    crate::output::emit(&report?, &global)
}

/// Handle the `all-issues` command
pub async fn all_issues_handler(options: BranchIssuesOptions, global: crate::Global) -> Result<()> {
    let session = crate::config::connect(&global)?;
    let project_key = session.resolve_project(&options.project)?;

    log::info!("Fetching all issues for {} on branch '{}'", project_key, global.branch);
    let spinner = crate::output::spinner(
        &global,
        f!("Fetching open issues for {} on '{}'...", project_key, global.branch),
    );
    let report = all_issues(&session.client, &project_key, &global.branch).await;
    spinner.finish_and_clear();

    crate::output::emit(&report?, &global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use serde_json::{json, Value};
    use sonar_report_core::issues::field_str;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SonarClient {
        SonarClient::new(&server.uri(), "squ_test", DEFAULT_TIMEOUT).unwrap()
    }

    fn issues_page(issues: Value) -> Value {
        let total = issues.as_array().map(Vec::len).unwrap_or(0);
        json!({"issues": issues, "paging": {"pageIndex": 1, "pageSize": 500, "total": total}})
    }

    fn sample_issues() -> Value {
        json!([
            {"key": "i1", "severity": "BLOCKER", "type": "BUG", "status": "OPEN"},
            {"key": "i2", "severity": "MAJOR", "type": "CODE_SMELL", "status": "CONFIRMED"}
        ])
    }

    #[tokio::test]
    async fn test_pr_issues_report_structure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(sample_issues())))
            .mount(&server)
            .await;

        let report = pr_issues(&client(&server), "proj", "42").await.unwrap();

        assert_eq!(report.report_type, "pr_issues");
        assert_eq!(report.project_key, "proj");
        assert_eq!(report.pull_request.as_deref(), Some("42"));
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.issues.len(), 2);
        assert!(!report.generated_at.is_empty());
    }

    #[tokio::test]
    async fn test_pr_issues_api_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .and(query_param("componentKeys", "proj"))
            .and(query_param("pullRequest", "42"))
            .and(query_param("resolved", "false"))
            .and(query_param_is_missing("statuses"))
            .and(query_param_is_missing("severities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let report = pr_issues(&client(&server), "proj", "42").await.unwrap();

        assert!(report.issues.is_empty());
        assert_eq!(report.summary.total, 0);
    }

    #[tokio::test]
    async fn test_new_issues_leak_period_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .and(query_param("branch", "main"))
            .and(query_param("inNewCodePeriod", "true"))
            .and(query_param("resolved", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(sample_issues())))
            .expect(1)
            .mount(&server)
            .await;

        let report = new_issues(&client(&server), "proj", "main").await.unwrap();

        assert_eq!(report.report_type, "new_issues_main");
        assert_eq!(report.branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_all_issues_requests_open_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .and(query_param("statuses", "OPEN,CONFIRMED,REOPENED"))
            .and(query_param("resolved", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(json!([]))))
            .expect(1)
            .mount(&server)
            .await;

        let report = all_issues(&client(&server), "proj", "develop").await.unwrap();

        assert_eq!(report.report_type, "all_issues_develop");
    }

    #[tokio::test]
    async fn test_all_issues_excludes_accepted() {
        let server = MockServer::start().await;
        let issues = json!([
            {"key": "open", "status": "OPEN"},
            {"key": "accepted", "status": "ACCEPTED"},
            {"key": "confirmed", "status": "CONFIRMED"},
            {"key": "reopened", "status": "REOPENED"}
        ]);
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(issues)))
            .mount(&server)
            .await;

        let report = all_issues(&client(&server), "proj", "main").await.unwrap();

        let keys: Vec<&str> = report.issues.iter().filter_map(|i| field_str(&i.key)).collect();
        assert_eq!(keys, vec!["open", "confirmed", "reopened"]);
        assert_eq!(report.summary.total, 3);
    }

    #[tokio::test]
    async fn test_unexpected_fields_are_dropped() {
        let server = MockServer::start().await;
        let issues = json!([{
            "key": "i1",
            "severity": "MINOR",
            "hash": "abc",
            "textRange": {"startLine": 1},
            "internalField": true
        }]);
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(issues)))
            .mount(&server)
            .await;

        let report = pr_issues(&client(&server), "proj", "1").await.unwrap();
        let out = serde_json::to_value(&report).unwrap();
        let issue = out["issues"][0].as_object().unwrap();

        assert!(!issue.contains_key("hash"));
        assert!(!issue.contains_key("textRange"));
        assert!(!issue.contains_key("internalField"));
        assert_eq!(issue.len(), 12);
        assert!(issue["rule"].is_null());
    }

    #[tokio::test]
    async fn test_loosely_typed_issue_fields_are_kept() {
        let server = MockServer::start().await;
        let issues = json!([
            {"key": "i1", "severity": "MAJOR", "status": "OPEN", "line": "12", "effort": 5},
            {"key": "i2", "status": "OPEN", "tags": ["x", 1], "assignee": {"login": "bob"}}
        ]);
        Mock::given(method("GET"))
            .and(path(ISSUES_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(issues_page(issues)))
            .mount(&server)
            .await;

        let report = all_issues(&client(&server), "proj", "main").await.unwrap();
        let out = serde_json::to_value(&report).unwrap();

        assert_eq!(report.summary.total, 2);
        assert_eq!(out["summary"]["by_severity"]["MAJOR"], 1);
        assert_eq!(out["issues"][0]["line"], "12");
        assert_eq!(out["issues"][0]["effort"], 5);
        assert_eq!(out["issues"][1]["tags"], json!(["x", 1]));
        assert_eq!(out["issues"][1]["assignee"]["login"], "bob");
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = new_issues(&client(&server), "proj", "main").await.unwrap_err();

        assert!(matches!(err, Error::Authentication));
    }
}
