use super::{now, COMPONENT_TREE_ENDPOINT, SOURCE_LINES_ENDPOINT};
use crate::client::SonarClient;
use crate::output::set_spinner_msg;
use crate::prelude::*;
use indicatif::ProgressBar;
use sonar_report_core::uncovered::{
    build_uncovered_lines_report, files_with_uncovered_lines, uncovered_source_lines,
    CodeLocation, SourceLinesResponse, TreeComponent, UncoveredLinesReport, FILE_QUALIFIER,
    UNCOVERED_LINES_METRIC,
};

/// Options for the `uncovered-lines` command
#[derive(Debug, clap::Args, Clone)]
pub struct UncoveredLinesOptions {
    /// Project alias from the configuration, or a raw project key
    #[clap(value_name = "PROJECT")]
    pub project: String,

    /// Report on a pull request instead of the branch
    #[clap(long = "pr", value_name = "PR_ID")]
    pub pull_request: Option<String>,
}

/// Every never-executed line of every file with uncovered lines
///
/// Exactly one of `branch` and `pull_request` must be given; the check happens
/// before any request is made.
pub async fn uncovered_lines(
    client: &SonarClient,
    project_key: &str,
    branch: Option<&str>,
    pull_request: Option<&str>,
    spinner: Option<&ProgressBar>,
) -> Result<UncoveredLinesReport, Error> {
    let location = CodeLocation::from_selectors(branch, pull_request)?;

    let tree_params = [
        ("component", project_key.to_string()),
        ("qualifiers", FILE_QUALIFIER.to_string()),
        ("metricKeys", UNCOVERED_LINES_METRIC.to_string()),
        location.query_param(),
    ];
    let components: Vec<TreeComponent> = client
        .get_paginated(COMPONENT_TREE_ENDPOINT, &tree_params, "components")
        .await?;

    let files = files_with_uncovered_lines(components);
    log::debug!("{} file(s) with uncovered lines in {}", files.len(), project_key);

    let total = files.len();
    let mut with_lines = Vec::with_capacity(total);
    for (index, file) in files.into_iter().enumerate() {
        set_spinner_msg(
            spinner,
            f!(
                "Fetching source {}/{}: {}",
                index + 1,
                total,
                file.path.as_deref().unwrap_or(&file.key)
            ),
        );

        let line_params = [("key", file.key.clone()), location.query_param()];
        let response: SourceLinesResponse = client
            .get_json(SOURCE_LINES_ENDPOINT, &line_params)
            .await?;

        with_lines.push((file, uncovered_source_lines(response)));
    }

    Ok(build_uncovered_lines_report(
        project_key,
        location,
        with_lines,
        now(),
    ))
}

/// Handle the `uncovered-lines` command
pub async fn handler(options: UncoveredLinesOptions, global: crate::Global) -> Result<()> {
    let session = crate::config::connect(&global)?;
    let project_key = session.resolve_project(&options.project)?;

    let pull_request = options.pull_request.as_deref();
    let branch = match pull_request {
        Some(_) => None,
        None => Some(global.branch.as_str()),
    };

    log::info!("Fetching uncovered lines for {}", project_key);
    let spinner = crate::output::spinner(&global, f!("Listing files of {}...", project_key));
    let report = uncovered_lines(
        &session.client,
        &project_key,
        branch,
        pull_request,
        Some(&spinner),
    )
    .await;
    spinner.finish_and_clear();

    crate::output::emit(&report?, &global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use serde_json::json;
    use sonar_report_core::uncovered::LocationError;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SonarClient {
        SonarClient::new(&server.uri(), "squ_test", DEFAULT_TIMEOUT).unwrap()
    }

    async fn mount_tree(server: &MockServer, selector: (&str, &str)) {
        Mock::given(method("GET"))
            .and(path(COMPONENT_TREE_ENDPOINT))
            .and(query_param("component", "proj"))
            .and(query_param("qualifiers", "FIL"))
            .and(query_param("metricKeys", "uncovered_lines"))
            .and(query_param(selector.0, selector.1))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "paging": {"pageIndex": 1, "pageSize": 500, "total": 3},
                "components": [
                    {
                        "key": "proj:src/a.py",
                        "path": "src/a.py",
                        "measures": [{"metric": "uncovered_lines", "value": "2"}]
                    },
                    {
                        "key": "proj:src/b.py",
                        "path": "src/b.py",
                        "measures": [{"metric": "uncovered_lines", "value": "0"}]
                    },
                    {"key": "proj:src/c.py", "path": "src/c.py", "measures": []}
                ]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_two_phase_report() {
        let server = MockServer::start().await;
        mount_tree(&server, ("branch", "main")).await;
        Mock::given(method("GET"))
            .and(path(SOURCE_LINES_ENDPOINT))
            .and(query_param("key", "proj:src/a.py"))
            .and(query_param("branch", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sources": [
                    {"line": 1, "code": "<span class=\"k\">def</span> f():", "lineHits": 1},
                    {
                        "line": 2,
                        "code": "    <span class=\"k\">return</span> a &lt; b",
                        "lineHits": 0
                    },
                    {"line": 3, "code": "# comment"},
                    {"line": 4, "code": "pass", "utLineHits": 0}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let report = uncovered_lines(&client(&server), "proj", Some("main"), None, None)
            .await
            .unwrap();

        assert_eq!(report.report_type, "uncovered_lines");
        assert_eq!(report.branch.as_deref(), Some("main"));
        assert_eq!(report.pull_request, None);
        assert_eq!(report.summary.files, 1);
        assert_eq!(report.summary.uncovered_lines, 2);

        let file = &report.files[0];
        assert_eq!(file.path.as_deref(), Some("src/a.py"));
        let lines: Vec<(u64, &str)> = file
            .lines
            .iter()
            .map(|l| (l.line, l.code.as_str()))
            .collect();
        assert_eq!(lines, vec![(2, "    return a < b"), (4, "pass")]);
    }

    #[tokio::test]
    async fn test_pull_request_scopes_both_phases() {
        let server = MockServer::start().await;
        mount_tree(&server, ("pullRequest", "7")).await;
        Mock::given(method("GET"))
            .and(path(SOURCE_LINES_ENDPOINT))
            .and(query_param("pullRequest", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sources": []})))
            .expect(1)
            .mount(&server)
            .await;

        let report = uncovered_lines(&client(&server), "proj", None, Some("7"), None)
            .await
            .unwrap();
        let out = serde_json::to_value(&report).unwrap();

        assert_eq!(out["pull_request"], "7");
        assert!(out.get("branch").is_none());
        assert_eq!(report.files[0].lines.len(), 0);
    }

    #[tokio::test]
    async fn test_missing_location_makes_no_request() {
        let server = MockServer::start().await;

        let err = uncovered_lines(&client(&server), "proj", None, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CallerContract(LocationError::Missing)));
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_location_makes_no_request() {
        let server = MockServer::start().await;

        let err = uncovered_lines(&client(&server), "proj", Some("main"), Some("7"), None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::CallerContract(LocationError::Conflicting { .. })
        ));
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_source_failure_aborts_report() {
        let server = MockServer::start().await;
        mount_tree(&server, ("branch", "main")).await;
        Mock::given(method("GET"))
            .and(path(SOURCE_LINES_ENDPOINT))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = uncovered_lines(&client(&server), "proj", Some("main"), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Server { status: 500, .. }));
    }
}
