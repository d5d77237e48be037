use super::{now, MEASURES_ENDPOINT};
use crate::client::SonarClient;
use crate::prelude::*;
use sonar_report_core::coverage::{
    branch_metric_keys, build_coverage_report, build_pr_coverage_report, pr_metric_keys,
    ComponentMeasuresResponse, CoverageReport, PrCoverageReport,
};

/// Options for the `coverage` command
#[derive(Debug, clap::Args, Clone)]
pub struct CoverageOptions {
    /// Project alias from the configuration, or a raw project key
    #[clap(value_name = "PROJECT")]
    pub project: String,

    /// Report on a pull request instead of the branch
    #[clap(long = "pr", value_name = "PR_ID")]
    pub pull_request: Option<String>,
}

/// Current and new-code coverage metrics of `branch`
pub async fn coverage(
    client: &SonarClient,
    project_key: &str,
    branch: &str,
) -> Result<CoverageReport, Error> {
    let params = [
        ("component", project_key.to_string()),
        ("branch", branch.to_string()),
        ("metricKeys", branch_metric_keys()),
    ];

    let response: ComponentMeasuresResponse = client.get_json(MEASURES_ENDPOINT, &params).await?;

    Ok(build_coverage_report(project_key, branch, response, now()))
}

/// New-code coverage metrics of pull request `pr_id`
pub async fn pr_coverage(
    client: &SonarClient,
    project_key: &str,
    pr_id: &str,
) -> Result<PrCoverageReport, Error> {
    let params = [
        ("component", project_key.to_string()),
        ("pullRequest", pr_id.to_string()),
        ("metricKeys", pr_metric_keys()),
    ];

    let response: ComponentMeasuresResponse = client.get_json(MEASURES_ENDPOINT, &params).await?;

    Ok(build_pr_coverage_report(project_key, pr_id, response, now()))
}

/// Handle the `coverage` command
pub async fn handler(options: CoverageOptions, global: crate::Global) -> Result<()> {
    let session = crate::config::connect(&global)?;
    let project_key = session.resolve_project(&options.project)?;

    match options.pull_request.as_deref() {
        Some(pr_id) => {
            log::info!("Fetching coverage for {} PR#{}", project_key, pr_id);
            let spinner = crate::output::spinner(
                &global,
                f!("Fetching coverage for {} PR #{}...", project_key, pr_id),
            );
            let report = pr_coverage(&session.client, &project_key, pr_id).await;
            spinner.finish_and_clear();

            crate::output::emit(&report?, &global)
        }
        None => {
            log::info!("Fetching coverage for {} on branch '{}'", project_key, global.branch);
            let spinner = crate::output::spinner(
                &global,
                f!("Fetching coverage for {} on '{}'...", project_key, global.branch),
            );
            let report = coverage(&session.client, &project_key, &global.branch).await;
            spinner.finish_and_clear();

            crate::output::emit(&report?, &global)
        }
    }
}
