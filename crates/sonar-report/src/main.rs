#![allow(unused)]

use crate::prelude::{eprintln, *};
use clap::Parser;
use colored::Colorize;
use sonar_report_core::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

mod client;
mod config;
mod error;
mod output;
mod prelude;
mod reports;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Export SonarQube issues, coverage and uncovered lines as JSON reports"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Path to the configuration file
    #[clap(long = "config", global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config_path: PathBuf,

    /// Write the report to this file instead of stdout
    #[clap(long = "output", global = true)]
    pub output_path: Option<PathBuf>,

    /// Pretty-print JSON output
    #[clap(long, global = true, default_value = "false")]
    pub pretty: bool,

    /// Render a human-readable table instead of JSON
    #[clap(long, global = true, default_value = "false")]
    pub table: bool,

    /// Branch to report on
    #[clap(long, global = true, default_value = "main")]
    pub branch: String,

    /// Request timeout in seconds
    #[clap(long, global = true, default_value = "30")]
    pub timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "SONAR_REPORT_VERBOSE", global = true, default_value = "false")]
    pub verbose: bool,

    /// Only print the report and errors
    #[clap(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Write a template configuration file
    Init(crate::config::InitOptions),

    /// Unresolved issues of a pull request
    PrIssues(crate::reports::issues::PrIssuesOptions),

    /// Unresolved issues in the new-code period of a branch
    NewIssues(crate::reports::issues::BranchIssuesOptions),

    /// Open issues of a branch
    AllIssues(crate::reports::issues::BranchIssuesOptions),

    /// Coverage metrics of a branch or pull request
    Coverage(crate::reports::coverage::CoverageOptions),

    /// Lines never executed by the tests, per file
    UncoveredLines(crate::reports::uncovered::UncoveredLinesOptions),
}

/// Default log filter; `--quiet` still lets this crate's warnings through
fn log_filter(global: &Global) -> &'static str {
    if global.quiet {
        "error,sonar_report=warn"
    } else if global.verbose {
        "warn,sonar_report=debug,sonar_report_core=debug"
    } else {
        "warn"
    }
}

fn init_logging(global: &Global) {
    let env = env_logger::Env::default().default_filter_or(log_filter(global));
    env_logger::Builder::from_env(env).init();
}

async fn run(app: App) -> Result<()> {
    let global = app.global;

    match app.command {
        SubCommands::Init(options) => crate::config::init_handler(options).await,
        SubCommands::PrIssues(options) => {
            crate::reports::issues::pr_issues_handler(options, global).await
        }
        SubCommands::NewIssues(options) => {
            crate::reports::issues::new_issues_handler(options, global).await
        }
        SubCommands::AllIssues(options) => {
            crate::reports::issues::all_issues_handler(options, global).await
        }
        SubCommands::Coverage(options) => crate::reports::coverage::handler(options, global).await,
        SubCommands::UncoveredLines(options) => {
            crate::reports::uncovered::handler(options, global).await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logging(&app.global);

    if let Err(err) = run(app).await {
        let label = err
            .downcast_ref::<Error>()
            .map(Error::label)
            .unwrap_or("Error");
        eprintln!("{}: {}", label.red().bold(), err);
        std::process::exit(1);
    }

    Ok(())
}
