//! Report builders
//!
//! One orchestration function per report kind: fetch through [`SonarClient`],
//! hand the responses to the pure transformations in `sonar_report_core`, and
//! stamp the result with the assembly time. Errors propagate unchanged.
//!
//! [`SonarClient`]: crate::client::SonarClient

pub mod coverage;
pub mod issues;
pub mod uncovered;

pub const ISSUES_ENDPOINT: &str = "/api/issues/search";
pub const MEASURES_ENDPOINT: &str = "/api/measures/component";
pub const COMPONENT_TREE_ENDPOINT: &str = "/api/measures/component_tree";
pub const SOURCE_LINES_ENDPOINT: &str = "/api/sources/lines";

/// Timestamp for a report being assembled now
fn now() -> String {
    sonar_report_core::report::generated_at(chrono::Utc::now())
}
