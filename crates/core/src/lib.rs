//! Core library for sonar-report
//!
//! This crate implements the **Functional Core** of the sonar-report application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`sonar_report_core`** (this crate): Pure transformation functions with zero I/O
//! - **`sonar-report`**: HTTP calls, configuration files, output and orchestration
//!   (the Imperative Shell)
//!
//! Every function here takes already-fetched SonarQube JSON (or text) and returns
//! plain data. Nothing in this crate talks to the network or the filesystem, so
//! every transformation is tested with fixture data and no mocking.
//!
//! # Module Organization
//!
//! - [`pagination`]: page controls, page envelopes and the stop/warn cursor
//! - [`measures`]: measure value normalization and `new_` prefix handling
//! - [`issues`]: issue projection, summaries and issue reports
//! - [`coverage`]: branch and pull request coverage reports
//! - [`uncovered`]: code locations, uncovered file and line selection
//! - [`config`]: configuration parsing and project alias resolution
//! - [`report`]: helpers shared by every report
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use sonar_report_core::coverage::{build_pr_coverage_report, ComponentMeasuresResponse};
//!
//! let response: ComponentMeasuresResponse = serde_json::from_value(json!({
//!     "component": {"measures": [{"metric": "new_coverage", "value": "88.0"}]}
//! }))?;
//!
//! let report = build_pr_coverage_report("proj", "42", response, now);
//!
//! assert_eq!(report.new_code.get("coverage"), Some(&Some(MetricValue::Integer(88))));
//! ```

pub mod config;
pub mod coverage;
pub mod issues;
pub mod measures;
pub mod pagination;
pub mod report;
pub mod uncovered;
