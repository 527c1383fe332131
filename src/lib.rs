//! Scan an npm project for outdated dependencies, rate them against audit
//! advisories, render a markdown report and optionally open an update pull
//! request.

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod model;
pub mod report;
pub mod utils;
pub mod workflow;

pub use error::{DoctorError, Result};
pub use model::{AuditAdvisory, DependencyRecord, RiskLevel};
pub use report::{Report, ReportSummary, generate_report};
pub use workflow::{DependencyDoctor, RemediationOutcome, RunOptions, RunOutcome};
