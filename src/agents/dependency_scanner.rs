use crate::agents::command::CommandRunner;
use crate::agents::package_manager::PackageManagerAgent;
use crate::agents::project_scanner::ProjectScannerAgent;
use crate::error::Result;
use crate::model::{AuditAdvisory, DependencyRecord, OutdatedEntry, RiskLevel};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

pub const NO_ACTION_REQUIRED: &str = "No action required.";

/// DependencyScanner joins outdated packages with audit advisories
pub struct DependencyScanner {
    package_manager: PackageManagerAgent,
}

impl DependencyScanner {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            package_manager: PackageManagerAgent::npm(runner),
        }
    }

    /// Scans the project owning `manifest`, surfacing any failure to the caller.
    pub fn try_scan<P: AsRef<Path>>(&self, manifest: P) -> Result<Vec<DependencyRecord>> {
        let project = ProjectScannerAgent::new(manifest).validate()?;
        let dir = project.project_dir.as_path();

        let outdated = self.package_manager.outdated(dir)?;
        let advisories = self.package_manager.audit(dir);
        info!(
            dir = %dir.display(),
            outdated = outdated.len(),
            advisories = advisories.len(),
            "scan data collected"
        );

        Ok(build_records(outdated, &advisories))
    }

    /// Scans the project, logging failures and returning an empty list instead.
    pub fn scan<P: AsRef<Path>>(&self, manifest: P) -> Vec<DependencyRecord> {
        let manifest = manifest.as_ref();
        self.try_scan(manifest).unwrap_or_else(|e| {
            error!(manifest = %manifest.display(), error = %e, "dependency scan failed");
            Vec::new()
        })
    }
}

pub fn build_records(
    outdated: Vec<(String, OutdatedEntry)>,
    advisories: &[AuditAdvisory],
) -> Vec<DependencyRecord> {
    outdated
        .into_iter()
        .map(|(name, entry)| DependencyRecord {
            risk: classify_risk(&name, advisories),
            recommendation: recommend(&entry),
            name,
            current: entry.current,
            wanted: entry.wanted,
            latest: entry.latest,
        })
        .collect()
}

/// Severity of the first advisory with a module name starting with `package`.
///
/// Prefix matching over-reports: `lodash` also picks up `lodash-es` advisories.
pub fn classify_risk(package: &str, advisories: &[AuditAdvisory]) -> RiskLevel {
    advisories
        .iter()
        .find(|advisory| advisory.affects(package))
        .map(|advisory| advisory.severity)
        .unwrap_or(RiskLevel::Low)
}

pub fn recommend(entry: &OutdatedEntry) -> String {
    if entry.wanted != entry.latest {
        format!(
            "Update to {} (compatibility) or {} (latest version).",
            entry.wanted, entry.latest
        )
    } else {
        NO_ACTION_REQUIRED.to_string()
    }
}
