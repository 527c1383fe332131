use crate::agents::command::CommandRunner;
use crate::error::{DoctorError, Result};
use crate::model::{AuditAdvisory, OutdatedEntry, RiskLevel};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const NOT_INSTALLED: &str = "not installed";
const UNKNOWN_VERSION: &str = "unknown";

/// PackageManagerAgent drives the npm CLI inside a project directory
pub struct PackageManagerAgent {
    runner: Arc<dyn CommandRunner>,
    program: &'static str,
}

impl PackageManagerAgent {
    pub fn npm(runner: Arc<dyn CommandRunner>) -> Self {
        let program = if cfg!(target_os = "windows") {
            "npm.cmd"
        } else {
            "npm"
        };
        Self { runner, program }
    }

    /// Lists outdated packages in document order.
    ///
    /// `npm outdated` exits with 1 whenever something is outdated, so the
    /// exit code is ignored and only the captured stdout is parsed. No output
    /// means nothing is outdated.
    pub fn outdated(&self, dir: &Path) -> Result<Vec<(String, OutdatedEntry)>> {
        let output = self
            .runner
            .run(self.program, &["outdated", "--json"], dir)
            .map_err(|e| DoctorError::ScanCommand(format!("npm outdated: {e}")))?;
        debug!(code = ?output.code, "npm outdated finished");

        match output.payload() {
            Some(payload) => parse_outdated(payload),
            None => Ok(Vec::new()),
        }
    }

    /// Audit advisories, or none when the audit cannot run (e.g. no lockfile).
    pub fn audit(&self, dir: &Path) -> Vec<AuditAdvisory> {
        match self.try_audit(dir) {
            Ok(advisories) => advisories,
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "npm audit unavailable, assuming no advisories"
                );
                Vec::new()
            }
        }
    }

    /// Like [`Self::audit`] but surfaces why the audit produced nothing.
    pub fn try_audit(&self, dir: &Path) -> Result<Vec<AuditAdvisory>> {
        let output = self
            .runner
            .run(self.program, &["audit", "--json"], dir)
            .map_err(|e| DoctorError::ScanCommand(format!("npm audit: {e}")))?;
        debug!(code = ?output.code, "npm audit finished");

        match output.payload() {
            Some(payload) => parse_audit(payload),
            None => Ok(Vec::new()),
        }
    }

    /// Runs `npm update`, which rewrites the manifest and lockfile in place.
    pub fn update(&self, dir: &Path) -> Result<()> {
        let output = self.runner.run(self.program, &["update"], dir)?;
        output.ensure_success("npm update")?;
        Ok(())
    }
}

/// Parses `npm outdated --json` into `(package, versions)` pairs.
///
/// Every entry yields a pair. Versions npm leaves out are filled with
/// placeholders instead of dropping the package.
pub fn parse_outdated(payload: &str) -> Result<Vec<(String, OutdatedEntry)>> {
    let document: Value = serde_json::from_str(payload)
        .map_err(|e| DoctorError::OutputParsing(format!("npm outdated: {e}")))?;

    let entries = document.as_object().ok_or_else(|| {
        DoctorError::OutputParsing("npm outdated: expected a JSON object".to_string())
    })?;

    if let Some(message) = npm_error(&document) {
        return Err(DoctorError::ScanCommand(format!("npm outdated: {message}")));
    }

    let mut outdated = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        // Workspaces report one entry per dependent.
        let info = match value {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        if info.is_none() {
            warn!(package = %name, "npm outdated reported an empty workspace entry");
        }

        let field = |key: &str| {
            info.and_then(|info| info.get(key))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let wanted = field("wanted");
        let latest = field("latest");
        let (wanted, latest) = match (wanted, latest) {
            (Some(w), Some(l)) => (w, l),
            (Some(w), None) => (w.clone(), w),
            (None, Some(l)) => (l.clone(), l),
            (None, None) => {
                if info.is_some() {
                    warn!(package = %name, "npm outdated entry has no wanted or latest version");
                }
                (UNKNOWN_VERSION.to_string(), UNKNOWN_VERSION.to_string())
            }
        };

        outdated.push((
            name.clone(),
            OutdatedEntry {
                current: field("current").unwrap_or_else(|| NOT_INSTALLED.to_string()),
                wanted,
                latest,
            },
        ));
    }

    Ok(outdated)
}

/// Parses `npm audit --json`, accepting the legacy `advisories` map and the
/// npm 7+ `vulnerabilities` map.
pub fn parse_audit(payload: &str) -> Result<Vec<AuditAdvisory>> {
    let document: Value = serde_json::from_str(payload)
        .map_err(|e| DoctorError::OutputParsing(format!("npm audit: {e}")))?;

    if let Some(message) = npm_error(&document) {
        return Err(DoctorError::ScanCommand(format!("npm audit: {message}")));
    }

    let mut advisories = Vec::new();

    if let Some(entries) = document.get("advisories").and_then(Value::as_object) {
        for advisory in entries.values() {
            let mut modules: Vec<String> = advisory
                .get("modules")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            if let Some(module) = advisory.get("module_name").and_then(Value::as_str) {
                modules.push(module.to_string());
            }
            advisories.push(AuditAdvisory::new(modules, severity_of(advisory)));
        }
    }

    if let Some(entries) = document.get("vulnerabilities").and_then(Value::as_object) {
        for (module, vulnerability) in entries {
            advisories.push(AuditAdvisory::new(
                vec![module.clone()],
                severity_of(vulnerability),
            ));
        }
    }

    Ok(advisories)
}

fn severity_of(value: &Value) -> RiskLevel {
    value
        .get("severity")
        .and_then(Value::as_str)
        .map(RiskLevel::from_severity)
        .unwrap_or_default()
}

/// npm reports its own failures as `{"error": {"code": ..., "summary": ...}}`.
fn npm_error(document: &Value) -> Option<String> {
    let error = document.get("error")?.as_object()?;
    // A package that happens to be called "error" has no `code`.
    let code = error.get("code")?.as_str()?;
    let summary = error
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default();
    Some(format!("{code} {summary}").trim().to_string())
}
