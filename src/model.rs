use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk classification derived from advisory severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a package manager severity string onto a risk level.
    ///
    /// `info`, `low` and anything unrecognised collapse to [`RiskLevel::Low`].
    pub fn from_severity(severity: &str) -> Self {
        match severity.trim().to_ascii_lowercase().as_str() {
            "critical" => RiskLevel::Critical,
            "high" => RiskLevel::High,
            "moderate" | "medium" => RiskLevel::Moderate,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// High and critical risks are reported as critical issues.
    pub fn is_critical(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versions reported by the package manager for one outdated package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutdatedEntry {
    pub current: String,
    pub wanted: String,
    pub latest: String,
}

/// A vulnerability advisory from the audit feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAdvisory {
    pub affected_modules: Vec<String>,
    pub severity: RiskLevel,
}

impl AuditAdvisory {
    pub fn new(affected_modules: Vec<String>, severity: RiskLevel) -> Self {
        let mut modules = Vec::with_capacity(affected_modules.len());
        for module in affected_modules {
            if !modules.contains(&module) {
                modules.push(module);
            }
        }
        Self {
            affected_modules: modules,
            severity,
        }
    }

    /// Prefix match: advisory module `lodash-es` also matches package `lodash`.
    pub fn affects(&self, package: &str) -> bool {
        self.affected_modules
            .iter()
            .any(|module| module.starts_with(package))
    }
}

/// Size of the jump from the installed version to the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Major,
    Minor,
    Patch,
}

/// One outdated dependency annotated with its risk and a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub name: String,
    pub current: String,
    pub wanted: String,
    pub latest: String,
    pub risk: RiskLevel,
    pub recommendation: String,
}

impl DependencyRecord {
    /// Returns `None` when either version is not plain semver.
    pub fn update_kind(&self) -> Option<UpdateKind> {
        let current = semver::Version::parse(self.current.trim_start_matches('v')).ok()?;
        let latest = semver::Version::parse(self.latest.trim_start_matches('v')).ok()?;

        if latest <= current {
            return None;
        }

        Some(if latest.major != current.major {
            UpdateKind::Major
        } else if latest.minor != current.minor {
            UpdateKind::Minor
        } else {
            UpdateKind::Patch
        })
    }
}
