use crate::error::{DoctorError, Result};
use crate::github::RepositorySlug;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use url::Url;

pub const CONFIG_FILE: &str = "dependency-doctor.toml";
pub const DEFAULT_REPOSITORY: &str = "qveys/qodo-dependancy-doctor-agent";
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_MESSAGE: &str = "chore(deps): update dependencies";

/// Author recorded on remediation commits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for GitIdentity {
    fn default() -> Self {
        Self {
            name: "Dependency Doctor".to_string(),
            email: "dependency-doctor@example.com".to_string(),
        }
    }
}

/// Settings for the remediation side of a run.
///
/// Loaded from `dependency-doctor.toml` in the project directory when present;
/// every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DoctorConfig {
    pub repository: Option<String>,
    pub base_branch: String,
    pub remote: String,
    pub branch_prefix: String,
    pub commit_message: String,
    pub pr_title: String,
    pub api_base_url: String,
    pub identity: GitIdentity,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            repository: None,
            base_branch: "main".to_string(),
            remote: "origin".to_string(),
            branch_prefix: "chore/deps-update".to_string(),
            commit_message: DEFAULT_MESSAGE.to_string(),
            pr_title: DEFAULT_MESSAGE.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            identity: GitIdentity::default(),
        }
    }
}

impl DoctorConfig {
    /// Reads `dependency-doctor.toml` from `project_dir`, falling back to defaults.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(repository) = &self.repository {
            RepositorySlug::parse(repository)?;
        }

        let url = Url::parse(&self.api_base_url).map_err(|e| {
            DoctorError::Configuration(format!("Invalid API URL '{}': {e}", self.api_base_url))
        })?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(DoctorError::Configuration(format!(
                "Unsupported API URL scheme: {}",
                url.scheme()
            )));
        }

        for (key, value) in [
            ("base_branch", &self.base_branch),
            ("remote", &self.remote),
            ("branch_prefix", &self.branch_prefix),
        ] {
            if value.trim().is_empty() || value.starts_with('-') {
                return Err(DoctorError::Configuration(format!(
                    "'{key}' must be a non-empty name not starting with '-'"
                )));
            }
        }

        Ok(())
    }

    /// Picks the target repository: explicit value, then `from_env`
    /// (normally `GITHUB_REPOSITORY`), then the config file, then the built-in
    /// fallback. Blank values are skipped.
    pub fn resolve_repository(
        &self,
        explicit: Option<&str>,
        from_env: Option<&str>,
    ) -> Result<RepositorySlug> {
        let candidate = non_blank(explicit)
            .or(non_blank(from_env))
            .or(self.repository.as_deref())
            .unwrap_or(DEFAULT_REPOSITORY);
        RepositorySlug::parse(candidate)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
