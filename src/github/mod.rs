use crate::error::{DoctorError, Result};
use regex::Regex;
use std::fmt;

pub mod client;
pub use client::GitHubClient;

/// `owner/repo` identifier of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    pub owner: String,
    pub repo: String,
}

impl RepositorySlug {
    pub fn parse(value: &str) -> Result<Self> {
        let pattern = Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$")
            .map_err(|e| DoctorError::Configuration(format!("Invalid slug pattern: {e}")))?;

        let captures = pattern.captures(value.trim()).ok_or_else(|| {
            DoctorError::Configuration(format!(
                "Repository '{value}' is not in owner/repo form"
            ))
        })?;

        Ok(Self {
            owner: captures[1].to_string(),
            repo: captures[2].to_string(),
        })
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestDraft {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// Remote code-hosting operations needed to publish a remediation branch.
pub trait PullRequestHost: Send + Sync {
    /// Creates `refs/heads/<branch>` at the tip of `base`. An existing ref is not an error.
    fn create_branch(&self, repo: &RepositorySlug, branch: &str, base: &str) -> Result<()>;

    fn create_pull_request(&self, repo: &RepositorySlug, draft: &PullRequestDraft) -> Result<()>;

    /// URL of the first pull request whose head is `branch`.
    fn find_pull_request_url(&self, repo: &RepositorySlug, branch: &str)
    -> Result<Option<String>>;
}
