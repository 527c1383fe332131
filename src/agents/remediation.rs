use crate::agents::command::CommandRunner;
use crate::agents::package_manager::PackageManagerAgent;
use crate::agents::project_scanner::ProjectScannerAgent;
use crate::agents::version_control::VersionControlAgent;
use crate::config::DoctorConfig;
use crate::error::Result;
use crate::github::{PullRequestDraft, PullRequestHost, RepositorySlug};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPullRequest {
    pub branch: String,
    pub url: Option<String>,
}

/// RemediationPublisher applies `npm update` on a fresh branch and opens a pull request.
///
/// Every step has real side effects and nothing is rolled back: when a later
/// step fails the local checkout stays on the new branch with whatever was
/// already committed.
pub struct RemediationPublisher {
    runner: Arc<dyn CommandRunner>,
    host: Arc<dyn PullRequestHost>,
    config: DoctorConfig,
}

impl RemediationPublisher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        host: Arc<dyn PullRequestHost>,
        config: DoctorConfig,
    ) -> Self {
        Self {
            runner,
            host,
            config,
        }
    }

    pub fn publish(
        &self,
        project_dir: &Path,
        repository: &RepositorySlug,
        body: &str,
    ) -> Result<PublishedPullRequest> {
        let git = VersionControlAgent::new(project_dir, self.runner.clone())?;
        if !git.is_working_directory_clean()? {
            warn!(dir = %project_dir.display(), "working directory has uncommitted changes");
        }

        let branch = git.create_update_branch(&self.config.branch_prefix)?;
        info!(%branch, "created update branch");

        PackageManagerAgent::npm(self.runner.clone()).update(project_dir)?;

        // `npm update` may have created the lockfile.
        let project = ProjectScannerAgent::new(project_dir).validate()?;
        git.stage_files(&project.tracked_files())?;
        git.commit(&self.config.commit_message, &self.config.identity)?;
        git.push(&self.config.remote, &branch)?;
        info!(%branch, remote = %self.config.remote, "pushed update branch");

        self.host
            .create_branch(repository, &branch, &self.config.base_branch)?;
        self.host.create_pull_request(
            repository,
            &PullRequestDraft {
                title: self.config.pr_title.clone(),
                head: branch.clone(),
                base: self.config.base_branch.clone(),
                body: body.to_string(),
            },
        )?;

        let url = self.host.find_pull_request_url(repository, &branch)?;
        if url.is_none() {
            warn!(%branch, "pull request created but not found by head branch");
        }

        Ok(PublishedPullRequest { branch, url })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeHost;
    use super::*;
    use crate::agents::command::testing::ScriptedRunner;
    use crate::error::DoctorError;
    use std::fs;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        dir
    }

    fn slug() -> RepositorySlug {
        RepositorySlug::parse("acme/widgets").unwrap()
    }

    #[test]
    fn publishes_in_order() {
        let dir = project();
        let path = dir.path().canonicalize().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let host = Arc::new(FakeHost::with_url("https://github.com/acme/widgets/pull/5"));
        let publisher =
            RemediationPublisher::new(runner.clone(), host.clone(), DoctorConfig::default());

        let published = publisher.publish(&path, &slug(), "# report").unwrap();

        assert!(published.branch.starts_with("chore/deps-update-"));
        assert_eq!(
            published.url.as_deref(),
            Some("https://github.com/acme/widgets/pull/5")
        );

        let calls = runner.calls();
        let position = |prefix: &str| calls.iter().position(|c| c.starts_with(prefix)).unwrap();
        assert!(position("git checkout -b") < position("npm update"));
        assert!(position("npm update") < position("git add"));
        assert!(position("git add") < position("git -c user.name="));
        assert!(position("git -c user.name=") < position("git push"));
        assert!(calls.contains(&"git add -- package.json package-lock.json".to_string()));

        let host_calls = host.calls();
        assert_eq!(host_calls.len(), 3);
        assert!(host_calls[0].starts_with("create_branch acme/widgets chore/deps-update-"));
        assert!(host_calls[0].ends_with(" main"));
        let drafts = host.drafts.lock().unwrap();
        assert_eq!(drafts[0].body, "# report");
        assert_eq!(drafts[0].base, "main");
    }

    #[test]
    fn push_failure_stops_before_remote_calls() {
        let dir = project();
        let path = dir.path().canonicalize().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail("git push", "rejected"));
        let host = Arc::new(FakeHost::default());
        let publisher =
            RemediationPublisher::new(runner.clone(), host.clone(), DoctorConfig::default());

        let err = publisher.publish(&path, &slug(), "body").unwrap_err();

        assert!(matches!(err, DoctorError::GitOperation(_)));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn update_failure_is_reported() {
        let dir = project();
        let path = dir.path().canonicalize().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail("npm update", "ERESOLVE"));
        let publisher = RemediationPublisher::new(
            runner.clone(),
            Arc::new(FakeHost::default()),
            DoctorConfig::default(),
        );

        let err = publisher.publish(&path, &slug(), "body").unwrap_err();

        assert!(err.is_remediation_error());
        assert!(!runner.called("git push"));
    }

    #[test]
    fn missing_pull_request_yields_no_url() {
        let dir = project();
        let path = dir.path().canonicalize().unwrap();
        let publisher = RemediationPublisher::new(
            Arc::new(ScriptedRunner::new()),
            Arc::new(FakeHost::default()),
            DoctorConfig::default(),
        );

        let published = publisher.publish(&path, &slug(), "body").unwrap();
        assert!(published.url.is_none());
    }
}
