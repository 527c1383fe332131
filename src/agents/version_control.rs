use crate::agents::command::{CommandOutput, CommandRunner};
use crate::config::GitIdentity;
use crate::error::{DoctorError, Result};
use crate::utils::path_validator::PathValidator;
use jiff::Zoned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const MAX_BRANCH_LEN: usize = 60;

/// VersionControlAgent handles Git operations with hardened input validation.
pub struct VersionControlAgent {
    project_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl VersionControlAgent {
    pub fn new<P: AsRef<Path>>(project_path: P, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let project_path = Self::validate_git_path(project_path.as_ref())?;
        Ok(Self {
            project_path,
            runner,
        })
    }

    /// Check if the working directory is clean
    pub fn is_working_directory_clean(&self) -> Result<bool> {
        let output = self.run_git(&["status", "--porcelain"])?;
        Self::ensure_success(&output, "git status")?;
        Ok(output.stdout.trim().is_empty())
    }

    /// Create and check out a new branch named after `prefix` and the current time
    pub fn create_update_branch(&self, prefix: &str) -> Result<String> {
        let branch_name = branch_name_at(prefix, &Zoned::now());
        let output = self.run_git(&["checkout", "-b", &branch_name])?;
        Self::ensure_success(&output, "git checkout -b")?;
        Ok(branch_name)
    }

    /// Stage the given project files, refusing anything outside the project
    pub fn stage_files(&self, files: &[String]) -> Result<()> {
        for file in files {
            PathValidator::ensure_within(self.project_path.join(file), &self.project_path)
                .map_err(|err| {
                    DoctorError::GitOperation(format!("Refusing to stage unsafe path: {err}"))
                })?;
        }

        let mut args = vec!["add", "--"];
        args.extend(files.iter().map(String::as_str));
        let output = self.run_git(&args)?;
        Self::ensure_success(&output, "git add")?;
        Ok(())
    }

    /// Commit staged changes as `identity` without touching any git config file
    pub fn commit(&self, message: &str, identity: &GitIdentity) -> Result<()> {
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        let output = self.run_git(&["-c", &name, "-c", &email, "commit", "-m", message])?;
        Self::ensure_success(&output, "git commit")?;
        Ok(())
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let output = self.run_git(&["push", "--set-upstream", remote, branch])?;
        Self::ensure_success(&output, "git push")?;
        Ok(())
    }

    fn run_git(&self, args: &[&str]) -> Result<CommandOutput> {
        debug!(args = %args.join(" "), "git");
        self.runner
            .run("git", args, &self.project_path)
            .map_err(|e| DoctorError::GitOperation(format!("Failed to execute git command: {e}")))
    }

    fn ensure_success(output: &CommandOutput, command: &str) -> Result<()> {
        if output.success() {
            return Ok(());
        }

        Err(DoctorError::GitOperation(format!(
            "{} failed: {}",
            command,
            output.stderr.trim()
        )))
    }

    fn validate_git_path(path: &Path) -> Result<PathBuf> {
        let dangerous = [';', '|', '&', '$', '`', '\n', '\r'];
        let path_str = path.to_string_lossy();
        if let Some(ch) = dangerous.iter().find(|c| path_str.contains(**c)) {
            return Err(DoctorError::GitOperation(format!(
                "Path contains dangerous character: '{}'",
                ch
            )));
        }

        if !path.is_absolute() {
            return Err(DoctorError::GitOperation(
                "Only absolute paths are allowed for Git operations".to_string(),
            ));
        }

        PathValidator::validate_project_dir(path)
            .map_err(|err| DoctorError::GitOperation(format!("Invalid Git path: {}", err)))
    }
}

/// `<prefix>-<YYYYMMDDHHMMSS>`, restricted to `[A-Za-z0-9-_/]`.
pub fn branch_name_at(prefix: &str, now: &Zoned) -> String {
    let stamp = now.strftime("%Y%m%d%H%M%S").to_string();
    let mut branch_name: String = format!("{prefix}-{stamp}")
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '/' => c,
            _ => '-',
        })
        .collect();

    if branch_name.len() > MAX_BRANCH_LEN {
        // Keep the timestamp, which is what makes the name unique.
        let keep = MAX_BRANCH_LEN - stamp.len() - 1;
        let prefix_part: String = branch_name.chars().take(keep).collect();
        branch_name = format!("{prefix_part}-{stamp}");
    }

    branch_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command::testing::ScriptedRunner;
    use std::fs;
    use tempfile::{tempdir, tempdir_in};

    fn git_agent(
        runner: ScriptedRunner,
    ) -> (VersionControlAgent, Arc<ScriptedRunner>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let runner = Arc::new(runner);
        let canonical = dir.path().canonicalize().unwrap();
        let agent = VersionControlAgent::new(&canonical, runner.clone()).unwrap();
        (agent, runner, dir)
    }

    #[test]
    fn rejects_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        let temp = tempdir_in(&cwd).unwrap();
        let relative = PathBuf::from(temp.path().file_name().unwrap());
        assert!(VersionControlAgent::new(&relative, Arc::new(ScriptedRunner::new())).is_err());
    }

    #[test]
    fn rejects_dangerous_paths() {
        let dir = tempdir().unwrap();
        let dangerous = dir.path().join("sub;dir");
        fs::create_dir_all(&dangerous).unwrap();
        assert!(VersionControlAgent::new(dangerous, Arc::new(ScriptedRunner::new())).is_err());
    }

    fn fixed_time() -> Zoned {
        "2024-03-05T14:07:09Z"
            .parse::<jiff::Timestamp>()
            .unwrap()
            .to_zoned(jiff::tz::TimeZone::UTC)
    }

    #[test]
    fn branch_name_contains_timestamp() {
        let now = fixed_time();
        assert_eq!(
            branch_name_at("chore/deps-update", &now),
            "chore/deps-update-20240305140709"
        );
    }

    #[test]
    fn branch_name_is_sanitized_and_bounded() {
        let now = fixed_time();
        let long_prefix = "deps update ".repeat(10);
        let branch = branch_name_at(&long_prefix, &now);
        assert!(branch.len() <= MAX_BRANCH_LEN);
        assert!(branch.ends_with("-20240305140709"));
        assert!(
            branch
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        );
    }

    #[test]
    fn commit_passes_identity_per_invocation() {
        let (agent, runner, _dir) = git_agent(ScriptedRunner::new());
        let identity = GitIdentity {
            name: "Bot".to_string(),
            email: "bot@example.com".to_string(),
        };

        agent.commit("chore(deps): update", &identity).unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls,
            vec!["git -c user.name=Bot -c user.email=bot@example.com commit -m chore(deps): update"]
        );
        assert!(!calls.iter().any(|c| c.contains("--global")));
    }

    #[test]
    fn stage_refuses_missing_files() {
        let (agent, runner, _dir) = git_agent(ScriptedRunner::new());
        let err = agent
            .stage_files(&["package.json".to_string(), "yarn.lock".to_string()])
            .unwrap_err();
        assert!(matches!(err, DoctorError::GitOperation(_)));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn stage_adds_all_files_at_once() {
        let (agent, runner, _dir) = git_agent(ScriptedRunner::new());
        agent.stage_files(&["package.json".to_string()]).unwrap();
        assert_eq!(runner.calls(), vec!["git add -- package.json"]);
    }

    #[test]
    fn push_failure_surfaces_stderr() {
        let (agent, _runner, _dir) =
            git_agent(ScriptedRunner::new().fail("git push", "remote: Permission denied"));
        let err = agent.push("origin", "chore/deps-update-1").unwrap_err();
        assert!(err.to_string().contains("Permission denied"));
    }

    #[test]
    fn clean_working_directory_detection() {
        let (agent, _runner, _dir) =
            git_agent(ScriptedRunner::new().reply("git status", 0, " M package.json\n"));
        assert!(!agent.is_working_directory_clean().unwrap());
    }
}
