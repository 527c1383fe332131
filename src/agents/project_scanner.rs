use crate::error::{DoctorError, Result};
use crate::utils::path_validator::PathValidator;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "package.json";
const LOCKFILES: &[&str] = &["package-lock.json", "npm-shrinkwrap.json"];

/// ProjectScannerAgent resolves a manifest path into a validated project layout
pub struct ProjectScannerAgent {
    target: PathBuf,
}

impl ProjectScannerAgent {
    /// `target` may point at `package.json` itself or at its directory.
    pub fn new<P: AsRef<Path>>(target: P) -> Self {
        Self {
            target: target.as_ref().to_path_buf(),
        }
    }

    pub fn validate(&self) -> Result<ProjectInfo> {
        let dir = self.containing_dir();
        let project_dir = PathValidator::validate_project_dir(&dir)?;

        let manifest_path = project_dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(DoctorError::ProjectValidation(format!(
                "{} not found in '{}'",
                MANIFEST_FILE,
                project_dir.display()
            )));
        }

        let lockfile = LOCKFILES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|path| path.is_file());

        let git_dir = project_dir.join(".git");

        Ok(ProjectInfo {
            has_git: git_dir.exists(),
            manifest_path,
            lockfile,
            project_dir,
        })
    }

    fn containing_dir(&self) -> PathBuf {
        let is_manifest = self
            .target
            .file_name()
            .is_some_and(|name| name == MANIFEST_FILE);

        if !is_manifest {
            return self.target.clone();
        }

        match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectInfo {
    pub project_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub lockfile: Option<PathBuf>,
    pub has_git: bool,
}

impl ProjectInfo {
    /// Files the update step may modify, relative to the project directory.
    pub fn tracked_files(&self) -> Vec<String> {
        let mut files = vec![MANIFEST_FILE.to_string()];
        if let Some(name) = self
            .lockfile
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
        {
            files.push(name);
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_manifest_path_to_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let info = ProjectScannerAgent::new(dir.path().join("package.json"))
            .validate()
            .unwrap();

        assert_eq!(info.project_dir, dir.path().canonicalize().unwrap());
        assert!(info.lockfile.is_none());
        assert!(!info.has_git);
        assert_eq!(info.tracked_files(), vec!["package.json".to_string()]);
    }

    #[test]
    fn accepts_directory_and_detects_lockfile() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let info = ProjectScannerAgent::new(dir.path()).validate().unwrap();

        assert!(info.has_git);
        assert_eq!(
            info.tracked_files(),
            vec!["package.json".to_string(), "package-lock.json".to_string()]
        );
    }

    #[test]
    fn rejects_directory_without_manifest() {
        let dir = tempdir().unwrap();
        let err = ProjectScannerAgent::new(dir.path()).validate().unwrap_err();
        assert!(matches!(err, DoctorError::ProjectValidation(_)));
    }

    #[test]
    fn bare_manifest_name_resolves_to_current_dir() {
        let agent = ProjectScannerAgent::new("package.json");
        assert_eq!(agent.containing_dir(), PathBuf::from("."));
    }
}
