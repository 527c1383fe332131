use crate::error::{DoctorError, Result};
use std::path::{Path, PathBuf};

const SYSTEM_DIRS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

/// Path checks applied before any command runs inside a project.
pub struct PathValidator;

impl PathValidator {
    /// Canonicalises a project directory and rejects files and system directories.
    pub fn validate_project_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            DoctorError::ProjectValidation(format!("Invalid path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(DoctorError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        if let Some(system_dir) = SYSTEM_DIRS.iter().find(|dir| Self::is_under(&canonical, dir)) {
            return Err(DoctorError::ProjectValidation(format!(
                "Access to system directory '{}' is not allowed",
                system_dir
            )));
        }

        Ok(canonical)
    }

    /// Ensures `file_path` exists and resolves inside `base_dir`.
    pub fn ensure_within(file_path: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let canonical_file = file_path.canonicalize().map_err(|e| {
            DoctorError::ProjectValidation(format!(
                "Invalid file path '{}': {e}",
                file_path.display()
            ))
        })?;
        let canonical_base = base_dir.canonicalize().map_err(|e| {
            DoctorError::ProjectValidation(format!(
                "Invalid base directory '{}': {e}",
                base_dir.display()
            ))
        })?;

        if !canonical_file.starts_with(&canonical_base) {
            return Err(DoctorError::ProjectValidation(format!(
                "'{}' is outside the project directory",
                file_path.display()
            )));
        }

        Ok(canonical_file)
    }

    fn is_under(canonical: &Path, system_dir: &str) -> bool {
        let system_path = Path::new(system_dir);
        if canonical.starts_with(system_path) {
            return true;
        }
        system_path
            .canonicalize()
            .map(|resolved| canonical.starts_with(resolved))
            .unwrap_or(false)
    }
}
