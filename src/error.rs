use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Package manager scan failed: {0}")]
    ScanCommand(String),

    #[error("Unparseable command output: {0}")]
    OutputParsing(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Hosting API request failed: {0}")]
    HostApi(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoctorError {
    /// Errors raised while reading the project or the package manager output.
    pub fn is_scan_error(&self) -> bool {
        matches!(
            self,
            DoctorError::ProjectValidation(_)
                | DoctorError::ScanCommand(_)
                | DoctorError::OutputParsing(_)
                | DoctorError::Json(_)
        )
    }

    /// Errors raised by a write-side step: update, git, or the hosting API.
    pub fn is_remediation_error(&self) -> bool {
        matches!(
            self,
            DoctorError::CommandExecution(_)
                | DoctorError::GitOperation(_)
                | DoctorError::HostApi(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DoctorError>;
