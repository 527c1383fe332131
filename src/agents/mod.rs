pub mod command;
pub mod dependency_scanner;
pub mod package_manager;
pub mod project_scanner;
pub mod remediation;
pub mod version_control;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use dependency_scanner::DependencyScanner;
pub use package_manager::PackageManagerAgent;
pub use project_scanner::{ProjectInfo, ProjectScannerAgent};
pub use remediation::{PublishedPullRequest, RemediationPublisher};
pub use version_control::VersionControlAgent;
