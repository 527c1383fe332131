use crate::agents::{
    CommandRunner, DependencyScanner, ProjectScannerAgent, PublishedPullRequest,
    RemediationPublisher, SystemCommandRunner,
};
use crate::cli::OutputFormat;
use crate::config::{DoctorConfig, REPOSITORY_ENV};
use crate::error::{DoctorError, Result};
use crate::github::{GitHubClient, PullRequestHost};
use crate::model::{DependencyRecord, RiskLevel, UpdateKind};
use crate::report::{Report, ReportSummary, generate_report};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Flags controlling a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub auto_fix: bool,
    /// Suppresses every write-side action, even with `auto_fix`.
    pub dry_run: bool,
    pub github_token: Option<String>,
    /// `owner/repo`; `None` falls back to `GITHUB_REPOSITORY`, the config file,
    /// then the built-in default.
    pub repository: Option<String>,
    pub base_branch: Option<String>,
    pub remote: Option<String>,
}

impl RunOptions {
    fn token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug)]
pub enum RemediationOutcome {
    NotRequested,
    SkippedDryRun,
    SkippedMissingCredential,
    Published(PublishedPullRequest),
    Failed(DoctorError),
}

impl RemediationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RemediationOutcome::NotRequested => "not_requested",
            RemediationOutcome::SkippedDryRun => "skipped_dry_run",
            RemediationOutcome::SkippedMissingCredential => "skipped_missing_credential",
            RemediationOutcome::Published(_) => "published",
            RemediationOutcome::Failed(_) => "failed",
        }
    }
}

/// Result of a run. The report is always present; errors ride alongside it.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub scan_error: Option<DoctorError>,
    pub remediation: RemediationOutcome,
}

/// Sequences scan, report and the optional remediation.
pub struct DependencyDoctor {
    runner: Arc<dyn CommandRunner>,
    host: Option<Arc<dyn PullRequestHost>>,
}

impl Default for DependencyDoctor {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyDoctor {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, host: None }
    }

    /// Uses `host` instead of building a GitHub client from the token.
    pub fn with_host(mut self, host: Arc<dyn PullRequestHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn run(&self, manifest: &Path, options: &RunOptions) -> RunOutcome {
        let scanner = DependencyScanner::new(self.runner.clone());
        let (dependencies, scan_error) = match scanner.try_scan(manifest) {
            Ok(dependencies) => (dependencies, None),
            Err(e) => {
                error!(manifest = %manifest.display(), error = %e, "dependency scan failed");
                (Vec::new(), Some(e))
            }
        };

        let mut report = generate_report(&dependencies, None);

        let remediation = if !options.auto_fix {
            RemediationOutcome::NotRequested
        } else if options.dry_run {
            info!("dry run, skipping remediation");
            RemediationOutcome::SkippedDryRun
        } else {
            match options.token() {
                None => {
                    info!("no GitHub token, skipping remediation");
                    RemediationOutcome::SkippedMissingCredential
                }
                Some(token) => match self.remediate(manifest, options, token, &report.content) {
                    Ok(published) => {
                        report.attach_pull_request(published.url.clone());
                        RemediationOutcome::Published(published)
                    }
                    Err(e) => {
                        error!(error = %e, "failed to create the pull request");
                        RemediationOutcome::Failed(e)
                    }
                },
            }
        };

        RunOutcome {
            report,
            scan_error,
            remediation,
        }
    }

    fn remediate(
        &self,
        manifest: &Path,
        options: &RunOptions,
        token: &str,
        body: &str,
    ) -> Result<PublishedPullRequest> {
        let project = ProjectScannerAgent::new(manifest).validate()?;

        let mut config = DoctorConfig::load(&project.project_dir)?;
        if let Some(base) = &options.base_branch {
            config.base_branch = base.clone();
        }
        if let Some(remote) = &options.remote {
            config.remote = remote.clone();
        }
        config.validate()?;

        let from_env = std::env::var(REPOSITORY_ENV).ok();
        let repository =
            config.resolve_repository(options.repository.as_deref(), from_env.as_deref())?;
        let host: Arc<dyn PullRequestHost> = match &self.host {
            Some(host) => host.clone(),
            None => Arc::new(GitHubClient::new(&config.api_base_url, token)?),
        };

        info!(%repository, base = %config.base_branch, "publishing remediation");
        RemediationPublisher::new(self.runner.clone(), host, config).publish(
            &project.project_dir,
            &repository,
            body,
        )
    }
}

/// Where and how the CLI writes the report.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// CLI entry: runs the doctor with progress output and writes the report.
pub fn execute<P: AsRef<Path>>(
    path: P,
    options: &RunOptions,
    output: &OutputOptions,
) -> Result<()> {
    let path = path.as_ref();
    eprintln!("{}", "Dependency Doctor".cyan().bold());
    eprintln!("\n{}", "1. Scanning dependencies...".yellow());

    let spinner = spinner(matches!(output.format, OutputFormat::Json));
    spinner.set_message("running npm outdated and npm audit");
    let outcome = DependencyDoctor::new().run(path, options);
    spinner.finish_and_clear();

    if let Some(e) = &outcome.scan_error {
        eprintln!("{} {}", "⚠ Scan failed:".red(), e);
    } else {
        eprintln!("{}", "✓ Scan completed".green());
    }

    eprintln!("\n{}", "2. Summary".yellow());
    print_summary(&outcome.report);

    eprintln!("\n{}", "3. Remediation".yellow());
    print_remediation(&outcome.remediation);

    let rendered = match output.format {
        OutputFormat::Markdown => outcome.report.content.clone(),
        OutputFormat::Json => render_json(&outcome)?,
    };

    match &output.output {
        Some(file) => {
            std::fs::write(file, &rendered)?;
            eprintln!(
                "\n{}",
                format!("✓ Report written to {}", file.display()).green()
            );
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn spinner(hidden: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if hidden {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
    }
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_summary(report: &Report) {
    let summary = &report.summary;
    eprintln!(
        "  {} outdated, {} critical",
        summary.total_issues.to_string().yellow(),
        summary.critical_issues.to_string().red()
    );

    for dep in &report.dependencies {
        let risk = match dep.risk {
            RiskLevel::Critical => dep.risk.as_str().red().bold(),
            RiskLevel::High => dep.risk.as_str().red(),
            RiskLevel::Moderate => dep.risk.as_str().yellow(),
            RiskLevel::Low => dep.risk.as_str().green(),
        };
        let major = if dep.update_kind() == Some(UpdateKind::Major) {
            " (major)".magenta().to_string()
        } else {
            String::new()
        };
        eprintln!(
            "  • {} {} → {}{} [{}]",
            dep.name.white().bold(),
            dep.current.red(),
            dep.latest.green(),
            major,
            risk
        );
    }
}

fn print_remediation(outcome: &RemediationOutcome) {
    match outcome {
        RemediationOutcome::NotRequested => {
            eprintln!("  {}", "Not requested (use `fix` to open a pull request)".dimmed())
        }
        RemediationOutcome::SkippedDryRun => {
            eprintln!("  {}", "Dry run: no branch, commit or pull request created".yellow())
        }
        RemediationOutcome::SkippedMissingCredential => {
            eprintln!("  {}", "Skipped: no GitHub token supplied".yellow())
        }
        RemediationOutcome::Published(published) => {
            let url = published.url.as_deref().unwrap_or("(URL unavailable)");
            eprintln!(
                "  {} {} on {}",
                "✓ Pull request opened:".green(),
                url.bright_cyan(),
                published.branch
            );
        }
        RemediationOutcome::Failed(e) => {
            eprintln!("  {} {}", "✗ Pull request creation failed:".red(), e);
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    content: &'a str,
    summary: &'a ReportSummary,
    dependencies: Vec<JsonDependency<'a>>,
    scan_error: Option<String>,
    remediation: &'static str,
    remediation_error: Option<String>,
}

#[derive(Serialize)]
struct JsonDependency<'a> {
    #[serde(flatten)]
    record: &'a DependencyRecord,
    update_kind: Option<UpdateKind>,
}

fn render_json(outcome: &RunOutcome) -> Result<String> {
    let remediation_error = match &outcome.remediation {
        RemediationOutcome::Failed(e) => Some(e.to_string()),
        _ => None,
    };

    let output = JsonOutput {
        content: &outcome.report.content,
        summary: &outcome.report.summary,
        dependencies: outcome
            .report
            .dependencies
            .iter()
            .map(|record| JsonDependency {
                record,
                update_kind: record.update_kind(),
            })
            .collect(),
        scan_error: outcome.scan_error.as_ref().map(ToString::to_string),
        remediation: outcome.remediation.label(),
        remediation_error,
    };

    Ok(serde_json::to_string_pretty(&output)?)
}
