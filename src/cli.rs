use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dependency-doctor",
    about = "Dependency Doctor - scan npm dependencies, rate their risk, and open update pull requests",
    version,
    author
)]
pub struct Cli {
    /// Path to package.json or its directory (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    pub path: String,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report outdated dependencies and their risk without changing anything
    Scan {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Scan, then update dependencies on a new branch and open a pull request
    Fix {
        /// Analyse only: no branch, commit, push or pull request
        #[arg(long)]
        dry_run: bool,

        /// Token with write access to the repository
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// Repository to open the pull request against (owner/repo)
        #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
        repository: Option<String>,

        /// Base branch for the pull request (default: main)
        #[arg(long, value_name = "BRANCH")]
        base: Option<String>,

        /// Git remote to push the update branch to (default: origin)
        #[arg(long, value_name = "NAME")]
        remote: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Report format written to stdout or --output
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fix_flags() {
        let cli = Cli::try_parse_from([
            "dependency-doctor",
            "--path",
            "app/package.json",
            "fix",
            "--dry-run",
            "--github-token",
            "t0ken",
            "--repository",
            "acme/widgets",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.path, "app/package.json");
        match cli.command {
            Commands::Fix {
                dry_run,
                github_token,
                repository,
                output,
                ..
            } => {
                assert!(dry_run);
                assert_eq!(github_token.as_deref(), Some("t0ken"));
                assert_eq!(repository.as_deref(), Some("acme/widgets"));
                assert_eq!(output.format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn scan_defaults_to_markdown() {
        let cli = Cli::try_parse_from(["dependency-doctor", "scan"]).unwrap();
        assert_eq!(cli.path, ".");
        match cli.command {
            Commands::Scan { output } => {
                assert_eq!(output.format, OutputFormat::Markdown);
                assert!(output.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
