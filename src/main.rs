use clap::Parser;
use colored::Colorize;
use dependency_doctor::cli::{Cli, Commands, OutputArgs};
use dependency_doctor::workflow::{self, OutputOptions, RunOptions};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (options, output) = match cli.command {
        Commands::Scan { output } => (RunOptions::default(), output),
        Commands::Fix {
            dry_run,
            github_token,
            repository,
            base,
            remote,
            output,
        } => (
            RunOptions {
                auto_fix: true,
                dry_run,
                github_token,
                repository,
                base_branch: base,
                remote,
            },
            output,
        ),
    };

    let OutputArgs { format, output } = output;
    let result = workflow::execute(&cli.path, &options, &OutputOptions { format, output });

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
