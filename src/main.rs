//! Addon Repo CLI
//!
//! Entry point for the `addon-repo` command-line tool.

use addon_repo::{Progress, RepoLayout, RunReport};
use clap::Parser;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "addon-repo")]
#[command(about = "Update a static addon repository", version)]
struct Cli {
    /// Archive to add (e.g. plugin.video.sportplay-2.3.0.zip); omit to only regenerate
    archive: Option<PathBuf>,

    /// Repository root (default: current directory)
    #[arg(long, short = 'r', env = "ADDON_REPO_DIR")]
    repo: Option<PathBuf>,

    /// Path to repo config file (default: <repo>/addon-repo.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Suppress progress output
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = cli.repo.unwrap_or_else(|| PathBuf::from("."));
    let layout = match RepoLayout::load(root, cli.config.as_deref()) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(2);
        }
    };

    let progress = if cli.quiet || cli.json {
        Progress::Quiet
    } else {
        Progress::Stderr
    };

    if progress == Progress::Stderr {
        print_banner();
    }

    let report = match addon_repo::run(&layout, cli.archive.as_deref(), progress) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    if cli.json {
        print_json(&report);
    } else if !cli.quiet {
        print_publish_hint();
    }
}

fn print_banner() {
    let rule = "=".repeat(45);
    eprintln!("{}", rule);
    eprintln!("  Addon Repo Updater");
    eprintln!("{}", rule);
}

fn print_json(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            process::exit(3);
        }
    }
}

fn print_publish_hint() {
    let rule = "=".repeat(45);
    println!();
    println!("{}", rule);
    println!("  git add -A");
    println!("  git commit -m \"Update\"");
    println!("  git push");
    println!("{}", rule);
}
