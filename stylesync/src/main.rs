use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use stylesync::{LoadedConfig, Overrides, SyncMode};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STYLESYNC_LOG";

/// Copy the shared stylesheet into the style block of each configured component.
#[derive(Parser, Debug)]
#[command(name = "stylesync", version, about)]
struct Args {
    /// Config file, defaults to ./stylesync.toml or the "stylesync" key of ./package.json
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Canonical stylesheet, replaces the configured one
    #[arg(long)]
    stylesheet: Option<PathBuf>,
    /// Component path or glob pattern, replaces configured targets
    #[arg(long)]
    component: Option<String>,
    /// Start marker attribute, e.g. `module` for <style module>
    #[arg(long)]
    attribute: Option<String>,
    /// Report stale components without writing, fail if any
    #[arg(long)]
    check: bool,
    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

// `--verbose` wins over the environment.
fn log_directives(verbose: bool, env: Option<String>) -> String {
    match (verbose, env) {
        (true, _) => "debug".to_string(),
        (false, Some(env)) if !env.trim().is_empty() => env,
        _ => "info".to_string(),
    }
}

fn init_tracing(verbose: bool) {
    let directives = log_directives(verbose, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns false if some component is stale in check mode.
fn run(args: Args) -> stylesync::Result<bool> {
    let loaded = match &args.config {
        Some(path) => LoadedConfig::from_file(path)?,
        None => LoadedConfig::discover(Path::new("."))?,
    };
    tracing::debug!(source = ?loaded.source, "using config");

    let config = loaded.resolve_with(&Overrides {
        base: PathBuf::new(),
        stylesheet: args.stylesheet,
        component: args.component,
        attribute: args.attribute,
    })?;

    let mode = if args.check {
        SyncMode::Check
    } else {
        SyncMode::Write
    };
    let reports = stylesync::sync(&config, mode)?;

    let stale = reports.iter().filter(|r| r.changed).count();
    match mode {
        SyncMode::Write => {
            tracing::info!(components = reports.len(), updated = stale, "done");
            Ok(true)
        }
        SyncMode::Check => {
            tracing::info!(components = reports.len(), stale, "checked");
            Ok(stale == 0)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
