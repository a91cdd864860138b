//! Libretto CLI - Composer-compatible requirement management.
//!
//! `require`, `remove`, `bump` and `show` pick package versions from the
//! configured repositories and edit composer.json transactionally.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod context;
mod output;
mod platform;
mod signal;

use clap::Parser;
use commands::{Cli, Commands};
use context::Context;
use libretto_config::ConfigError;
use libretto_manifest::RevertGuard;
use libretto_resolver::ResolveError;
use miette::Diagnostic;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Exit code for invalid usage or configuration.
const USAGE_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_ansi)
        .with_target(false)
        .without_time()
        .compact()
        .init();

    output::init(cli.no_ansi, cli.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output::error(&format!("Failed to start the runtime: {e}"));
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let guard = RevertGuard::new();
    let interrupt = signal::install(guard.clone());

    let result = tokio::task::spawn_blocking(move || execute(&cli, &guard)).await;
    interrupt.abort();

    match result {
        Ok(Ok(code)) => code,
        Ok(Err(err)) => report(&err),
        Err(err) => {
            output::error(&format!("The command did not complete: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli, guard: &RevertGuard) -> anyhow::Result<ExitCode> {
    let ctx = Context::load(cli.working_dir.as_deref(), &cli.overrides())?;
    match &cli.command {
        Commands::Require(args) => commands::require::run(&ctx, args, guard),
        Commands::Remove(args) => commands::remove::run(&ctx, args, guard),
        Commands::Bump(args) => commands::bump::run(&ctx, args, guard),
        Commands::Show(args) => commands::show::run(&ctx, args),
    }
}

/// Print an error and choose the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(resolve) = err.downcast_ref::<ResolveError>() {
        output::diagnostic(resolve);
        return ExitCode::FAILURE;
    }
    if let Some(config) = err.downcast_ref::<ConfigError>() {
        output::error(&config.to_string());
        if let Some(help) = config.help() {
            eprintln!("  help: {help}");
        }
        return ExitCode::from(USAGE_ERROR);
    }
    output::error(&format!("{err:#}"));
    ExitCode::FAILURE
}
