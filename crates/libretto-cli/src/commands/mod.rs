//! CLI commands for Libretto.

pub mod bump;
pub mod remove;
pub mod require;
pub mod show;

use clap::{Parser, Subcommand};
use libretto_config::CliOverrides;
use std::path::PathBuf;

/// Libretto - A high-performance Composer-compatible package manager
///
/// Adds, removes and bumps requirements in composer.json, choosing the
/// constraint to record from the configured repositories.
#[derive(Parser, Debug)]
#[command(name = "libretto")]
#[command(author = "Libretto Contributors")]
#[command(version)]
#[command(about = "A high-performance Composer-compatible package manager", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
#[command(styles = get_styles())]
pub struct Cli {
    /// Do not output any message
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable ANSI output (colors and formatting)
    #[arg(long, global = true)]
    pub no_ansi: bool,

    /// Do not ask any interactive question
    #[arg(short = 'n', long, global = true)]
    pub no_interaction: bool,

    /// Use the specified directory as working directory
    #[arg(short = 'd', long = "working-dir", global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Increase the verbosity of messages: -v for verbose, -vv for very verbose, -vvv for debug
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration overrides taken from the command line.
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            no_interaction: self.no_interaction,
            ..CliOverrides::default()
        };
        match &self.command {
            Commands::Require(args) => {
                overrides.ignore_platform_reqs = args.ignore_platform_reqs;
                overrides.ignore_platform_req = args.ignore_platform_req.clone();
                overrides.prefer_stable = args.prefer_stable;
                overrides.sort_packages = args.sort_packages;
            }
            Commands::Show(args) => {
                overrides.ignore_platform_reqs = args.ignore_platform_reqs;
                overrides.ignore_platform_req = args.ignore_platform_req.clone();
            }
            Commands::Remove(_) | Commands::Bump(_) => {}
        }
        overrides
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Increases the lower limit of your composer.json requirements to the currently installed versions
    Bump(bump::BumpArgs),

    /// Removes a package from the require or require-dev
    #[command(visible_alias = "rm", alias = "uninstall")]
    Remove(remove::RemoveArgs),

    /// Adds required packages to your composer.json
    #[command(visible_alias = "r")]
    Require(require::RequireArgs),

    /// Shows the version and constraint that would be chosen for a package
    #[command(alias = "info", disable_version_flag = true)]
    Show(show::ShowArgs),
}

/// Get clap styles for colored help
const fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default())
        .placeholder(clap::builder::styling::AnsiColor::Yellow.on_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn require_flags_become_overrides() {
        let cli = Cli::parse_from([
            "libretto",
            "-n",
            "require",
            "acme/tool",
            "--ignore-platform-req=ext-gd",
            "--ignore-platform-req=php+",
            "--sort-packages",
        ]);
        let overrides = cli.overrides();
        assert!(overrides.no_interaction);
        assert!(overrides.sort_packages);
        assert_eq!(overrides.ignore_platform_req, ["ext-gd", "php+"]);
        assert!(!overrides.ignore_platform_reqs);
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["libretto", "-vvv", "remove", "acme/tool"]);
        assert_eq!(cli.verbose, 3);
    }
}
