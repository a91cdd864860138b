//! Remove command implementation.

use crate::context::Context;
use crate::output;
use anyhow::{Result, bail};
use clap::Args;
use libretto_manifest::{LinkSection, ManifestDocument, ManifestTransaction, RevertGuard};
use std::process::ExitCode;

/// Arguments for the remove command.
#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Packages to remove
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Remove from dev dependencies
    #[arg(long)]
    pub dev: bool,

    /// Show what would be removed without modifying composer.json
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the remove command.
pub fn run(ctx: &Context, args: &RemoveArgs, guard: &RevertGuard) -> Result<ExitCode> {
    let path = ctx.manifest_path().to_path_buf();
    if !path.exists() {
        bail!("{} not found in {}", file_name(&path), ctx.config.project_dir.display());
    }
    let mut document = ManifestDocument::load(&path)?;
    let removed = remove_packages(&mut document, LinkSection::from_dev(args.dev), &args.packages);

    if removed == 0 {
        output::warning("No packages were removed");
        return Ok(ExitCode::SUCCESS);
    }
    if args.dry_run {
        output::info(&format!("Dry run: {} was not modified", path.display()));
        return Ok(ExitCode::SUCCESS);
    }

    let mut txn = ManifestTransaction::begin(&path)?.guarded(guard);
    if let Err(err) = txn.write(&document.render()?) {
        txn.rollback()?;
        return Err(err.into());
    }
    txn.commit()?;
    output::success(&format!("{} has been updated", path.display()));
    Ok(ExitCode::SUCCESS)
}

/// Remove each package from `section`, falling back to the other section.
/// Returns how many entries were removed.
fn remove_packages(document: &mut ManifestDocument, section: LinkSection, packages: &[String]) -> usize {
    let mut removed = 0;
    for package in packages {
        if let Some((name, constraint)) = document.remove_link(section, package) {
            output::change('-', &name, &constraint);
            removed += 1;
        } else if let Some((name, constraint)) = document.remove_link(section.opposite(), package) {
            output::warning(&format!(
                "{name} could not be found in {} but it is present in {}, removing it from there",
                section.key(),
                section.opposite().key()
            ));
            output::change('-', &name, &constraint);
            removed += 1;
        } else {
            output::warning(&format!(
                "{package} is not required in your composer.json and has not been removed"
            ));
        }
    }
    removed
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "composer.json".to_string())
}
