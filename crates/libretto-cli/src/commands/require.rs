//! Require command implementation.

use crate::context::Context;
use crate::output;
use anyhow::{Result, bail};
use clap::Args;
use libretto_manifest::{LinkSection, ManifestDocument, ManifestTransaction, RevertGuard};
use libretto_resolver::{PlatformRequirementFilter, Requirement, Resolver, parse_name_version_pairs};
use std::process::ExitCode;
use tracing::debug;

/// Arguments for the require command.
#[derive(Args, Debug, Clone)]
pub struct RequireArgs {
    /// Packages to require, optionally with a version constraint (vendor/package:^1.0)
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Add requirement to require-dev
    #[arg(long)]
    pub dev: bool,

    /// Write fixed version to composer.json instead of a range
    #[arg(long)]
    pub fixed: bool,

    /// Prefer stable versions of dependencies
    #[arg(long)]
    pub prefer_stable: bool,

    /// Ignore all platform requirements (php & ext- packages)
    #[arg(long)]
    pub ignore_platform_reqs: bool,

    /// Ignore a specific platform requirement (php & ext- packages); append + to ignore only the upper bound
    #[arg(long, value_name = "REQ")]
    pub ignore_platform_req: Vec<String>,

    /// Sort packages when adding/updating a new dependency
    #[arg(long)]
    pub sort_packages: bool,

    /// Show what would be written without modifying composer.json
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the require command.
pub fn run(ctx: &Context, args: &RequireArgs, guard: &RevertGuard) -> Result<ExitCode> {
    let path = ctx.manifest_path().to_path_buf();
    let section = LinkSection::from_dev(args.dev);
    let existed = path.exists();
    let mut document = if existed {
        ManifestDocument::load(&path)?
    } else {
        ManifestDocument::empty()
    };

    let resolver = ctx.resolver();
    let filter = ctx.platform_filter();
    let requirements = resolver.determine_requirements(&args.packages, &filter, args.fixed)?;

    if let Some(root) = ctx.manifest.as_ref().and_then(|m| m.name.as_deref())
        && let Some(own) = requirements.iter().find(|r| r.name.eq_ignore_ascii_case(root))
    {
        bail!("Root package '{}' cannot require itself in its composer.json", own.name);
    }

    for token in parse_name_version_pairs(&args.packages) {
        if token.version.is_none()
            && let Some(requirement) = requirements.iter().find(|r| r.name.eq_ignore_ascii_case(&token.name))
        {
            output::info(&format!("Using version {} for {}", requirement.constraint, requirement.name));
        }
    }

    let changed = apply(&mut document, section, &requirements, ctx.config.sort_packages, args.dev);
    if args.dry_run {
        output::info(&format!("Dry run: {} was not modified", path.display()));
        return Ok(ExitCode::SUCCESS);
    }
    if changed == 0 {
        output::line("The requirements are already present, nothing to modify");
        return Ok(ExitCode::SUCCESS);
    }

    let mut txn = ManifestTransaction::begin(&path)?.guarded(guard);
    if !existed {
        output::info(&format!("{} has been created", path.display()));
    }
    let outcome = txn
        .write(&document.render()?)
        .map_err(anyhow::Error::from)
        .and_then(|_| verify(&resolver, &document, &path, section, &requirements, &filter));

    match outcome {
        Ok(()) => {
            txn.commit()?;
            output::success(&format!("{} has been updated", path.display()));
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            output::error(&format!(
                "Installation failed, reverting {} to its original content.",
                path.display()
            ));
            txn.rollback()?;
            Err(err)
        }
    }
}

/// Write `requirements` into `section`, moving entries out of the other
/// section. Returns how many links changed.
fn apply(
    document: &mut ManifestDocument,
    section: LinkSection,
    requirements: &[Requirement],
    sort_packages: bool,
    dev: bool,
) -> usize {
    let mut changed = 0;
    for requirement in requirements {
        if let Some((name, _)) = document.remove_link(section.opposite(), &requirement.name) {
            output::warning(&format!(
                "{name} is currently present in the {} key and you ran the command {} the --dev flag, which will move it to the {} key.",
                section.opposite().key(),
                if dev { "with" } else { "without" },
                section.key()
            ));
            changed += 1;
        }

        let previous = document.link(section, &requirement.name);
        document.add_link(section, &requirement.name, &requirement.constraint, sort_packages);
        match previous {
            Some((_, old)) if old == requirement.constraint => {
                debug!(package = %requirement.name, "requirement unchanged");
            }
            Some(_) => {
                output::change('~', &requirement.name, &requirement.constraint);
                changed += 1;
            }
            None => {
                output::change('+', &requirement.name, &requirement.constraint);
                changed += 1;
            }
        }
    }
    changed
}

/// Check that what landed on disk is what was meant and that every new
/// requirement still resolves against the repositories.
fn verify(
    resolver: &Resolver,
    document: &ManifestDocument,
    path: &std::path::Path,
    section: LinkSection,
    requirements: &[Requirement],
    filter: &PlatformRequirementFilter,
) -> Result<()> {
    let written = ManifestDocument::load(path)?;
    if written.links(section) != document.links(section) {
        bail!("{} does not contain the expected requirements after writing", path.display());
    }
    for requirement in requirements {
        resolver.find_best_version_and_name_for_package(
            &requirement.name,
            Some(&requirement.constraint),
            filter,
            false,
        )?;
    }
    Ok(())
}
