//! Bump command implementation.

use crate::context::Context;
use crate::output;
use anyhow::{Context as _, Result, bail};
use clap::Args;
use libretto_manifest::{LinkSection, LockFile, ManifestDocument, ManifestTransaction, RevertGuard};
use libretto_resolver::{ComposerConstraint, Repository, VersionBumper, is_platform_package};
use regex::Regex;
use std::process::ExitCode;
use tracing::{debug, warn};

/// Arguments for the bump command.
#[derive(Args, Debug, Clone)]
pub struct BumpArgs {
    /// Optional package names or patterns (e.g. "symfony/*") to restrict which requirements are bumped
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Only bump requirements in "require-dev"
    #[arg(short = 'D', long, conflicts_with = "no_dev_only")]
    pub dev_only: bool,

    /// Only bump requirements in "require"
    #[arg(short = 'R', long)]
    pub no_dev_only: bool,

    /// Output the packages to bump, but do not modify composer.json; exits with 1 when changes are pending
    #[arg(long)]
    pub dry_run: bool,
}

/// A requirement whose constraint would change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bump {
    section: LinkSection,
    name: String,
    from: String,
    to: String,
}

impl Bump {
    /// `section.name: from => to`, as listed by a dry run.
    fn describe(&self) -> String {
        format!("{}.{}: {} => {}", self.section.key(), self.name, self.from, self.to)
    }
}

/// Run the bump command.
pub fn run(ctx: &Context, args: &BumpArgs, guard: &RevertGuard) -> Result<ExitCode> {
    let path = ctx.manifest_path().to_path_buf();
    if !path.exists() {
        bail!("{} not found, nothing to bump", path.display());
    }
    let lock_path = ctx.lock_path();
    let Some(lock) = LockFile::load(&lock_path)? else {
        bail!(
            "{} is not present, run an install before bumping requirements",
            lock_path.display()
        );
    };

    let sections: &[LinkSection] = if args.dev_only {
        &[LinkSection::RequireDev]
    } else if args.no_dev_only {
        &[LinkSection::Require]
    } else {
        &[LinkSection::Require, LinkSection::RequireDev]
    };
    let filter = name_filter(&args.packages)?;

    let mut document = ManifestDocument::load(&path)?;
    let bumps = find_bumps(&document, &lock, sections, filter.as_ref());

    if bumps.is_empty() {
        output::info(&format!("No requirements to update in {}.", path.display()));
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        output::line(&format!("{} would be updated with:", path.display()));
        for bump in &bumps {
            output::line(&format!(" - {}", bump.describe()));
        }
        return Ok(ExitCode::FAILURE);
    }

    for bump in &bumps {
        document.add_link(bump.section, &bump.name, &bump.to, false);
        debug!(package = %bump.name, from = %bump.from, to = %bump.to, "bumping requirement");
        output::change('~', &bump.name, &bump.to);
    }
    let mut txn = ManifestTransaction::begin(&path)?.guarded(guard);
    if let Err(err) = txn.write(&document.render()?) {
        txn.rollback()?;
        return Err(err).context("failed to write the bumped requirements");
    }
    txn.commit()?;
    output::success(&format!(
        "{} has been updated ({} changes).",
        path.display(),
        bumps.len()
    ));
    Ok(ExitCode::SUCCESS)
}

/// Regex matching any of the given names; `*` is a wildcard.
fn name_filter(patterns: &[String]) -> Result<Option<Regex>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let alternatives: Vec<String> = patterns
        .iter()
        .map(|p| p.split('*').map(regex::escape).collect::<Vec<_>>().join(".*"))
        .collect();
    let regex = Regex::new(&format!("(?i)^(?:{})$", alternatives.join("|")))
        .context("invalid package filter")?;
    Ok(Some(regex))
}

fn find_bumps(
    document: &ManifestDocument,
    lock: &LockFile,
    sections: &[LinkSection],
    filter: Option<&Regex>,
) -> Vec<Bump> {
    let installed = lock.installed_repository(true);
    let bumper = VersionBumper::new();
    let mut bumps = Vec::new();

    for &section in sections {
        for (name, constraint) in document.links(section) {
            if is_platform_package(&name) || filter.is_some_and(|f| !f.is_match(&name)) {
                continue;
            }
            let Some(package) = installed
                .find_packages(&name, None)
                .into_iter()
                .find(|p| p.alias_of().is_none())
            else {
                debug!(package = %name, "not installed, skipping");
                continue;
            };
            let parsed = match ComposerConstraint::parse(&constraint) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(package = %name, error = %err, "cannot parse the current constraint, skipping");
                    continue;
                }
            };
            let bumped = bumper.bump_requirement(&parsed, &package);
            if bumped != constraint {
                bumps.push(Bump {
                    section,
                    name,
                    from: constraint,
                    to: bumped,
                });
            }
        }
    }
    bumps
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOCK: &str = r#"{
        "packages": [
            {"name": "acme/log", "version": "1.4.2"},
            {"name": "acme/tool", "version": "2.0.0"},
            {"name": "acme/branch", "version": "dev-main"}
        ],
        "packages-dev": [
            {"name": "phpunit/phpunit", "version": "11.2.0"}
        ]
    }"#;

    const MANIFEST: &str = r#"{
        "require": {
            "php": "^8.1",
            "acme/log": "^1.0",
            "acme/tool": "^2.0",
            "acme/branch": "dev-main",
            "acme/missing": "^1.0"
        },
        "require-dev": {"phpunit/phpunit": "^11.0"}
    }"#;

    fn bumps(sections: &[LinkSection], filter: &[&str]) -> Vec<Bump> {
        let document = ManifestDocument::parse(MANIFEST).unwrap();
        let lock: LockFile = sonic_rs::from_str(LOCK).unwrap();
        let patterns: Vec<String> = filter.iter().map(|s| s.to_string()).collect();
        let regex = name_filter(&patterns).unwrap();
        find_bumps(&document, &lock, sections, regex.as_ref())
    }

    #[test]
    fn bumps_lower_bounds_to_installed_versions() {
        let found = bumps(&[LinkSection::Require, LinkSection::RequireDev], &[]);
        assert_eq!(
            found,
            vec![
                Bump {
                    section: LinkSection::Require,
                    name: "acme/log".into(),
                    from: "^1.0".into(),
                    to: "^1.4.2".into(),
                },
                Bump {
                    section: LinkSection::RequireDev,
                    name: "phpunit/phpunit".into(),
                    from: "^11.0".into(),
                    to: "^11.2".into(),
                },
            ]
        );
    }

    #[test]
    fn dry_run_lines_show_old_and_new_constraints() {
        let found = bumps(&[LinkSection::RequireDev], &[]);
        assert_eq!(found[0].describe(), "require-dev.phpunit/phpunit: ^11.0 => ^11.2");
    }

    #[test]
    fn sections_and_filters_narrow_the_result() {
        let dev_only = bumps(&[LinkSection::RequireDev], &[]);
        assert_eq!(dev_only.len(), 1);
        assert_eq!(dev_only[0].name, "phpunit/phpunit");

        let filtered = bumps(&[LinkSection::Require, LinkSection::RequireDev], &["ACME/*"]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "acme/log");
    }

    #[test]
    fn name_filter_escapes_regex_characters() {
        let regex = name_filter(&["acme/log.x".to_string()]).unwrap().unwrap();
        assert!(regex.is_match("acme/log.x"));
        assert!(!regex.is_match("acme/logax"));
        assert!(name_filter(&[]).unwrap().is_none());
    }
}
