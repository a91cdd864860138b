//! Show command implementation.

use crate::context::Context;
use crate::output::{self, table::Table};
use anyhow::Result;
use clap::Args;
use libretto_resolver::{Abandoned, PackageHandle, Resolver};
use std::process::ExitCode;

/// Arguments for the show command.
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Package to inspect
    #[arg(value_name = "PACKAGE")]
    pub package: String,

    /// Version constraint to select with
    #[arg(value_name = "CONSTRAINT")]
    pub constraint: Option<String>,

    /// Ignore all platform requirements (php & ext- packages)
    #[arg(long)]
    pub ignore_platform_reqs: bool,

    /// Ignore a specific platform requirement (php & ext- packages)
    #[arg(long, value_name = "REQ")]
    pub ignore_platform_req: Vec<String>,
}

/// Run the show command.
pub fn run(ctx: &Context, args: &ShowArgs) -> Result<ExitCode> {
    let resolver = ctx.resolver();
    let filter = ctx.platform_filter();
    let constraint = args.constraint.as_deref();

    match resolver.find_best_candidate(&args.package, constraint, &filter)? {
        Some(package) => {
            print!("{}", describe(&resolver, &package));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            // Fails with the reason the package was rejected, or accepts a
            // virtual or platform-ignored name as given.
            let (name, recommended) =
                resolver.find_best_version_and_name_for_package(&args.package, constraint, &filter, false)?;
            output::info(&format!(
                "{name} has no installable version of its own; it would be required as {name}:{recommended}"
            ));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn describe(resolver: &Resolver, package: &PackageHandle) -> String {
    let real = package.resolve();
    let mut table = Table::new();
    table
        .field("name", package.pretty_name())
        .field("version", package.pretty_version())
        .field("stability", package.stability());
    if let Some(alias) = package.alias_of() {
        table.dim_field("alias of", alias.pretty_version());
    }
    table.field("source", package.repository().unwrap_or("unknown"));
    if let Some(kind) = &real.package_type {
        table.dim_field("type", kind);
    }
    if let Some(description) = &real.description {
        table.dim_field("description", description);
    }
    match &real.abandoned {
        Abandoned::No => {}
        Abandoned::Yes => {
            table.field("abandoned", "yes");
        }
        Abandoned::ReplacedBy(replacement) => {
            table.field("abandoned", format!("use {replacement} instead"));
        }
    }
    table.field("recommended", resolver.find_recommended_require_version(package));

    let mut out = table.to_string();
    out.push('\n');
    let requires = package.requires();
    if !requires.is_empty() {
        out.push_str("\nrequires\n");
        for link in requires {
            out.push_str(&format!("{} {}\n", link.target, link.constraint.pretty()));
        }
    }
    out
}
