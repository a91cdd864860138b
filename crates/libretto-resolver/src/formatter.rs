//! Turning resolved packages back into manifest constraints.
//!
//! [`RequirementFormatter`] derives the constraint written for a newly
//! required package; [`VersionBumper`] raises an existing constraint's lower
//! bound to an installed version.

use crate::constraint::ComposerConstraint;
use crate::package::PackageHandle;
use crate::version::ComposerVersion;
use libretto_core::Stability;
use regex::Regex;
use std::sync::LazyLock;

static SEMVER_FOURTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\D?").expect("valid regex"));

static WILDCARD_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.\d+\.\d+)(\.9999999)-dev$").expect("valid regex"));

static TRAILING_ZEROES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\.(?:0|9999999))+(?:-dev)?$").expect("valid regex"));

static SIMPLE_CARET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^\d+(?:\.\d+)*$").expect("valid regex"));

static LEADING_MAJOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

/// Derives the constraint recorded when a package is required.
#[derive(Debug, Clone, Default)]
pub struct RequirementFormatter {
    php_release: Option<String>,
}

impl RequirementFormatter {
    /// Formatter for the given PHP version, used to spot bundled extensions.
    #[must_use]
    pub fn new(php_version: Option<&ComposerVersion>) -> Self {
        Self {
            php_release: php_version.and_then(release_prefix),
        }
    }

    /// Constraint to write for `package`.
    ///
    /// Stable and pre-release versions become a caret on the first
    /// significant segments (`1.4.2` gives `^1.4`, `0.3.2` gives `^0.3.2`).
    /// Branches with a numeric alias become a caret on that alias with
    /// `@dev`; other branches are written verbatim. Extensions versioned
    /// with PHP itself become `*`.
    ///
    /// ```
    /// use libretto_resolver::formatter::RequirementFormatter;
    /// use libretto_resolver::package::{Package, PackageHandle};
    /// use libretto_resolver::ComposerVersion;
    ///
    /// let package = PackageHandle::real(Package::new(
    ///     "acme/tool",
    ///     ComposerVersion::parse("1.4.2").unwrap(),
    /// ));
    /// assert_eq!(RequirementFormatter::default().recommended_require_version(&package), "^1.4");
    /// ```
    #[must_use]
    pub fn recommended_require_version(&self, package: &PackageHandle) -> String {
        if package.name().starts_with("ext-")
            && let Some(php) = &self.php_release
            && release_prefix(package.version()).as_ref() == Some(php)
        {
            return "*".to_string();
        }

        let version = package.version();
        if !package.is_dev() {
            return transform_version(&version.to_string(), version.pretty(), package.stability());
        }

        if let Some(alias) = package.branch_alias()
            && !alias.is_default_branch_alias()
        {
            let normalized = alias.to_string();
            if WILDCARD_ALIAS.is_match(&normalized) {
                let base = WILDCARD_ALIAS
                    .replace(&normalized, "${1}.0")
                    .replace(".9999999", ".0");
                return transform_version(&base, &base, Stability::Dev);
            }
        }
        version.pretty().to_string()
    }
}

/// First three numeric segments joined with dots.
fn release_prefix(version: &ComposerVersion) -> Option<String> {
    version
        .segments()
        .map(|[major, minor, patch, _]| format!("{major}.{minor}.{patch}"))
}

fn transform_version(normalized: &str, pretty: &str, stability: Stability) -> String {
    let parts: Vec<&str> = normalized.split('.').collect();
    if parts.len() != 4 || !SEMVER_FOURTH.is_match(parts[3]) {
        return pretty.to_string();
    }
    let keep = if parts[0] == "0" { 3 } else { 2 };
    let mut version = parts[..keep].join(".");
    if stability != Stability::Stable {
        version.push('@');
        version.push_str(stability.as_str());
    }
    format!("^{version}")
}

/// Raises constraints to the versions actually installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionBumper;

impl VersionBumper {
    /// New bumper.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rewrite `constraint` so its lower bound is `package`'s version.
    ///
    /// Caret, tilde, `N.*`, `>=` and `*` parts whose major matches are
    /// rewritten; anything else is kept. The original text is returned when
    /// the package is an unaliased branch, the constraint names branches, or
    /// the rewritten constraint accepts exactly the same versions.
    #[must_use]
    pub fn bump_requirement(&self, constraint: &ComposerConstraint, package: &PackageHandle) -> String {
        let pretty = constraint.pretty();
        if pretty.starts_with("dev-") {
            return pretty.to_string();
        }

        let version = if package.version().is_branch() {
            match package.branch_alias() {
                Some(alias) if !alias.is_default_branch_alias() => alias.to_string(),
                _ => return pretty.to_string(),
            }
        } else {
            package.version().to_string()
        };

        if constraint.intervals().branches.has_names() {
            return pretty.to_string();
        }

        let Some(major) = LEADING_MAJOR.captures(&version).and_then(|c| c.get(1)) else {
            return pretty.to_string();
        };
        let without_suffix = TRAILING_ZEROES.replace(&version, "").into_owned();
        let caret = format!("^{without_suffix}");
        if !SIMPLE_CARET.is_match(&caret) {
            return pretty.to_string();
        }

        let Ok(part) = bumpable_part(major.as_str()) else {
            return pretty.to_string();
        };

        let mut modified = pretty.to_string();
        let mut changed = false;
        for (start, token) in tokens(pretty).into_iter().rev() {
            let body = token.split_once('@').map_or(token, |(head, _)| head);
            if body.is_empty() || !part.is_match(body) {
                continue;
            }
            let replacement = replacement_for(body, &without_suffix, &caret);
            modified.replace_range(start..start + body.len(), &replacement);
            changed = true;
        }
        if !changed {
            return pretty.to_string();
        }

        match ComposerConstraint::parse(&modified) {
            Ok(bumped) if bumped.is_equivalent_to(constraint) => pretty.to_string(),
            Ok(_) => modified,
            Err(_) => pretty.to_string(),
        }
    }
}

fn bumpable_part(major: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^(?:\^v?{major}(?:\.\d+)*|~v?{major}(?:\.\d+){{1,3}}|v?{major}(?:\.[*x])+|>=v?\d+(?:\.\d+)*|\*)$"
    ))
}

/// Tokens between `,`, space and `|` separators with their byte offsets.
fn tokens(input: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        if matches!(ch, ',' | ' ' | '|') {
            if idx > start {
                out.push((start, &input[start..idx]));
            }
            start = idx + ch.len_utf8();
        }
    }
    if start < input.len() {
        out.push((start, &input[start..]));
    }
    out
}

fn replacement_for(matched: &str, version: &str, caret: &str) -> String {
    let dots = matched.matches('.').count();
    let suffix = if dots == 2 && version.matches('.').count() == 1 {
        ".0"
    } else {
        ""
    };

    if matched.starts_with('~') && dots != 1 {
        let mut bits: Vec<&str> = version.split('.').collect();
        bits.resize(bits.len().max(dots + 1), "0");
        format!("~{}", bits[..=dots].join("."))
    } else if matched == "*" || matched.starts_with(">=") {
        format!(">={version}{suffix}")
    } else {
        format!("{caret}{suffix}")
    }
}
