//! Loading package definitions from repository JSON.

use crate::constraint::{ComposerConstraint, ConstraintParseError};
use crate::package::{Abandoned, Link, LinkKind, Links, Package};
use crate::version::{ComposerVersion, DEFAULT_BRANCH_ALIAS, VersionParseError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use tracing::trace;

static NUMERIC_ALIAS_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:\d+\.)*\d+)(?:\.x)?-dev$").expect("valid regex")
});

/// A package version as listed in `packages.json` or an inline `package` repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageDefinition {
    /// Package name; may be omitted when the listing is keyed by name.
    #[serde(default)]
    pub name: Option<String>,
    /// Version as authored.
    pub version: String,
    /// Dependencies.
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    /// Virtual packages provided.
    #[serde(default)]
    pub provide: BTreeMap<String, String>,
    /// Packages replaced.
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
    /// Conflicting packages.
    #[serde(default)]
    pub conflict: BTreeMap<String, String>,
    /// Package type.
    #[serde(rename = "type", default)]
    pub package_type: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Abandoned flag or replacement name.
    #[serde(default)]
    pub abandoned: Option<AbandonedField>,
    /// Extra metadata; only `branch-alias` is read.
    #[serde(default)]
    pub extra: Extra,
    /// Whether this is the default branch.
    #[serde(default)]
    pub default_branch: bool,
}

/// Contents of an inline `package` repository: one definition or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlinePackages {
    /// A single version.
    One(Box<PackageDefinition>),
    /// Several versions.
    Many(Vec<PackageDefinition>),
}

impl InlinePackages {
    /// Definitions in declaration order.
    #[must_use]
    pub fn into_vec(self) -> Vec<PackageDefinition> {
        match self {
            Self::One(one) => vec![*one],
            Self::Many(many) => many,
        }
    }
}

/// `extra` section of a package definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extra {
    /// Branch aliases, e.g. `{"dev-main": "2.x-dev"}`.
    #[serde(rename = "branch-alias", default)]
    pub branch_alias: BTreeMap<String, String>,
}

/// Abandoned field (can be bool or string).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AbandonedField {
    /// Simply abandoned.
    Bool(bool),
    /// Abandoned with replacement suggestion.
    Replacement(String),
}

/// Error when turning a definition into a package.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Neither the definition nor its listing gave a name.
    #[error("package definition without a name")]
    MissingName,

    /// The version could not be parsed.
    #[error("package {package} has an invalid version: {source}")]
    InvalidVersion {
        /// Package name.
        package: String,
        /// Underlying error.
        #[source]
        source: VersionParseError,
    },

    /// A link constraint could not be parsed.
    #[error("package {package} has an invalid constraint for {target}: {source}")]
    InvalidLink {
        /// Package name.
        package: String,
        /// Link target.
        target: String,
        /// Underlying error.
        #[source]
        source: ConstraintParseError,
    },
}

/// Build a package from its definition.
///
/// `fallback_name` is used when the definition itself carries no name.
pub fn load_package(
    definition: &PackageDefinition,
    fallback_name: Option<&str>,
) -> Result<Package, LoadError> {
    let pretty_name = definition
        .name
        .as_deref()
        .or(fallback_name)
        .ok_or(LoadError::MissingName)?;
    let version =
        ComposerVersion::parse(&definition.version).map_err(|source| LoadError::InvalidVersion {
            package: pretty_name.to_string(),
            source,
        })?;

    let mut package = Package::new(pretty_name, version);
    package.requires = parse_links(pretty_name, &definition.version, &definition.require, LinkKind::Require)?;
    package.provides = parse_links(pretty_name, &definition.version, &definition.provide, LinkKind::Provide)?;
    package.replaces = parse_links(pretty_name, &definition.version, &definition.replace, LinkKind::Replace)?;
    package.conflicts = parse_links(pretty_name, &definition.version, &definition.conflict, LinkKind::Conflict)?;
    package.package_type = definition.package_type.as_deref().map(Arc::from);
    package.description = definition.description.as_deref().map(Arc::from);
    package.abandoned = match &definition.abandoned {
        None | Some(AbandonedField::Bool(false)) => Abandoned::No,
        Some(AbandonedField::Bool(true)) => Abandoned::Yes,
        Some(AbandonedField::Replacement(name)) if name.is_empty() => Abandoned::Yes,
        Some(AbandonedField::Replacement(name)) => Abandoned::ReplacedBy(name.clone()),
    };
    package.default_branch = definition.default_branch;
    package.branch_alias = branch_alias(definition);

    trace!(package = %pretty_name, version = %definition.version, "loaded package definition");
    Ok(package)
}

fn parse_links(
    source: &str,
    version: &str,
    links: &BTreeMap<String, String>,
    kind: LinkKind,
) -> Result<Links, LoadError> {
    links
        .iter()
        .map(|(target, constraint)| {
            // self.version pins the link to the declaring package's own version
            let text = if constraint.trim() == "self.version" {
                version
            } else {
                constraint.as_str()
            };
            let parsed = ComposerConstraint::parse(text).map_err(|err| LoadError::InvalidLink {
                package: source.to_string(),
                target: target.clone(),
                source: err,
            })?;
            Ok(Link::new(target, parsed, kind))
        })
        .collect()
}

fn numeric_alias_prefix(branch: &str) -> Option<String> {
    NUMERIC_ALIAS_PREFIX
        .captures(branch)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("{}.", m.as_str()))
}

/// Numeric version a dev version is aliased to.
///
/// Explicit `extra.branch-alias` entries are validated the way Composer does:
/// the target must be a numeric `-dev` branch, the source must be this very
/// version, and numeric sources may only alias to their own sub-versions.
/// Default branches without a numeric name get [`DEFAULT_BRANCH_ALIAS`].
#[must_use]
pub fn branch_alias(definition: &PackageDefinition) -> Option<ComposerVersion> {
    let pretty = definition.version.as_str();
    if !pretty.starts_with("dev-") && !pretty.ends_with("-dev") {
        return None;
    }

    for (source, target) in &definition.extra.branch_alias {
        if !target.ends_with("-dev") || !source.eq_ignore_ascii_case(pretty) {
            continue;
        }
        let Ok(alias) = ComposerVersion::parse(target) else {
            continue;
        };
        if alias.is_branch() || !alias.has_dev_suffix() {
            continue;
        }
        if let (Some(source_prefix), Some(target_prefix)) =
            (numeric_alias_prefix(source), numeric_alias_prefix(target))
            && !target_prefix.starts_with(&source_prefix)
        {
            continue;
        }
        return Some(alias);
    }

    if definition.default_branch
        && numeric_alias_prefix(pretty.trim_start_matches('v')).is_none()
    {
        return ComposerVersion::parse(DEFAULT_BRANCH_ALIAS).ok();
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(json: &str) -> PackageDefinition {
        sonic_rs::from_str(json).unwrap()
    }

    #[test]
    fn loads_links_and_metadata() {
        let def = definition(
            r#"{
                "name": "Monolog/Monolog",
                "version": "3.5.0",
                "type": "library",
                "description": "Sends your logs to files, sockets, inboxes, databases and various web services",
                "require": {"php": ">=8.1", "psr/log": "^2.0 || ^3.0"},
                "provide": {"psr/log-implementation": "3.0.0"},
                "abandoned": "monolog/monolog-ng"
            }"#,
        );
        let package = load_package(&def, None).unwrap();

        assert_eq!(&*package.name, "monolog/monolog");
        assert_eq!(&*package.pretty_name, "Monolog/Monolog");
        assert_eq!(package.version.pretty(), "3.5.0");
        assert_eq!(package.requires.len(), 2);
        assert_eq!(&*package.requires[0].target, "php");
        assert_eq!(package.requires[0].kind, LinkKind::Require);
        assert_eq!(&*package.provides[0].target, "psr/log-implementation");
        assert_eq!(package.package_type.as_deref(), Some("library"));
        assert_eq!(package.abandoned, Abandoned::ReplacedBy("monolog/monolog-ng".into()));
        assert_eq!(package.branch_alias, None);
    }

    #[test]
    fn self_version_links_pin_own_version() {
        let def = definition(
            r#"{"name": "symfony/symfony", "version": "v6.4.2",
                "replace": {"symfony/console": "self.version"}}"#,
        );
        let package = load_package(&def, None).unwrap();
        let link = &package.replaces[0];
        assert!(link.constraint.matches(&ComposerVersion::parse("6.4.2").unwrap()));
        assert!(!link.constraint.matches(&ComposerVersion::parse("6.4.3").unwrap()));
    }

    #[test]
    fn keyed_listing_supplies_name() {
        let def = definition(r#"{"version": "1.0.0"}"#);
        assert!(matches!(load_package(&def, None), Err(LoadError::MissingName)));
        let package = load_package(&def, Some("acme/tool")).unwrap();
        assert_eq!(&*package.name, "acme/tool");
    }

    #[test]
    fn invalid_definitions_are_errors() {
        let bad_version = definition(r#"{"name": "a/b", "version": "not a version"}"#);
        assert!(matches!(
            load_package(&bad_version, None),
            Err(LoadError::InvalidVersion { .. })
        ));

        let bad_link = definition(r#"{"name": "a/b", "version": "1.0.0", "require": {"c/d": ">="}}"#);
        let err = load_package(&bad_link, None).unwrap_err();
        assert!(err.to_string().contains("c/d"));
    }

    mod branch_aliases {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn explicit_alias() {
            let def = definition(
                r#"{"name": "a/b", "version": "dev-main",
                    "extra": {"branch-alias": {"dev-main": "2.1.x-dev"}}}"#,
            );
            let alias = branch_alias(&def).unwrap();
            assert_eq!(alias.to_string(), "2.1.9999999.9999999-dev");
        }

        #[test]
        fn alias_for_other_branch_is_ignored() {
            let def = definition(
                r#"{"name": "a/b", "version": "dev-feature",
                    "extra": {"branch-alias": {"dev-main": "2.1.x-dev"}}}"#,
            );
            assert_eq!(branch_alias(&def), None);
        }

        #[test]
        fn non_numeric_target_is_ignored() {
            let def = definition(
                r#"{"name": "a/b", "version": "dev-main",
                    "extra": {"branch-alias": {"dev-main": "feature-dev"}}}"#,
            );
            assert_eq!(branch_alias(&def), None);
        }

        #[test]
        fn numeric_source_must_prefix_target() {
            let def = definition(
                r#"{"name": "a/b", "version": "2.x-dev",
                    "extra": {"branch-alias": {"2.x-dev": "1.0.x-dev"}}}"#,
            );
            assert_eq!(branch_alias(&def), None);

            let def = definition(
                r#"{"name": "a/b", "version": "2.x-dev",
                    "extra": {"branch-alias": {"2.x-dev": "2.3.x-dev"}}}"#,
            );
            assert_eq!(branch_alias(&def).unwrap().to_string(), "2.3.9999999.9999999-dev");
        }

        #[test]
        fn default_branch_gets_default_alias() {
            let def = definition(r#"{"name": "a/b", "version": "dev-main", "default-branch": true}"#);
            assert!(branch_alias(&def).unwrap().is_default_branch_alias());

            let numeric = definition(r#"{"name": "a/b", "version": "1.x-dev", "default-branch": true}"#);
            assert_eq!(branch_alias(&numeric), None);
        }

        #[test]
        fn stable_versions_have_no_alias() {
            let def = definition(
                r#"{"name": "a/b", "version": "1.0.0",
                    "extra": {"branch-alias": {"1.0.0": "1.0.x-dev"}}}"#,
            );
            assert_eq!(branch_alias(&def), None);
        }
    }
}
