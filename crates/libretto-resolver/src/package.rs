//! Package model used by repositories and the selector.
//!
//! - `PackageName`: a validated `vendor/name` identifier
//! - `Link`: a require/provide/replace/conflict edge
//! - `Package`: one concrete version of a package
//! - `AliasPackage`: a package seen under another version (`dev-main` as `1.0.x-dev`)
//! - `PackageHandle`: either of the two, with [`PackageHandle::resolve`] to reach the real package

use crate::constraint::ComposerConstraint;
use crate::platform::is_platform_package;
use crate::version::ComposerVersion;
use libretto_core::Stability;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[_.-]?[a-z0-9]+)*/[a-z0-9](?:(?:[_.]|-{1,2})?[a-z0-9]+)*$")
        .expect("valid regex")
});

/// A validated Composer package name in vendor/name format.
///
/// Names are lowercased on parse and must match Composer's naming rules.
#[derive(Clone)]
pub struct PackageName {
    full: Arc<str>,
    separator_idx: usize,
}

impl PackageName {
    /// Parse a package name.
    ///
    /// Returns `None` if the string is not a valid `vendor/name`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        if !PACKAGE_NAME.is_match(&s) {
            return None;
        }
        let separator_idx = s.find('/')?;
        Some(Self {
            full: Arc::from(s),
            separator_idx,
        })
    }

    /// Get the vendor part.
    #[must_use]
    #[inline]
    pub fn vendor(&self) -> &str {
        &self.full[..self.separator_idx]
    }

    /// Get the name part.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.full[self.separator_idx + 1..]
    }

    /// Get the full name.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Debug for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PackageName").field(&self.full).finish()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.full.cmp(&other.full)
    }
}

impl FromStr for PackageName {
    type Err = PackageNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PackageNameError(s.to_string()))
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid package name: {s}")))
    }
}

/// Error when parsing an invalid package name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid package name: {0}")]
pub struct PackageNameError(pub String);

/// Whether a requirement name is usable: `vendor/name` or a platform package.
#[must_use]
pub fn is_valid_requirement_name(name: &str) -> bool {
    PackageName::parse(name).is_some() || is_platform_package(name)
}

/// Kind of a package link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// `require`
    Require,
    /// `provide`
    Provide,
    /// `replace`
    Replace,
    /// `conflict`
    Conflict,
}

impl LinkKind {
    /// Verb used in messages ("requires php ^8.1").
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Require => "requires",
            Self::Provide => "provides",
            Self::Replace => "replaces",
            Self::Conflict => "conflicts",
        }
    }
}

/// A relationship from one package to a named target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Lowercase target name.
    pub target: Arc<str>,
    /// Constraint on the target.
    pub constraint: ComposerConstraint,
    /// Relationship kind.
    pub kind: LinkKind,
}

impl Link {
    /// Create a link; the target is lowercased.
    #[must_use]
    pub fn new(target: &str, constraint: ComposerConstraint, kind: LinkKind) -> Self {
        Self {
            target: Arc::from(target.to_ascii_lowercase()),
            constraint,
            kind,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.kind.description(),
            self.target,
            self.constraint.pretty()
        )
    }
}

/// Links stored inline for the common small cases.
pub type Links = SmallVec<[Link; 4]>;

/// Abandonment state of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Abandoned {
    /// Maintained.
    #[default]
    No,
    /// Abandoned without a replacement.
    Yes,
    /// Abandoned in favour of another package.
    ReplacedBy(String),
}

/// One concrete version of a package.
#[derive(Debug, Clone)]
pub struct Package {
    /// Lowercase name.
    pub name: Arc<str>,
    /// Name as authored.
    pub pretty_name: Arc<str>,
    /// Version; its pretty string is the authored version.
    pub version: ComposerVersion,
    /// `require` links.
    pub requires: Links,
    /// `provide` links.
    pub provides: Links,
    /// `replace` links.
    pub replaces: Links,
    /// `conflict` links.
    pub conflicts: Links,
    /// Package type (library, project, ...).
    pub package_type: Option<Arc<str>>,
    /// Description.
    pub description: Option<Arc<str>>,
    /// Abandonment state.
    pub abandoned: Abandoned,
    /// Numeric version a dev version is aliased to (`extra.branch-alias`).
    pub branch_alias: Option<ComposerVersion>,
    /// Whether this is the repository's default branch.
    pub default_branch: bool,
    /// Name of the repository that listed this package.
    pub repository: Option<Arc<str>>,
}

impl Package {
    /// Create a package with no links.
    #[must_use]
    pub fn new(pretty_name: &str, version: ComposerVersion) -> Self {
        Self {
            name: Arc::from(pretty_name.to_ascii_lowercase()),
            pretty_name: Arc::from(pretty_name),
            version,
            requires: Links::new(),
            provides: Links::new(),
            replaces: Links::new(),
            conflicts: Links::new(),
            package_type: None,
            description: None,
            abandoned: Abandoned::No,
            branch_alias: None,
            default_branch: false,
            repository: None,
        }
    }

    /// Stability of this version.
    #[must_use]
    #[inline]
    pub fn stability(&self) -> Stability {
        self.version.stability()
    }

    /// Whether this is a development version.
    #[must_use]
    #[inline]
    pub fn is_dev(&self) -> bool {
        self.version.is_dev()
    }

    /// Own name plus every name it provides or replaces.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![&*self.name];
        names.extend(
            self.provides
                .iter()
                .chain(self.replaces.iter())
                .map(|link| &*link.target),
        );
        names
    }

    /// Pretty name and version, e.g. `symfony/console 6.4.1`.
    #[must_use]
    pub fn unique_name(&self) -> String {
        format!("{} {}", self.pretty_name, self.version.pretty())
    }
}

/// A package presented under a different version.
#[derive(Debug, Clone)]
pub struct AliasPackage {
    target: PackageHandle,
    version: ComposerVersion,
}

impl AliasPackage {
    /// Alias `target` as `version`.
    #[must_use]
    pub const fn new(target: PackageHandle, version: ComposerVersion) -> Self {
        Self { target, version }
    }

    /// The aliased package, which may itself be an alias.
    #[must_use]
    pub const fn alias_of(&self) -> &PackageHandle {
        &self.target
    }

    /// The alias version.
    #[must_use]
    pub const fn version(&self) -> &ComposerVersion {
        &self.version
    }
}

/// A real package or an alias of one.
#[derive(Debug, Clone)]
pub enum PackageHandle {
    /// A concrete package.
    Real(Arc<Package>),
    /// An alias wrapping another handle.
    Alias(Arc<AliasPackage>),
}

impl PackageHandle {
    /// Wrap a concrete package.
    #[must_use]
    pub fn real(package: Package) -> Self {
        Self::Real(Arc::new(package))
    }

    /// Alias this handle as `version`.
    #[must_use]
    pub fn alias(&self, version: ComposerVersion) -> Self {
        Self::Alias(Arc::new(AliasPackage::new(self.clone(), version)))
    }

    /// Unwrap every alias layer down to the concrete package.
    #[must_use]
    pub fn resolve(&self) -> &Arc<Package> {
        let mut current = self;
        loop {
            match current {
                Self::Real(package) => return package,
                Self::Alias(alias) => current = &alias.target,
            }
        }
    }

    /// Whether this handle is an alias.
    #[must_use]
    #[inline]
    pub const fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }

    /// The directly aliased handle, if this is an alias.
    #[must_use]
    pub fn alias_of(&self) -> Option<&Self> {
        match self {
            Self::Real(_) => None,
            Self::Alias(alias) => Some(&alias.target),
        }
    }

    /// Lowercase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.resolve().name
    }

    /// Name as authored.
    #[must_use]
    pub fn pretty_name(&self) -> &str {
        &self.resolve().pretty_name
    }

    /// Version of this handle; for an alias, the alias version.
    #[must_use]
    pub fn version(&self) -> &ComposerVersion {
        match self {
            Self::Real(package) => &package.version,
            Self::Alias(alias) => &alias.version,
        }
    }

    /// Version as authored.
    #[must_use]
    pub fn pretty_version(&self) -> &str {
        self.version().pretty()
    }

    /// Stability of this handle's version.
    #[must_use]
    pub fn stability(&self) -> Stability {
        self.version().stability()
    }

    /// Whether this handle's version is a development version.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.version().is_dev()
    }

    /// `require` links of the underlying package.
    #[must_use]
    pub fn requires(&self) -> &[Link] {
        &self.resolve().requires
    }

    /// `provide` links of the underlying package.
    #[must_use]
    pub fn provides(&self) -> &[Link] {
        &self.resolve().provides
    }

    /// `replace` links of the underlying package.
    #[must_use]
    pub fn replaces(&self) -> &[Link] {
        &self.resolve().replaces
    }

    /// Names this handle answers to.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.resolve().names()
    }

    /// Repository that listed the underlying package.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.resolve().repository.as_deref()
    }

    /// Branch alias of the underlying package.
    #[must_use]
    pub fn branch_alias(&self) -> Option<&ComposerVersion> {
        self.resolve().branch_alias.as_ref()
    }

    /// Whether two handles describe the same package version, alias-ness included.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.is_alias() == other.is_alias()
            && self.name() == other.name()
            && self.version() == other.version()
            && self.repository() == other.repository()
    }
}

impl fmt::Display for PackageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pretty_name(), self.pretty_version())?;
        if let Self::Alias(alias) = self {
            write!(f, " (alias of {})", alias.target.pretty_version())?;
        }
        Ok(())
    }
}
