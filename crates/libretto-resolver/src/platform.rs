//! Platform packages and platform requirement filtering.
//!
//! The platform repository exposes the running environment (PHP, its
//! extensions and libraries, the Composer APIs) as packages so requirements
//! on them can be checked like any other link.

use crate::constraint::ComposerConstraint;
use crate::package::{Package, PackageHandle};
use crate::repository::{ArrayRepository, Provider, Repository};
use crate::version::ComposerVersion;
use ahash::AHashSet;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

static PLATFORM_PACKAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:php(?:-64bit|-ipv6|-zts|-debug)?|hhvm|(?:ext|lib)-[a-z0-9](?:[_.-]?[a-z0-9]+)*|composer(?:-(?:plugin|runtime)-api)?)$",
    )
    .expect("valid regex")
});

static LEADING_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+){0,3}").expect("valid regex"));

/// Plugin API version advertised to packages.
pub const PLUGIN_API_VERSION: &str = "2.6.0";

/// Runtime API version advertised to packages.
pub const RUNTIME_API_VERSION: &str = "2.2.2";

/// Whether a name refers to a platform package.
///
/// ```
/// use libretto_resolver::platform::is_platform_package;
///
/// assert!(is_platform_package("php"));
/// assert!(is_platform_package("ext-mbstring"));
/// assert!(!is_platform_package("symfony/console"));
/// ```
#[must_use]
pub fn is_platform_package(name: &str) -> bool {
    PLATFORM_PACKAGE.is_match(name)
}

/// Environment facts collected by platform detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSnapshot {
    /// `PHP_VERSION` of the interpreter, if one was found.
    pub php_version: Option<String>,
    /// Whether the interpreter is a 64-bit build.
    pub php_64bit: bool,
    /// Loaded extensions keyed by lowercase name, with their version if known.
    pub extensions: BTreeMap<String, Option<String>>,
    /// Library versions keyed by name without the `lib-` prefix.
    pub libraries: BTreeMap<String, String>,
}

/// Repository of platform packages.
pub struct PlatformRepository {
    packages: ArrayRepository,
    disabled: AHashSet<String>,
    overridden: AHashSet<String>,
}

impl fmt::Debug for PlatformRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformRepository")
            .field("packages", &self.packages.package_names())
            .field("disabled", &self.disabled)
            .finish()
    }
}

impl Default for PlatformRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformRepository {
    /// Repository name used in messages.
    pub const NAME: &'static str = "platform repo";

    /// Platform with only the Composer API packages.
    #[must_use]
    pub fn new() -> Self {
        let repo = Self {
            packages: ArrayRepository::new(Self::NAME),
            disabled: AHashSet::new(),
            overridden: AHashSet::new(),
        };
        repo.add("composer-plugin-api", PLUGIN_API_VERSION, None);
        repo.add("composer-runtime-api", RUNTIME_API_VERSION, None);
        repo
    }

    /// Platform built from detection results and `config.platform` overrides.
    ///
    /// An override of `None` disables the package; overridden names are not
    /// taken from detection.
    pub fn build<I, S>(snapshot: &PlatformSnapshot, overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<String>)>,
        S: AsRef<str>,
    {
        let mut repo = Self::new();
        for (name, value) in overrides {
            let name = name.as_ref().to_ascii_lowercase();
            match value {
                Some(version) => {
                    repo.add(&name, &version, Some("Package overridden via config.platform"));
                    repo.overridden.insert(name);
                }
                None => {
                    debug!(package = %name, "platform package disabled by config");
                    repo.disabled.insert(name);
                }
            }
        }

        if let Some(php) = &snapshot.php_version {
            repo.add_detected("php", php);
            if snapshot.php_64bit {
                repo.add_detected("php-64bit", php);
            }
        }
        for (extension, version) in &snapshot.extensions {
            let name = format!("ext-{}", extension.to_ascii_lowercase().replace(' ', "-"));
            repo.add_detected(&name, version.as_deref().unwrap_or("0"));
        }
        for (library, version) in &snapshot.libraries {
            repo.add_detected(&format!("lib-{}", library.to_ascii_lowercase()), version);
        }
        repo
    }

    fn add_detected(&self, name: &str, version: &str) {
        if self.disabled.contains(name) || self.overridden.contains(name) {
            trace!(package = %name, "detected platform package skipped");
            return;
        }
        self.add(name, version, None);
    }

    /// Add a platform package.
    ///
    /// Versions that do not normalize are reduced to their leading numeric
    /// part, so `8.3.4-1ubuntu2` becomes `8.3.4`.
    pub fn add(&self, name: &str, version: &str, description: Option<&str>) {
        let parsed = ComposerVersion::parse(version).or_else(|err| {
            LEADING_VERSION
                .find(version)
                .map_or(Err(err), |m| ComposerVersion::parse(m.as_str()))
        });
        let Ok(parsed) = parsed else {
            debug!(package = %name, version = %version, "platform package has an unparsable version");
            return;
        };
        let mut package = Package::new(name, parsed);
        package.package_type = Some(Arc::from("platform"));
        if let Some(description) = description {
            package.description = Some(Arc::from(description));
        }
        self.packages.add_package(package);
    }

    /// The single version of a platform package, if present.
    #[must_use]
    pub fn find_package(&self, name: &str) -> Option<PackageHandle> {
        self.packages.find_packages(name, None).into_iter().next()
    }

    /// Whether `config.platform` disabled this package.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(&name.to_ascii_lowercase())
    }

    /// Every platform package.
    #[must_use]
    pub fn packages(&self) -> Vec<PackageHandle> {
        self.packages.all_packages()
    }

    /// Versions each platform name is available at, including provided names.
    #[must_use]
    pub fn provided_versions(&self) -> BTreeMap<String, Vec<ComposerVersion>> {
        let mut versions: BTreeMap<String, Vec<ComposerVersion>> = BTreeMap::new();
        for package in self.packages() {
            for name in package.names() {
                versions
                    .entry(name.to_string())
                    .or_default()
                    .push(package.version().clone());
            }
        }
        versions
    }
}

impl Repository for PlatformRepository {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn find_packages(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
    ) -> Vec<PackageHandle> {
        self.packages.find_packages(name, constraint)
    }

    fn has_package(&self, name: &str) -> bool {
        self.packages.has_package(name)
    }

    fn find_providers(&self, name: &str) -> Vec<Provider> {
        self.packages.find_providers(name)
    }

    fn package_names(&self) -> Vec<String> {
        self.packages.package_names()
    }
}

/// Which platform requirements to skip when selecting versions.
#[derive(Clone, Default)]
pub enum PlatformRequirementFilter {
    /// Check every platform requirement.
    #[default]
    IgnoreNothing,
    /// Skip every platform requirement.
    IgnoreAll,
    /// Skip the listed requirements; `name+` entries only drop upper bounds.
    IgnoreList {
        /// Fully ignored names.
        ignore: Vec<Regex>,
        /// Names whose upper bound is ignored.
        upper_bound: Vec<Regex>,
    },
}

impl fmt::Debug for PlatformRequirementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoreNothing => f.write_str("IgnoreNothing"),
            Self::IgnoreAll => f.write_str("IgnoreAll"),
            Self::IgnoreList {
                ignore,
                upper_bound,
            } => f
                .debug_struct("IgnoreList")
                .field("ignore", &ignore.iter().map(Regex::as_str).collect::<Vec<_>>())
                .field(
                    "upper_bound",
                    &upper_bound.iter().map(Regex::as_str).collect::<Vec<_>>(),
                )
                .finish(),
        }
    }
}

impl PlatformRequirementFilter {
    /// Build the filter from `--ignore-platform-reqs` and `--ignore-platform-req`.
    #[must_use]
    pub fn from_options<S: AsRef<str>>(ignore_all: bool, names: &[S]) -> Self {
        if ignore_all {
            Self::IgnoreAll
        } else if names.is_empty() {
            Self::IgnoreNothing
        } else {
            Self::ignore_list(names)
        }
    }

    /// Filter ignoring the given names; `*` matches any run of characters.
    #[must_use]
    pub fn ignore_list<S: AsRef<str>>(names: &[S]) -> Self {
        let mut ignore = Vec::new();
        let mut upper_bound = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if let Some(stripped) = name.strip_suffix('+') {
                if let Some(pattern) = name_pattern(stripped) {
                    upper_bound.push(pattern);
                }
            } else if let Some(pattern) = name_pattern(name) {
                ignore.push(pattern);
            }
        }
        Self::IgnoreList {
            ignore,
            upper_bound,
        }
    }

    /// Whether requirements on `name` are skipped entirely.
    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        if !is_platform_package(name) {
            return false;
        }
        match self {
            Self::IgnoreNothing => false,
            Self::IgnoreAll => true,
            Self::IgnoreList { ignore, .. } => ignore.iter().any(|re| re.is_match(name)),
        }
    }

    /// Whether only the upper bound of requirements on `name` is skipped.
    #[must_use]
    pub fn is_upper_bound_ignored(&self, name: &str) -> bool {
        match self {
            Self::IgnoreNothing => false,
            Self::IgnoreAll => self.is_ignored(name),
            Self::IgnoreList { upper_bound, .. } => {
                self.is_ignored(name)
                    || (is_platform_package(name) && upper_bound.iter().any(|re| re.is_match(name)))
            }
        }
    }

    /// The part of a requirement on `name` that still has to hold.
    #[must_use]
    pub fn filter_constraint(&self, name: &str, constraint: &ComposerConstraint) -> ComposerConstraint {
        if self.is_ignored(name) {
            ComposerConstraint::any()
        } else if self.is_upper_bound_ignored(name) {
            constraint.without_upper_bound()
        } else {
            constraint.clone()
        }
    }

    /// Whether this is [`Self::IgnoreAll`].
    #[must_use]
    pub const fn is_ignore_all(&self) -> bool {
        matches!(self, Self::IgnoreAll)
    }
}

fn name_pattern(name: &str) -> Option<Regex> {
    let body = regex::escape(name).replace(r"\*", ".*");
    Regex::new(&format!("(?i)^(?:{body})$")).ok()
}
