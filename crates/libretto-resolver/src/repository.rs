//! Package repositories.
//!
//! Repositories are read-only listings of package versions. Lookups never
//! fail: a repository that cannot answer returns nothing.

use crate::constraint::ComposerConstraint;
use crate::loader::{PackageDefinition, load_package};
use crate::package::{Link, Package, PackageHandle};
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A package that provides or replaces a requested name.
#[derive(Debug, Clone)]
pub struct Provider {
    /// The providing package.
    pub package: PackageHandle,
    /// The provide/replace link naming the requested package.
    pub link: Link,
}

/// Source of package metadata.
pub trait Repository: Send + Sync + fmt::Debug {
    /// Name used in messages.
    fn name(&self) -> &str;

    /// Whether this repository's listing of a name blocks lower-priority repositories.
    fn is_canonical(&self) -> bool {
        true
    }

    /// Every version of `name` matching `constraint`, aliases included.
    fn find_packages(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
    ) -> Vec<PackageHandle>;

    /// Whether any version of `name` is listed at all.
    fn has_package(&self, name: &str) -> bool {
        !self.find_packages(name, None).is_empty()
    }

    /// Packages that provide or replace `name`.
    fn find_providers(&self, name: &str) -> Vec<Provider>;

    /// Every package name listed.
    fn package_names(&self) -> Vec<String>;
}

/// In-memory repository.
///
/// Backs inline `package` repositories and the platform repository, and is
/// the storage behind [`ComposerRepository`].
pub struct ArrayRepository {
    name: Arc<str>,
    canonical: bool,
    packages: RwLock<AHashMap<Arc<str>, Vec<PackageHandle>>>,
}

impl fmt::Debug for ArrayRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRepository")
            .field("name", &self.name)
            .field("canonical", &self.canonical)
            .field("packages", &self.len())
            .finish_non_exhaustive()
    }
}

impl ArrayRepository {
    /// Create a new empty canonical repository.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            canonical: true,
            packages: RwLock::new(AHashMap::new()),
        }
    }

    /// Set whether this repository is canonical.
    #[must_use]
    pub const fn canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    /// Build a repository from package definitions, skipping invalid ones.
    #[must_use]
    pub fn from_definitions(name: impl Into<Arc<str>>, definitions: &[PackageDefinition]) -> Self {
        let repo = Self::new(name);
        for definition in definitions {
            repo.add_definition(definition, None);
        }
        repo
    }

    pub(crate) fn add_definition(&self, definition: &PackageDefinition, fallback_name: Option<&str>) {
        match load_package(definition, fallback_name) {
            Ok(package) => self.add_package(package),
            Err(err) => warn!(repository = %self.name, error = %err, "skipping invalid package"),
        }
    }

    /// Add a package together with its branch alias, if any.
    pub fn add_package(&self, mut package: Package) {
        package.repository = Some(self.name.clone());
        let alias = package.branch_alias.clone();
        let handle = PackageHandle::real(package);
        if let Some(version) = alias {
            let aliased = handle.alias(version);
            self.add_handle(handle);
            self.add_handle(aliased);
        } else {
            self.add_handle(handle);
        }
    }

    fn add_handle(&self, handle: PackageHandle) {
        let key: Arc<str> = Arc::from(handle.name());
        let mut packages = self.packages.write();
        let versions = packages.entry(key).or_default();
        // Only add if this version doesn't already exist
        if !versions.iter().any(|existing| existing.same_as(&handle)) {
            versions.push(handle);
        }
    }

    /// Number of package versions, aliases included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.read().values().map(Vec::len).sum()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }

    /// Every package handle, in name order.
    #[must_use]
    pub fn all_packages(&self) -> Vec<PackageHandle> {
        let packages = self.packages.read();
        let mut names: Vec<&Arc<str>> = packages.keys().collect();
        names.sort();
        names
            .into_iter()
            .flat_map(|name| packages[name].iter().cloned())
            .collect()
    }
}

impl Repository for ArrayRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_canonical(&self) -> bool {
        self.canonical
    }

    fn find_packages(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
    ) -> Vec<PackageHandle> {
        let key = name.to_ascii_lowercase();
        let packages = self.packages.read();
        let Some(versions) = packages.get(key.as_str()) else {
            return Vec::new();
        };
        versions
            .iter()
            .filter(|handle| constraint.is_none_or(|c| c.matches(handle.version())))
            .cloned()
            .collect()
    }

    fn has_package(&self, name: &str) -> bool {
        self.packages
            .read()
            .contains_key(name.to_ascii_lowercase().as_str())
    }

    fn find_providers(&self, name: &str) -> Vec<Provider> {
        let key = name.to_ascii_lowercase();
        let packages = self.packages.read();
        packages
            .values()
            .flatten()
            .filter(|handle| !handle.is_alias())
            .flat_map(|handle| {
                handle
                    .provides()
                    .iter()
                    .chain(handle.replaces())
                    .filter(|link| *link.target == *key)
                    .map(|link| Provider {
                        package: handle.clone(),
                        link: link.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn package_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .packages
            .read()
            .values()
            .filter_map(|versions| versions.first())
            .map(|handle| handle.pretty_name().to_string())
            .collect();
        names.sort();
        names
    }
}

/// `packages.json` in either the v1 keyed form or the v2 list form.
///
/// Lazy v2 repositories list no packages inline (`"packages": []`) and
/// point at per-package files through `metadata-url` instead.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct PackagesJson {
    #[serde(default, deserialize_with = "inline_packages")]
    pub(crate) packages: BTreeMap<String, VersionListing>,
    #[serde(default)]
    pub(crate) metadata_url: Option<String>,
    #[serde(default)]
    pub(crate) available_packages: Option<Vec<String>>,
}

impl PackagesJson {
    /// Add every inline version to `packages`.
    pub(crate) fn add_to(&self, packages: &ArrayRepository) {
        for (name, versions) in &self.packages {
            match versions {
                VersionListing::Keyed(map) => {
                    for definition in map.values() {
                        packages.add_definition(definition, Some(name));
                    }
                }
                VersionListing::Listed(list) => {
                    for definition in list {
                        packages.add_definition(definition, Some(name));
                    }
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum VersionListing {
    Keyed(BTreeMap<String, PackageDefinition>),
    Listed(Vec<PackageDefinition>),
}

fn inline_packages<'de, D>(deserializer: D) -> Result<BTreeMap<String, VersionListing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Inline {
        Map(BTreeMap<String, VersionListing>),
        Empty(Vec<IgnoredAny>),
    }
    Ok(match Inline::deserialize(deserializer)? {
        Inline::Map(map) => map,
        Inline::Empty(_) => BTreeMap::new(),
    })
}

/// A Composer repository served as a static `packages.json`.
///
/// The URL may be a filesystem path, a directory containing
/// `packages.json`, or a `file://` URL. Repositories served over HTTP are
/// handled by [`HttpComposerRepository`](crate::http::HttpComposerRepository).
pub struct ComposerRepository {
    url: String,
    packages: ArrayRepository,
}

impl fmt::Debug for ComposerRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposerRepository")
            .field("url", &self.url)
            .field("packages", &self.packages)
            .finish()
    }
}

impl ComposerRepository {
    /// Load the repository, failing if it cannot be read.
    pub fn load(url: &str, canonical: bool) -> libretto_core::Result<Self> {
        let path = Self::resolve_path(url)?;
        let data = std::fs::read(&path).map_err(|err| {
            libretto_core::Error::repository(url, format!("cannot read {}: {err}", path.display()))
        })?;
        let listing: PackagesJson = libretto_core::from_json_slice(&data)
            .map_err(|err| libretto_core::Error::repository(url, err.to_string()))?;

        let packages = ArrayRepository::new(url).canonical(canonical);
        listing.add_to(&packages);
        debug!(repository = %url, packages = packages.len(), "loaded composer repository");

        Ok(Self {
            url: url.to_string(),
            packages,
        })
    }

    /// Load the repository, treating an unreadable one as empty.
    #[must_use]
    pub fn open(url: &str, canonical: bool) -> Self {
        Self::load(url, canonical).unwrap_or_else(|err| {
            warn!(repository = %url, error = %err, "repository could not be loaded, continuing without it");
            Self {
                url: url.to_string(),
                packages: ArrayRepository::new(url).canonical(canonical),
            }
        })
    }

    fn resolve_path(url: &str) -> libretto_core::Result<PathBuf> {
        let path = if url.contains("://") {
            let parsed = url::Url::parse(url)
                .map_err(|err| libretto_core::Error::repository(url, err.to_string()))?;
            if parsed.scheme() != "file" {
                return Err(libretto_core::Error::repository(
                    url,
                    format!("unsupported scheme '{}', only local repositories can be read", parsed.scheme()),
                ));
            }
            parsed
                .to_file_path()
                .map_err(|()| libretto_core::Error::repository(url, "not a valid file URL"))?
        } else {
            PathBuf::from(url)
        };

        if path.is_dir() {
            Ok(path.join("packages.json"))
        } else {
            Ok(path)
        }
    }

    /// Where the listing was read from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path form of a repository URL relative to a base directory.
    #[must_use]
    pub fn url_relative_to(url: &str, base: &Path) -> String {
        if url.contains("://") || Path::new(url).is_absolute() {
            url.to_string()
        } else {
            base.join(url).to_string_lossy().into_owned()
        }
    }
}

impl Repository for ComposerRepository {
    fn name(&self) -> &str {
        &self.url
    }

    fn is_canonical(&self) -> bool {
        self.packages.is_canonical()
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
