//! Configuration types for Composer compatibility.

use crate::loader::ConfigSource;
use libretto_core::Stability;
use libretto_resolver::InlinePackages;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Preferred installation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredInstall {
    /// Install from source (VCS).
    Source,
    /// Install from distribution archive.
    #[default]
    Dist,
    /// Auto-select based on stability.
    Auto,
}

/// Preferred install configuration (global or per-package).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferredInstallConfig {
    /// Global setting.
    Global(PreferredInstall),
    /// Per-package settings.
    PerPackage(BTreeMap<String, PreferredInstall>),
}

impl Default for PreferredInstallConfig {
    fn default() -> Self {
        Self::Global(PreferredInstall::default())
    }
}

/// Platform value (version string or false to disable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlatformValue {
    /// Platform version.
    Version(String),
    /// `false` removes the package from the platform.
    Disabled(bool),
}

impl PlatformValue {
    /// The override this value stands for: a version, a removal (`None`),
    /// or nothing at all for `true`.
    #[must_use]
    pub fn as_override(&self) -> Option<Option<String>> {
        match self {
            Self::Version(version) => Some(Some(version.clone())),
            Self::Disabled(false) => Some(None),
            Self::Disabled(true) => None,
        }
    }
}

/// The `config` section of composer.json or the global config.json.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ComposerConfig {
    /// Preferred installation method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_install: Option<PreferredInstallConfig>,

    /// Platform package overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<BTreeMap<String, PlatformValue>>,

    /// Sort packages in composer.json.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_packages: Option<bool>,
}

/// Global `config.json`, which nests its settings under `config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalConfigFile {
    /// Settings.
    pub config: Option<ComposerConfig>,
    /// Repositories added to every project.
    pub repositories: Option<Repositories>,
}

/// Repository type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Composer repository (`packages.json`).
    Composer,
    /// VCS repository (Git, SVN, etc.).
    Vcs,
    /// Git repository.
    Git,
    /// GitHub repository.
    Github,
    /// GitLab repository.
    Gitlab,
    /// Local path repository.
    Path,
    /// Artifact (ZIP files) repository.
    Artifact,
    /// Inline package definition.
    Package,
}

impl RepositoryType {
    /// Name as written in composer.json.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::Vcs => "vcs",
            Self::Git => "git",
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Path => "path",
            Self::Artifact => "artifact",
            Self::Package => "package",
        }
    }
}

/// Repository configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryConfig {
    /// Disable a repository (e.g., packagist.org).
    Disabled(bool),
    /// Full repository configuration.
    Config(Box<RepositoryDefinition>),
    /// `{"packagist.org": false}` inside a repository list.
    Toggle(BTreeMap<String, bool>),
}

/// Repository definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDefinition {
    /// Repository type.
    #[serde(rename = "type")]
    pub repo_type: RepositoryType,
    /// Repository URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Inline package definition, one object or a list (for type: package).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<InlinePackages>,
    /// Whether this repository's listing of a name hides lower-priority ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<bool>,
}

impl RepositoryDefinition {
    /// Canonical unless explicitly disabled.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.canonical.unwrap_or(true)
    }
}

/// Repositories configuration (array or object).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repositories {
    /// Array of repositories.
    Array(Vec<RepositoryConfig>),
    /// Object with named repositories.
    Object(BTreeMap<String, RepositoryConfig>),
}

impl Default for Repositories {
    fn default() -> Self {
        Self::Array(Vec::new())
    }
}

impl Repositories {
    /// Enabled definitions in declaration order.
    ///
    /// Object keys are sorted by serde, which matches the order Composer
    /// reads named repositories in.
    #[must_use]
    pub fn definitions(&self) -> Vec<RepositoryDefinition> {
        let entries: Vec<&RepositoryConfig> = match self {
            Self::Array(list) => list.iter().collect(),
            Self::Object(map) => map.values().collect(),
        };
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                RepositoryConfig::Config(definition) => Some((**definition).clone()),
                RepositoryConfig::Disabled(_) | RepositoryConfig::Toggle(_) => None,
            })
            .collect()
    }

    /// Whether the default Packagist repository is switched off, either as
    /// `{"packagist.org": false}` in a list or `"packagist.org": false` as a
    /// named entry.
    #[must_use]
    pub fn disables_packagist(&self) -> bool {
        let is_packagist = |key: &str| key == "packagist.org" || key == "packagist";
        match self {
            Self::Array(list) => list.iter().any(|entry| match entry {
                RepositoryConfig::Toggle(map) => map.iter().any(|(key, enabled)| is_packagist(key) && !enabled),
                _ => false,
            }),
            Self::Object(map) => map
                .iter()
                .any(|(key, entry)| is_packagist(key) && matches!(entry, RepositoryConfig::Disabled(false))),
        }
    }
}

/// The parts of composer.json that configure resolution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ComposerManifest {
    /// Package name.
    pub name: Option<String>,
    /// Required dependencies.
    pub require: BTreeMap<String, String>,
    /// Development dependencies.
    pub require_dev: BTreeMap<String, String>,
    /// Minimum stability, as written.
    pub minimum_stability: Option<String>,
    /// Prefer stable versions.
    pub prefer_stable: Option<bool>,
    /// Repositories.
    pub repositories: Option<Repositories>,
    /// Configuration.
    pub config: Option<ComposerConfig>,
}

/// Resolved configuration with all sources merged.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Project root directory.
    pub project_dir: PathBuf,
    /// Path of the project manifest.
    pub manifest_path: PathBuf,
    /// Home directory (`COMPOSER_HOME`).
    pub home_dir: PathBuf,
    /// Stability floor for resolution.
    pub minimum_stability: Stability,
    /// Prefer stable versions when less stable ones are allowed.
    pub prefer_stable: bool,
    /// Preferred installation method.
    pub preferred_install: PreferredInstallConfig,
    /// Keep require sections sorted when writing.
    pub sort_packages: bool,
    /// Platform overrides.
    pub platform: BTreeMap<String, PlatformValue>,
    /// Repositories in priority order, project first.
    pub repositories: Vec<RepositoryDefinition>,
    /// Append Packagist after the configured repositories.
    pub packagist: bool,
    /// Never prompt.
    pub no_interaction: bool,
    /// Ignore every platform requirement.
    pub ignore_platform_reqs: bool,
    /// Platform requirements to ignore by name or pattern.
    pub ignore_platform_req: Vec<String>,
    /// Layer each setting was last taken from.
    pub origins: BTreeMap<&'static str, ConfigSource>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            manifest_path: PathBuf::from("composer.json"),
            home_dir: PathBuf::from(".composer"),
            minimum_stability: Stability::Stable,
            prefer_stable: false,
            preferred_install: PreferredInstallConfig::default(),
            sort_packages: false,
            platform: BTreeMap::new(),
            repositories: Vec::new(),
            packagist: true,
            no_interaction: false,
            ignore_platform_reqs: false,
            ignore_platform_req: Vec::new(),
            origins: BTreeMap::new(),
        }
    }
}

impl ResolvedConfig {
    /// Where `key` was set; [`ConfigSource::Defaults`] if nowhere.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.origins.get(key).copied().unwrap_or(ConfigSource::Defaults)
    }

    /// Platform overrides in the shape the platform repository takes:
    /// a version, or `None` to remove the package.
    #[must_use]
    pub fn platform_overrides(&self) -> Vec<(String, Option<String>)> {
        self.platform
            .iter()
            .filter_map(|(name, value)| value.as_override().map(|v| (name.clone(), v)))
            .collect()
    }
}
