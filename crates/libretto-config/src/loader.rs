//! Configuration loader with hierarchical merging.

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};
use crate::types::{ComposerConfig, ComposerManifest, GlobalConfigFile, ResolvedConfig};
use libretto_core::Stability;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration source in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in defaults.
    Defaults = 0,
    /// User global configuration.
    Global = 1,
    /// Project-local configuration.
    Project = 2,
    /// Environment variables.
    Environment = 3,
    /// CLI arguments.
    Cli = 4,
}

impl ConfigSource {
    /// Get description for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::Global => "global configuration",
            Self::Project => "project configuration",
            Self::Environment => "environment variables",
            Self::Cli => "command-line arguments",
        }
    }
}

/// Configuration loader with hierarchy support.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Project directory.
    project_dir: PathBuf,
    /// Global configuration directory.
    global_dir: PathBuf,
    /// Environment config.
    env_config: EnvConfig,
}

impl ConfigLoader {
    /// Create a loader reading the process environment.
    pub fn new(project_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_env(project_dir, EnvConfig::from_env()?))
    }

    /// Create a loader with an explicit environment.
    #[must_use]
    pub fn with_env(project_dir: impl Into<PathBuf>, env_config: EnvConfig) -> Self {
        let global_dir = default_global_dir(&env_config);
        Self {
            project_dir: project_dir.into(),
            global_dir,
            env_config,
        }
    }

    /// Use `dir` as the global configuration directory.
    #[must_use]
    pub fn global_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_dir = dir.into();
        self
    }

    /// Get the global configuration path.
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.global_dir.join("config.json")
    }

    /// Get the project composer.json path.
    #[must_use]
    pub fn project_manifest_path(&self) -> PathBuf {
        match &self.env_config.composer {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.project_dir.join(path),
            None => self.project_dir.join("composer.json"),
        }
    }

    /// Load the project manifest.
    pub fn load_project_manifest(&self) -> Result<ComposerManifest> {
        read_json(&self.project_manifest_path())
    }

    /// Check if project manifest exists.
    #[must_use]
    pub fn has_manifest(&self) -> bool {
        self.project_manifest_path().exists()
    }

    /// Build resolved configuration by merging all sources.
    ///
    /// A missing global config or manifest is skipped; an unreadable or
    /// malformed one is an error.
    pub fn resolve(&self, cli: &CliOverrides) -> Result<ResolvedConfig> {
        let mut resolved = ResolvedConfig {
            project_dir: self.project_dir.clone(),
            manifest_path: self.project_manifest_path(),
            home_dir: self.global_dir.clone(),
            ..ResolvedConfig::default()
        };

        // Layer 1: Global config
        let global: Option<GlobalConfigFile> = optional(read_json(&self.global_config_path()))?;

        // Layer 2: Project manifest
        let manifest: Option<ComposerManifest> = optional(self.load_project_manifest())?;

        if let Some(global) = &global
            && let Some(config) = &global.config
        {
            apply_config(&mut resolved, config, ConfigSource::Global);
        }
        if let Some(manifest) = &manifest {
            if let Some(config) = &manifest.config {
                apply_config(&mut resolved, config, ConfigSource::Project);
            }
            if let Some(stability) = &manifest.minimum_stability {
                resolved.minimum_stability = parse_stability(stability)?;
                resolved.origins.insert("minimum-stability", ConfigSource::Project);
            }
            if let Some(prefer) = manifest.prefer_stable {
                resolved.prefer_stable = prefer;
                resolved.origins.insert("prefer-stable", ConfigSource::Project);
            }
            if let Some(repositories) = &manifest.repositories {
                resolved.repositories.extend(repositories.definitions());
                resolved.packagist &= !repositories.disables_packagist();
            }
        }
        if let Some(repositories) = global.as_ref().and_then(|g| g.repositories.as_ref()) {
            resolved.repositories.extend(repositories.definitions());
            resolved.packagist &= !repositories.disables_packagist();
        }

        // Layer 3: Environment variables
        self.apply_env(&mut resolved);

        // Layer 4: Command line
        cli.apply_to(&mut resolved);

        debug!(
            manifest = %resolved.manifest_path.display(),
            minimum_stability = %resolved.minimum_stability,
            prefer_stable = resolved.prefer_stable,
            repositories = resolved.repositories.len(),
            packagist = resolved.packagist,
            "resolved configuration"
        );
        Ok(resolved)
    }

    /// Apply environment variables to resolved config.
    fn apply_env(&self, resolved: &mut ResolvedConfig) {
        let env = &self.env_config;
        if let Some(stability) = env.minimum_stability {
            resolved.minimum_stability = stability;
            resolved.origins.insert("minimum-stability", ConfigSource::Environment);
        }
        if let Some(prefer) = env.prefer_stable {
            resolved.prefer_stable = prefer;
            resolved.origins.insert("prefer-stable", ConfigSource::Environment);
        }
        if env.no_interaction {
            resolved.no_interaction = true;
        }
        if env.ignore_platform_reqs {
            resolved.ignore_platform_reqs = true;
            resolved.origins.insert("ignore-platform-reqs", ConfigSource::Environment);
        }
        resolved.ignore_platform_req.extend(env.ignore_platform_req.iter().cloned());
    }

    /// Get environment configuration.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env_config
    }

    /// Get project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

/// Apply a `config` section to resolved config.
fn apply_config(resolved: &mut ResolvedConfig, config: &ComposerConfig, source: ConfigSource) {
    if let Some(ref preferred) = config.preferred_install {
        resolved.preferred_install = preferred.clone();
        resolved.origins.insert("preferred-install", source);
    }
    if let Some(sort) = config.sort_packages {
        resolved.sort_packages = sort;
        resolved.origins.insert("sort-packages", source);
    }
    if let Some(ref platform) = config.platform {
        for (k, v) in platform {
            resolved.platform.insert(k.clone(), v.clone());
        }
        resolved.origins.insert("platform", source);
    }
}

fn parse_stability(value: &str) -> Result<Stability> {
    Stability::parse(value).ok_or_else(|| {
        ConfigError::invalid_value(
            "minimum-stability",
            format!("unknown stability '{value}'"),
            "use one of dev, alpha, beta, RC, stable",
        )
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    sonic_rs::from_str(&content).map_err(|e| ConfigError::json(path, &e))
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Global directory: `COMPOSER_HOME`, else the XDG config directory when
/// it exists, else `~/.composer`.
fn default_global_dir(env: &EnvConfig) -> PathBuf {
    if let Some(home) = &env.home {
        return home.clone();
    }
    let Some(dirs) = directories::BaseDirs::new() else {
        return PathBuf::from(".composer");
    };
    let xdg = dirs.config_dir().join("composer");
    if xdg.is_dir() {
        xdg
    } else {
        dirs.home_dir().join(".composer")
    }
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Non-interactive mode.
    pub no_interaction: bool,
    /// Ignore platform requirements.
    pub ignore_platform_reqs: bool,
    /// Ignore specific platform requirements.
    pub ignore_platform_req: Vec<String>,
    /// Prefer stable versions.
    pub prefer_stable: bool,
    /// Sort packages when writing.
    pub sort_packages: bool,
}

impl CliOverrides {
    /// Apply CLI overrides to resolved config.
    pub fn apply_to(&self, resolved: &mut ResolvedConfig) {
        if self.no_interaction {
            resolved.no_interaction = true;
        }
        if self.ignore_platform_reqs {
            resolved.ignore_platform_reqs = true;
            resolved.origins.insert("ignore-platform-reqs", ConfigSource::Cli);
        }
        resolved
            .ignore_platform_req
            .extend(self.ignore_platform_req.iter().cloned());
        if self.prefer_stable {
            resolved.prefer_stable = true;
            resolved.origins.insert("prefer-stable", ConfigSource::Cli);
        }
        if self.sort_packages {
            resolved.sort_packages = true;
            resolved.origins.insert("sort-packages", ConfigSource::Cli);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PlatformValue;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Fixture {
        project: TempDir,
        global: TempDir,
    }

    impl Fixture {
        fn new(manifest: Option<&str>, global: Option<&str>) -> Self {
            let project = tempfile::tempdir().unwrap();
            let home = tempfile::tempdir().unwrap();
            if let Some(manifest) = manifest {
                std::fs::write(project.path().join("composer.json"), manifest).unwrap();
            }
            if let Some(global) = global {
                std::fs::write(home.path().join("config.json"), global).unwrap();
            }
            Self { project, global: home }
        }

        fn loader(&self, env: EnvConfig) -> ConfigLoader {
            ConfigLoader::with_env(self.project.path(), env).global_dir(self.global.path())
        }
    }

    #[test]
    fn defaults_without_files() {
        let fixture = Fixture::new(None, None);
        let loader = fixture.loader(EnvConfig::default());
        assert!(!loader.has_manifest());
        let config = loader.resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.minimum_stability, Stability::Stable);
        assert!(!config.prefer_stable);
        assert_eq!(config.source_of("minimum-stability"), ConfigSource::Defaults);
        assert!(config.manifest_path.ends_with("composer.json"));
    }

    #[test]
    fn precedence_defaults_global_project_env_cli() {
        let fixture = Fixture::new(
            Some(r#"{"minimum-stability": "beta", "config": {"sort-packages": true, "platform": {"php": "8.1.0"}}}"#),
            Some(r#"{"config": {"sort-packages": false, "platform": {"php": "7.4.0", "ext-gd": false}}}"#),
        );

        let config = fixture.loader(EnvConfig::default()).resolve(&CliOverrides::default()).unwrap();
        assert_eq!(config.minimum_stability, Stability::Beta);
        assert!(config.sort_packages);
        assert_eq!(config.source_of("sort-packages"), ConfigSource::Project);
        assert_eq!(config.platform["php"], PlatformValue::Version("8.1.0".into()));
        assert_eq!(config.platform["ext-gd"], PlatformValue::Disabled(false));

        let env = EnvConfig {
            minimum_stability: Some(Stability::Dev),
            prefer_stable: Some(false),
            ..EnvConfig::default()
        };
        let cli = CliOverrides {
            prefer_stable: true,
            ..CliOverrides::default()
        };
        let config = fixture.loader(env).resolve(&cli).unwrap();
        assert_eq!(config.minimum_stability, Stability::Dev);
        assert_eq!(config.source_of("minimum-stability"), ConfigSource::Environment);
        assert!(config.prefer_stable);
        assert_eq!(config.source_of("prefer-stable"), ConfigSource::Cli);
    }

    #[test]
    fn project_repositories_come_before_global_ones() {
        let fixture = Fixture::new(
            Some(r#"{"repositories": [{"type": "composer", "url": "project"}]}"#),
            Some(r#"{"repositories": [{"type": "composer", "url": "global"}]}"#),
        );
        let config = fixture.loader(EnvConfig::default()).resolve(&CliOverrides::default()).unwrap();
        let urls: Vec<_> = config.repositories.iter().filter_map(|r| r.url.as_deref()).collect();
        assert_eq!(urls, vec!["project", "global"]);
        assert!(config.packagist);
    }

    #[test]
    fn packagist_can_be_disabled_globally() {
        let fixture = Fixture::new(
            Some(r#"{"repositories": [{"type": "composer", "url": "project"}]}"#),
            Some(r#"{"repositories": [{"packagist.org": false}]}"#),
        );
        let config = fixture.loader(EnvConfig::default()).resolve(&CliOverrides::default()).unwrap();
        assert!(!config.packagist);
        assert_eq!(config.repositories.len(), 1);
    }

    #[test]
    fn composer_variable_names_the_manifest() {
        let fixture = Fixture::new(None, None);
        std::fs::write(fixture.project.path().join("other.json"), r#"{"prefer-stable": true}"#).unwrap();
        let env = EnvConfig {
            composer: Some(PathBuf::from("other.json")),
            ..EnvConfig::default()
        };
        let loader = fixture.loader(env);
        assert!(loader.has_manifest());
        assert!(loader.resolve(&CliOverrides::default()).unwrap().prefer_stable);
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let fixture = Fixture::new(Some("{\"require\": "), None);
        let err = fixture.loader(EnvConfig::default()).resolve(&CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }

    #[test]
    fn unknown_stability_is_an_error() {
        let fixture = Fixture::new(Some(r#"{"minimum-stability": "nightly"}"#), None);
        let err = fixture.loader(EnvConfig::default()).resolve(&CliOverrides::default()).unwrap_err();
        assert_eq!(err.key(), Some("minimum-stability"));
    }

    #[test]
    fn ignore_lists_accumulate() {
        let fixture = Fixture::new(None, None);
        let env = EnvConfig {
            ignore_platform_req: vec!["ext-gd".into()],
            ..EnvConfig::default()
        };
        let cli = CliOverrides {
            ignore_platform_req: vec!["php+".into()],
            ..CliOverrides::default()
        };
        let config = fixture.loader(env).resolve(&cli).unwrap();
        assert_eq!(config.ignore_platform_req, vec!["ext-gd", "php+"]);
        assert!(!config.ignore_platform_reqs);
    }
}
