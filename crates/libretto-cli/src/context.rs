//! Per-invocation state shared by the commands.

use anyhow::{Context as _, Result};
use libretto_config::{
    CliOverrides, ComposerManifest, ConfigLoader, RepositoryDefinition, RepositoryType,
    ResolvedConfig,
};
use libretto_resolver::{
    ArrayRepository, ComposerRepository, HttpClient, HttpComposerRepository, InlinePackages,
    PlatformRepository, PlatformRequirementFilter, Repository, Resolver, ResolverSettings,
    StabilityFlags,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::platform::PlatformDetector;

/// Configuration and project state for one command.
#[derive(Debug)]
pub struct Context {
    /// Merged configuration.
    pub config: ResolvedConfig,
    /// Parsed project manifest, if one exists.
    pub manifest: Option<ComposerManifest>,
}

impl Context {
    /// Load configuration for `working_dir` (or the current directory).
    pub fn load(working_dir: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let project_dir = match working_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().context("cannot determine the current directory")?,
        };
        let loader = ConfigLoader::new(&project_dir)?;
        let config = loader.resolve(overrides)?;
        let manifest = if loader.has_manifest() {
            Some(loader.load_project_manifest()?)
        } else {
            None
        };
        Ok(Self { config, manifest })
    }

    /// Path of the project manifest.
    pub fn manifest_path(&self) -> &Path {
        &self.config.manifest_path
    }

    /// Platform filter from `--ignore-platform-req(s)` and the environment.
    pub fn platform_filter(&self) -> PlatformRequirementFilter {
        PlatformRequirementFilter::from_options(
            self.config.ignore_platform_reqs,
            &self.config.ignore_platform_req,
        )
    }

    /// Platform repository from detection and `config.platform`.
    pub fn platform_repository(&self) -> PlatformRepository {
        let snapshot = PlatformDetector::new().detect();
        PlatformRepository::build(&snapshot, self.config.platform_overrides())
    }

    /// Configured repositories in priority order, Packagist last unless disabled.
    ///
    /// Remote repositories need the async runtime; without one they are skipped.
    pub fn repositories(&self) -> Vec<Arc<dyn Repository>> {
        let remote = self.remote();
        let mut repositories: Vec<Arc<dyn Repository>> = self
            .config
            .repositories
            .iter()
            .enumerate()
            .filter_map(|(index, definition)| self.open_repository(index, definition, remote.as_ref()))
            .collect();
        if self.config.packagist {
            match &remote {
                Some((client, runtime)) => repositories.push(Arc::new(HttpComposerRepository::packagist(
                    client.clone(),
                    runtime.clone(),
                ))),
                None => warn!("packagist.org is unavailable without an HTTP client, skipping"),
            }
        }
        repositories
    }

    fn remote(&self) -> Option<(HttpClient, Handle)> {
        let runtime = Handle::try_current().ok()?;
        match HttpClient::new() {
            Ok(client) => Some((client, runtime)),
            Err(err) => {
                warn!(error = %err, "HTTP client could not be created, remote repositories are skipped");
                None
            }
        }
    }

    fn open_repository(
        &self,
        index: usize,
        definition: &RepositoryDefinition,
        remote: Option<&(HttpClient, Handle)>,
    ) -> Option<Arc<dyn Repository>> {
        let canonical = definition.is_canonical();
        match definition.repo_type {
            RepositoryType::Composer => {
                let Some(url) = &definition.url else {
                    warn!(index, "composer repository without a url, skipping");
                    return None;
                };
                if HttpComposerRepository::is_remote(url) {
                    let Some((client, runtime)) = remote else {
                        warn!(index, url = %url, "remote repository needs the async runtime, skipping");
                        return None;
                    };
                    return Some(Arc::new(HttpComposerRepository::open(
                        url,
                        canonical,
                        client.clone(),
                        runtime.clone(),
                    )));
                }
                let url = ComposerRepository::url_relative_to(url, &self.config.project_dir);
                Some(Arc::new(ComposerRepository::open(&url, canonical)))
            }
            RepositoryType::Package => {
                let Some(definitions) = definition.package.clone().map(InlinePackages::into_vec) else {
                    warn!(index, "package repository without a package definition, skipping");
                    return None;
                };
                let name = format!("package repo {}", index + 1);
                debug!(repository = %name, packages = definitions.len(), "loaded inline packages");
                Some(Arc::new(ArrayRepository::from_definitions(name, &definitions).canonical(canonical)))
            }
            other => {
                warn!(
                    index,
                    kind = other.as_str(),
                    "repositories of type \"{}\" are not supported, skipping",
                    other.as_str()
                );
                None
            }
        }
    }

    /// Stability overrides implied by the manifest's own requirements.
    pub fn stability_flags(&self) -> StabilityFlags {
        let minimum = self.config.minimum_stability;
        self.manifest.as_ref().map_or_else(StabilityFlags::new, |manifest| {
            StabilityFlags::from_requirements(
                manifest
                    .require
                    .iter()
                    .chain(&manifest.require_dev)
                    .map(|(name, constraint)| (name.as_str(), constraint.as_str())),
                minimum,
            )
        })
    }

    /// Discovery service over the configured repositories.
    pub fn resolver(&self) -> Resolver {
        let settings = ResolverSettings {
            minimum_stability: self.config.minimum_stability,
            prefer_stable: self.config.prefer_stable,
            stability_flags: self.stability_flags(),
        };
        Resolver::new(self.repositories(), Arc::new(self.platform_repository()), settings)
    }

    /// `composer.lock` next to the manifest.
    pub fn lock_path(&self) -> PathBuf {
        libretto_manifest::LockFile::path_for(self.manifest_path())
    }
}
