//! Temporary project directories for integration tests.
//!
//! A project holds a `composer.json`, optionally a `composer.lock`, and a
//! local composer repository under `repo/` that the manifest points at. Its
//! `home/` directory carries a global config that disables Packagist.

use anyhow::{Context, Result};
use sonic_rs::{JsonValueMutTrait, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::fixtures::PackageListing;

/// Directory holding the local `packages.json`, relative to the project.
pub const REPOSITORY_DIR: &str = "repo";

/// Directory used as `COMPOSER_HOME`, relative to the project.
pub const HOME_DIR: &str = "home";

/// Global config written to [`HOME_DIR`] so projects never reach Packagist.
const OFFLINE_GLOBAL_CONFIG: &str = r#"{"repositories": [{"packagist.org": false}]}"#;

/// A temporary project directory.
///
/// Removed when dropped.
#[derive(Debug)]
pub struct TempProject {
    dir: TempDir,
    composer_json_path: PathBuf,
    composer_lock_path: PathBuf,
}

impl TempProject {
    /// Create a new temporary project builder.
    #[must_use]
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> TempProjectBuilder {
        TempProjectBuilder::default()
    }

    /// Root directory of the project.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path to composer.json.
    #[must_use]
    pub fn composer_json_path(&self) -> &Path {
        &self.composer_json_path
    }

    /// Path to composer.lock.
    #[must_use]
    pub fn composer_lock_path(&self) -> &Path {
        &self.composer_lock_path
    }

    /// Directory to use as `COMPOSER_HOME`.
    #[must_use]
    pub fn home_path(&self) -> PathBuf {
        self.dir.path().join(HOME_DIR)
    }

    /// Raw composer.json text.
    pub fn read_composer_json(&self) -> Result<String> {
        fs::read_to_string(&self.composer_json_path).context("Failed to read composer.json")
    }

    /// Parsed composer.json.
    pub fn composer_json(&self) -> Result<Value> {
        let text = self.read_composer_json()?;
        sonic_rs::from_str(&text).context("Failed to parse composer.json")
    }

    /// Overwrite composer.json with raw text.
    pub fn write_composer_json(&self, text: &str) -> Result<()> {
        fs::write(&self.composer_json_path, text).context("Failed to write composer.json")
    }

    /// Overwrite composer.lock.
    pub fn write_composer_lock(&self, lock: &Value) -> Result<()> {
        let text = sonic_rs::to_string_pretty(lock)?;
        fs::write(&self.composer_lock_path, text).context("Failed to write composer.lock")
    }

    /// Whether a file exists relative to the project root.
    #[must_use]
    pub fn file_exists(&self, relative_path: &str) -> bool {
        self.dir.path().join(relative_path).exists()
    }

    /// Create a file relative to the project root.
    pub fn create_file(&self, relative_path: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// Builder for [`TempProject`].
#[derive(Debug, Default)]
pub struct TempProjectBuilder {
    composer_json: Option<ManifestSource>,
    composer_lock: Option<Value>,
    packages: Option<PackageListing>,
}

#[derive(Debug)]
enum ManifestSource {
    Value(Value),
    Raw(String),
}

impl TempProjectBuilder {
    /// Manifest content. A `repositories` entry for the local repository is
    /// added when packages are configured and none is present.
    #[must_use]
    pub fn with_composer_json(mut self, content: &Value) -> Self {
        self.composer_json = Some(ManifestSource::Value(content.clone()));
        self
    }

    /// Manifest written verbatim.
    #[must_use]
    pub fn with_raw_composer_json(mut self, text: &str) -> Self {
        self.composer_json = Some(ManifestSource::Raw(text.to_string()));
        self
    }

    /// Lock file content.
    #[must_use]
    pub fn with_composer_lock(mut self, content: Value) -> Self {
        self.composer_lock = Some(content);
        self
    }

    /// Packages served by the local repository.
    #[must_use]
    pub fn with_packages(mut self, packages: PackageListing) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Create the project on disk.
    pub fn build(self) -> Result<TempProject> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        let composer_json_path = dir.path().join("composer.json");
        let composer_lock_path = dir.path().join("composer.lock");
        let home = dir.path().join(HOME_DIR);
        fs::create_dir_all(&home)?;
        fs::write(home.join("config.json"), OFFLINE_GLOBAL_CONFIG)?;

        if let Some(packages) = &self.packages {
            let repo = dir.path().join(REPOSITORY_DIR);
            fs::create_dir_all(&repo)?;
            let listing = sonic_rs::to_string_pretty(&packages.to_value())?;
            fs::write(repo.join("packages.json"), listing).context("Failed to write packages.json")?;
        }

        match self.composer_json {
            Some(ManifestSource::Raw(text)) => fs::write(&composer_json_path, text)?,
            Some(ManifestSource::Value(mut manifest)) => {
                if self.packages.is_some() {
                    add_local_repository(&mut manifest);
                }
                let text = sonic_rs::to_string_pretty(&manifest)?;
                fs::write(&composer_json_path, format!("{text}\n"))?;
            }
            None => {}
        }

        if let Some(lock) = &self.composer_lock {
            fs::write(&composer_lock_path, sonic_rs::to_string_pretty(lock)?)?;
        }

        Ok(TempProject {
            dir,
            composer_json_path,
            composer_lock_path,
        })
    }
}

fn add_local_repository(manifest: &mut Value) {
    if let Some(object) = manifest.as_object_mut()
        && object.get(&"repositories").is_none()
    {
        object.insert(
            &"repositories",
            json!([{"type": "composer", "url": REPOSITORY_DIR}]),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures::Fixtures;
    use sonic_rs::JsonValueTrait;

    #[test]
    fn build_writes_manifest_and_repository() {
        let project = TempProject::new()
            .with_composer_json(&Fixtures::simple_composer_json())
            .with_packages(PackageListing::new().version("acme/log", "1.0.0"))
            .build()
            .unwrap();

        assert!(project.file_exists("repo/packages.json"));
        assert!(project.file_exists("home/config.json"));
        let manifest = project.composer_json().unwrap();
        let url = manifest
            .get("repositories")
            .and_then(|r| r.get(0))
            .and_then(|r| r.get("url"))
            .and_then(|u| u.as_str().map(str::to_string));
        assert_eq!(url.as_deref(), Some(REPOSITORY_DIR));
    }

    #[test]
    fn raw_manifest_is_written_verbatim() {
        let project = TempProject::new()
            .with_raw_composer_json("{\"name\": \"a/b\"}")
            .build()
            .unwrap();
        assert_eq!(project.read_composer_json().unwrap(), "{\"name\": \"a/b\"}");
        assert!(!project.composer_lock_path().exists());
    }
}
