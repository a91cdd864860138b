//! Reading installed packages from `composer.lock`.

use crate::error::{ManifestError, Result};
use libretto_resolver::{ArrayRepository, PackageDefinition};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// The parts of `composer.lock` needed to know what is installed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LockFile {
    /// Hash of the manifest the lock was generated from.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Runtime packages.
    #[serde(default)]
    pub packages: Vec<PackageDefinition>,
    /// Development packages.
    #[serde(default)]
    pub packages_dev: Vec<PackageDefinition>,
    /// Minimum stability at lock time.
    #[serde(default)]
    pub minimum_stability: Option<String>,
    /// `prefer-stable` at lock time.
    #[serde(default)]
    pub prefer_stable: bool,
}

impl LockFile {
    /// Read `path`; `None` when there is no lock file.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ManifestError::io(path, e)),
        };
        let lock: Self = sonic_rs::from_str(&text).map_err(|e| ManifestError::json(path, &e))?;
        debug!(
            path = %path.display(),
            packages = lock.packages.len(),
            dev_packages = lock.packages_dev.len(),
            "Loaded lock file"
        );
        Ok(Some(lock))
    }

    /// Lock file path belonging to a manifest: `composer.json` → `composer.lock`,
    /// `other.json` → `other.lock`.
    #[must_use]
    pub fn path_for(manifest: &Path) -> std::path::PathBuf {
        manifest.with_extension("lock")
    }

    /// Locked definition for `name`, searching runtime packages first.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PackageDefinition> {
        self.packages
            .iter()
            .chain(&self.packages_dev)
            .find(|p| p.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Installed packages as a repository.
    #[must_use]
    pub fn installed_repository(&self, include_dev: bool) -> ArrayRepository {
        let mut definitions = self.packages.clone();
        if include_dev {
            definitions.extend(self.packages_dev.iter().cloned());
        }
        ArrayRepository::from_definitions("installed", &definitions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use libretto_resolver::Repository;
    use tempfile::TempDir;

    const LOCK: &str = r#"{
    "content-hash": "abc123",
    "packages": [
        {"name": "monolog/monolog", "version": "3.5.0", "source": {"type": "git"}, "require": {"php": ">=8.1"}},
        {"name": "acme/tool", "version": "dev-main", "extra": {"branch-alias": {"dev-main": "2.x-dev"}}}
    ],
    "packages-dev": [
        {"name": "phpunit/phpunit", "version": "11.0.1"}
    ],
    "minimum-stability": "stable",
    "prefer-stable": true
}"#;

    #[test]
    fn load_reads_packages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("composer.lock");
        std::fs::write(&path, LOCK).unwrap();

        let lock = LockFile::load(&path).unwrap().unwrap();
        assert_eq!(lock.content_hash.as_deref(), Some("abc123"));
        assert_eq!(lock.packages.len(), 2);
        assert!(lock.prefer_stable);
        assert_eq!(lock.find("PHPUnit/phpunit").unwrap().version, "11.0.1");
        assert!(lock.find("missing/pkg").is_none());
    }

    #[test]
    fn missing_lock_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(LockFile::load(dir.path().join("composer.lock")).unwrap().is_none());
    }

    #[test]
    fn malformed_lock_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("composer.lock");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(LockFile::load(&path), Err(ManifestError::InvalidJson { .. })));
    }

    #[test]
    fn installed_repository_respects_dev_flag() {
        let lock: LockFile = sonic_rs::from_str(LOCK).unwrap();
        let runtime = lock.installed_repository(false);
        assert!(runtime.find_packages("phpunit/phpunit", None).is_empty());
        assert_eq!(runtime.find_packages("monolog/monolog", None).len(), 1);
        // the branch alias is listed next to the branch
        assert_eq!(runtime.find_packages("acme/tool", None).len(), 2);

        let all = lock.installed_repository(true);
        assert_eq!(all.find_packages("phpunit/phpunit", None).len(), 1);
    }

    #[test]
    fn lock_path_follows_manifest_name() {
        assert_eq!(
            LockFile::path_for(Path::new("/p/composer.json")),
            Path::new("/p/composer.lock")
        );
        assert_eq!(LockFile::path_for(Path::new("/p/other.json")), Path::new("/p/other.lock"));
    }
}
