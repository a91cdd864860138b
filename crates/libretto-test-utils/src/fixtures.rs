//! Pre-built manifests and package listings.

use sonic_rs::{Array, JsonValueMutTrait, Object, Value, json};

/// Collection of pre-built manifest fixtures.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// Manifest with only a name.
    #[must_use]
    pub fn empty_composer_json() -> Value {
        json!({
            "name": "test/project"
        })
    }

    /// Manifest with a few requirements and a pinned platform.
    #[must_use]
    pub fn simple_composer_json() -> Value {
        json!({
            "name": "test/simple-project",
            "type": "project",
            "require": {
                "php": ">=8.1",
                "acme/log": "^1.0"
            },
            "require-dev": {
                "phpunit/phpunit": "^11.0"
            },
            "config": {
                "platform": {
                    "php": "8.2.4"
                }
            }
        })
    }

    /// Manifest that only accepts stable packages and pins PHP.
    #[must_use]
    pub fn pinned_platform_composer_json(php: &str) -> Value {
        json!({
            "name": "test/pinned",
            "minimum-stability": "stable",
            "config": {
                "platform": {
                    "php": php
                }
            }
        })
    }

    /// Lock file listing `packages` as `(name, version)` pairs.
    #[must_use]
    pub fn composer_lock(packages: &[(&str, &str)], packages_dev: &[(&str, &str)]) -> Value {
        let entries = |list: &[(&str, &str)]| {
            let mut array = Array::new();
            for &(name, version) in list {
                array.push(json!({"name": name, "version": version}));
            }
            Value::from(array)
        };
        let mut lock = json!({
            "content-hash": "d41d8cd98f00b204e9800998ecf8427e",
            "minimum-stability": "stable",
            "prefer-stable": false
        });
        if let Some(object) = lock.as_object_mut() {
            object.insert(&"packages", entries(packages));
            object.insert(&"packages-dev", entries(packages_dev));
        }
        lock
    }
}

/// Builder for a `packages.json` listing.
#[derive(Debug, Default, Clone)]
pub struct PackageListing {
    definitions: Vec<(String, Value)>,
}

impl PackageListing {
    /// Empty listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bare `name` at `version`.
    #[must_use]
    pub fn version(self, name: &str, version: &str) -> Self {
        self.package(name, json!({"name": name, "version": version}))
    }

    /// Add `name` at `version` with `require` links.
    #[must_use]
    pub fn requiring(self, name: &str, version: &str, require: &[(&str, &str)]) -> Self {
        let mut links = Object::new();
        for &(target, constraint) in require {
            links.insert(&target, json!(constraint));
        }
        let mut definition = json!({"name": name, "version": version});
        if let Some(object) = definition.as_object_mut() {
            object.insert(&"require", Value::from(links));
        }
        self.package(name, definition)
    }

    /// Add a full package definition.
    #[must_use]
    pub fn package(mut self, name: &str, definition: Value) -> Self {
        self.definitions.push((name.to_string(), definition));
        self
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the listing has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The listing as a `{"packages": {name: [definitions]}}` document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut grouped: Vec<(&str, Array)> = Vec::new();
        for (name, definition) in &self.definitions {
            match grouped.iter_mut().find(|(n, _)| *n == name.as_str()) {
                Some((_, versions)) => versions.push(definition.clone()),
                None => {
                    let mut versions = Array::new();
                    versions.push(definition.clone());
                    grouped.push((name, versions));
                }
            }
        }
        let mut packages = Object::new();
        for (name, versions) in grouped {
            packages.insert(&name, Value::from(versions));
        }
        let mut root = Object::new();
        root.insert(&"packages", Value::from(packages));
        Value::from(root)
    }
}
