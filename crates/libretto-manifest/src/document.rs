//! Editing the link sections of a `composer.json` document.

use crate::error::{ManifestError, Result};
use libretto_resolver::is_platform_package;
use sonic_rs::{JsonContainerTrait, JsonValueMutTrait, JsonValueTrait, Value};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

const DEFAULT_INDENT: &str = "    ";

/// Link section of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkSection {
    /// `require`
    Require,
    /// `require-dev`
    RequireDev,
}

impl LinkSection {
    /// Key in the manifest.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Require => "require",
            Self::RequireDev => "require-dev",
        }
    }

    /// The other section.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Require => Self::RequireDev,
            Self::RequireDev => Self::Require,
        }
    }

    /// Section for a `--dev` flag.
    #[must_use]
    pub const fn from_dev(dev: bool) -> Self {
        if dev { Self::RequireDev } else { Self::Require }
    }
}

/// A parsed manifest that keeps key order and indentation on output.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    root: Value,
    indent: String,
    path: Option<PathBuf>,
}

impl ManifestDocument {
    /// An empty `{}` manifest.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: sonic_rs::json!({}),
            indent: DEFAULT_INDENT.to_string(),
            path: None,
        }
    }

    /// Parse manifest text.
    ///
    /// # Errors
    /// Returns error if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_at(text, PathBuf::from("composer.json"))
    }

    /// Read a manifest from disk.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not a JSON object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
        let mut doc = Self::parse_at(&text, path.to_path_buf())?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    fn parse_at(text: &str, path: PathBuf) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let root: Value = sonic_rs::from_str(text).map_err(|e| ManifestError::json(&path, &e))?;
        if !root.is_object() {
            return Err(ManifestError::invalid(path, "the root element must be an object"));
        }
        Ok(Self {
            root,
            indent: detect_indent(text),
            path: None,
        })
    }

    /// File the document was loaded from.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Indentation unit used on output.
    #[must_use]
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Links in `section`, in document order.
    #[must_use]
    pub fn links(&self, section: LinkSection) -> Vec<(String, String)> {
        self.root
            .get(section.key())
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .map(|(name, constraint)| {
                        (name.to_string(), constraint.as_str().unwrap_or_default().to_string())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Constraint for `name` in `section`, matched case-insensitively.
    #[must_use]
    pub fn link(&self, section: LinkSection, name: &str) -> Option<(String, String)> {
        self.links(section)
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Add or replace a link.
    ///
    /// An existing entry with the same name in any letter case is replaced in
    /// place; new entries go last, or the whole section is sorted when
    /// `sort_packages` is set.
    pub fn add_link(&mut self, section: LinkSection, name: &str, constraint: &str, sort_packages: bool) {
        let mut links = self.links(section);
        match links.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(entry) => *entry = (name.to_string(), constraint.to_string()),
            None => links.push((name.to_string(), constraint.to_string())),
        }
        if sort_packages {
            links.sort_by(|(a, _), (b, _)| compare_links(a, b));
        }
        self.set_section(section, &links);
    }

    /// Remove a link, returning the name and constraint that were there.
    ///
    /// The section itself is dropped once empty.
    pub fn remove_link(&mut self, section: LinkSection, name: &str) -> Option<(String, String)> {
        let mut links = self.links(section);
        let index = links.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        let removed = links.remove(index);
        if links.is_empty() {
            if let Some(root) = self.root.as_object_mut() {
                root.remove(&section.key());
            }
        } else {
            self.set_section(section, &links);
        }
        Some(removed)
    }

    /// Whether `config.sort-packages` is enabled in the document.
    #[must_use]
    pub fn sort_packages(&self) -> bool {
        self.root
            .get("config")
            .and_then(|c| c.get("sort-packages"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn set_section(&mut self, section: LinkSection, links: &[(String, String)]) {
        let mut obj = sonic_rs::Object::new();
        for (name, constraint) in links {
            obj.insert(name, sonic_rs::json!(constraint));
        }
        if let Some(root) = self.root.as_object_mut() {
            root.insert(&section.key(), Value::from(obj));
        }
    }

    /// Serialize with the document's indentation and a trailing newline.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn render(&self) -> Result<String> {
        let pretty = sonic_rs::to_string_pretty(&self.root).map_err(|e| {
            ManifestError::invalid(self.path.clone().unwrap_or_default(), e.to_string())
        })?;
        let mut out = String::with_capacity(pretty.len() * 2);
        for line in pretty.lines() {
            let trimmed = line.trim_start_matches(' ');
            let depth = (line.len() - trimmed.len()) / 2;
            for _ in 0..depth {
                out.push_str(&self.indent);
            }
            out.push_str(trimmed);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Default for ManifestDocument {
    fn default() -> Self {
        Self::empty()
    }
}

fn detect_indent(text: &str) -> String {
    text.lines()
        .skip(1)
        .find_map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            let width = line.len() - trimmed.len();
            (width > 0 && !trimmed.is_empty()).then(|| line[..width].to_string())
        })
        .unwrap_or_else(|| DEFAULT_INDENT.to_string())
}

/// Order used when `sort-packages` is on: php, hhvm, extensions, libraries,
/// other platform packages, then everything else alphabetically.
fn sort_key(name: &str) -> (u8, String) {
    let lower = name.to_ascii_lowercase();
    let group = if is_platform_package(&lower) {
        if lower.starts_with("php") {
            0
        } else if lower.starts_with("hhvm") {
            1
        } else if lower.starts_with("ext") {
            2
        } else if lower.starts_with("lib") {
            3
        } else {
            4
        }
    } else {
        5
    };
    (group, lower)
}

fn compare_links(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
    "name": "acme/app",
    "require": {
        "php": ">=8.1",
        "monolog/monolog": "^3.0"
    },
    "config": {
        "sort-packages": true
    }
}
"#;

    mod links {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn reads_in_document_order() {
            let doc = ManifestDocument::parse(MANIFEST).unwrap();
            assert_eq!(
                doc.links(LinkSection::Require),
                vec![
                    ("php".to_string(), ">=8.1".to_string()),
                    ("monolog/monolog".to_string(), "^3.0".to_string())
                ]
            );
            assert!(doc.links(LinkSection::RequireDev).is_empty());
            assert!(doc.sort_packages());
        }

        #[test]
        fn add_replaces_case_insensitively_in_place() {
            let mut doc = ManifestDocument::parse(MANIFEST).unwrap();
            doc.add_link(LinkSection::Require, "Monolog/Monolog", "^3.5", false);
            assert_eq!(
                doc.links(LinkSection::Require),
                vec![
                    ("php".to_string(), ">=8.1".to_string()),
                    ("Monolog/Monolog".to_string(), "^3.5".to_string())
                ]
            );
        }

        #[test]
        fn add_appends_or_sorts() {
            let mut doc = ManifestDocument::parse(MANIFEST).unwrap();
            doc.add_link(LinkSection::Require, "acme/log", "^1.0", false);
            assert_eq!(doc.links(LinkSection::Require).last().unwrap().0, "acme/log");

            doc.add_link(LinkSection::Require, "ext-json", "*", true);
            let names: Vec<_> = doc.links(LinkSection::Require).into_iter().map(|(n, _)| n).collect();
            assert_eq!(names, ["php", "ext-json", "acme/log", "monolog/monolog"]);
        }

        #[test]
        fn add_creates_missing_section() {
            let mut doc = ManifestDocument::parse(MANIFEST).unwrap();
            doc.add_link(LinkSection::RequireDev, "phpunit/phpunit", "^11.0", false);
            assert_eq!(
                doc.link(LinkSection::RequireDev, "PHPUnit/phpunit"),
                Some(("phpunit/phpunit".to_string(), "^11.0".to_string()))
            );
        }

        #[test]
        fn remove_drops_empty_section() {
            let mut doc = ManifestDocument::parse(MANIFEST).unwrap();
            doc.add_link(LinkSection::RequireDev, "phpunit/phpunit", "^11.0", false);
            assert_eq!(
                doc.remove_link(LinkSection::RequireDev, "phpunit/phpunit"),
                Some(("phpunit/phpunit".to_string(), "^11.0".to_string()))
            );
            assert!(!doc.render().unwrap().contains("require-dev"));
            assert_eq!(doc.remove_link(LinkSection::RequireDev, "phpunit/phpunit"), None);
        }

        #[test]
        fn sort_groups_platform_packages_first() {
            let mut names = vec!["zeta/z", "lib-curl", "ext-gd", "php", "alpha/a", "composer-plugin-api", "hhvm"];
            names.sort_by(|a, b| compare_links(a, b));
            assert_eq!(names, ["php", "hhvm", "ext-gd", "lib-curl", "composer-plugin-api", "alpha/a", "zeta/z"]);
        }
    }

    mod output {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn render_keeps_four_space_indent() {
            let doc = ManifestDocument::parse(MANIFEST).unwrap();
            assert_eq!(doc.render().unwrap(), MANIFEST);
        }

        #[test]
        fn render_keeps_two_space_indent() {
            let text = "{\n  \"require\": {\n    \"php\": \"^8.2\"\n  }\n}\n";
            let doc = ManifestDocument::parse(text).unwrap();
            assert_eq!(doc.indent(), "  ");
            assert_eq!(doc.render().unwrap(), text);
        }

        #[test]
        fn empty_input_is_an_empty_object() {
            let mut doc = ManifestDocument::parse("").unwrap();
            doc.add_link(LinkSection::Require, "acme/log", "^1.0", true);
            assert_eq!(
                doc.render().unwrap(),
                "{\n    \"require\": {\n        \"acme/log\": \"^1.0\"\n    }\n}\n"
            );
        }

        #[test]
        fn rejects_non_objects() {
            assert!(matches!(
                ManifestDocument::parse("[1, 2]"),
                Err(ManifestError::InvalidManifest { .. })
            ));
            assert!(matches!(
                ManifestDocument::parse("{\"a\": "),
                Err(ManifestError::InvalidJson { .. })
            ));
        }
    }
}
