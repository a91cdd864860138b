//! Stability classification and minimum-stability filtering.

use crate::constraint::constraint_parts;
use ahash::AHashMap;
use libretto_core::Stability;
use regex::Regex;
use std::sync::LazyLock;

static MODIFIER_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[._-]?(?:(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*)?)?([.-]?dev)?(?:\+.*)?$",
    )
    .expect("valid regex")
});

static EXPLICIT_FLAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[^@]*?@(stable|rc|beta|alpha|dev)$").expect("valid regex"));

static ALIASED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^,\s@]+) as .+$").expect("valid regex"));

static SINGLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^,\s@]+$").expect("valid regex"));

/// Stability of a raw version string.
///
/// Never fails: anything without a recognisable unstable marker is stable.
///
/// ```
/// use libretto_core::Stability;
/// use libretto_resolver::stability::classify;
///
/// assert_eq!(classify("dev-main"), Stability::Dev);
/// assert_eq!(classify("2.0.0-beta1"), Stability::Beta);
/// assert_eq!(classify("1.4.2"), Stability::Stable);
/// ```
#[must_use]
pub fn classify(version: &str) -> Stability {
    let version = version.split_once('#').map_or(version, |(head, _)| head);
    let lower = version.to_ascii_lowercase();
    if lower.starts_with("dev-") || lower.ends_with("-dev") {
        return Stability::Dev;
    }

    let Some(caps) = MODIFIER_SUFFIX.captures(&lower) else {
        return Stability::Stable;
    };
    if caps.get(3).is_some_and(|m| !m.is_empty()) {
        return Stability::Dev;
    }
    match caps.get(1).map(|m| m.as_str()) {
        Some("beta" | "b") => Stability::Beta,
        Some("alpha" | "a") => Stability::Alpha,
        Some("rc") => Stability::RC,
        _ => Stability::Stable,
    }
}

/// Whether a candidate passes the stability floor.
///
/// A per-package override replaces the minimum for that package, in either
/// direction.
#[must_use]
#[inline]
pub fn is_acceptable(candidate: Stability, minimum: Stability, explicit_override: Option<Stability>) -> bool {
    candidate.satisfies_minimum(explicit_override.unwrap_or(minimum))
}

/// Per-package stability overrides, keyed by lowercase package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilityFlags {
    flags: AHashMap<String, Stability>,
}

impl StabilityFlags {
    /// Empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the overrides implied by a list of requirements.
    pub fn from_requirements<'a>(
        requirements: impl IntoIterator<Item = (&'a str, &'a str)>,
        minimum: Stability,
    ) -> Self {
        let mut flags = Self::new();
        for (name, constraint) in requirements {
            flags.extract(name, constraint, minimum);
        }
        flags
    }

    /// Override for a package.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Stability> {
        self.flags.get(&name.to_ascii_lowercase()).copied()
    }

    /// Set an override directly.
    pub fn insert(&mut self, name: &str, stability: Stability) {
        self.flags.insert(name.to_ascii_lowercase(), stability);
    }

    /// Number of packages with an override.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether there are no overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Record the override implied by one requirement.
    ///
    /// An explicit `@flag` wins and the least stable flag is kept. Without
    /// one, an explicitly unstable version (`dev-main`, `2.0.0-beta1`) sets
    /// the override when it is no more stable than `minimum`.
    pub fn extract(&mut self, name: &str, constraint: &str, minimum: Stability) {
        let key = name.to_ascii_lowercase();
        let parts = constraint_parts(constraint);

        let mut matched = false;
        for part in &parts {
            let Some(stability) = EXPLICIT_FLAG
                .captures(part)
                .and_then(|caps| caps.get(1))
                .and_then(|m| Stability::parse(m.as_str()))
            else {
                continue;
            };
            matched = true;
            if self.flags.get(&key).is_some_and(|existing| *existing < stability) {
                continue;
            }
            self.flags.insert(key.clone(), stability);
        }
        if matched {
            return;
        }

        for part in &parts {
            let version = ALIASED
                .captures(part)
                .and_then(|caps| caps.get(1))
                .map_or(part.as_str(), |m| m.as_str());
            if !SINGLE_TOKEN.is_match(version) {
                continue;
            }
            let stability = classify(version);
            if stability == Stability::Stable {
                continue;
            }
            if self.flags.get(&key).is_some_and(|existing| *existing < stability)
                || minimum < stability
            {
                continue;
            }
            self.flags.insert(key.clone(), stability);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0.0", Stability::Stable)]
    #[case("v2.3", Stability::Stable)]
    #[case("1.0.0-p2", Stability::Stable)]
    #[case("1.0.0-RC1", Stability::RC)]
    #[case("1.0.0rc", Stability::RC)]
    #[case("2.0.0-beta1", Stability::Beta)]
    #[case("2.0.0b", Stability::Beta)]
    #[case("3.0-alpha.2", Stability::Alpha)]
    #[case("1.0.x-dev", Stability::Dev)]
    #[case("dev-main", Stability::Dev)]
    #[case("dev-main#abc123", Stability::Dev)]
    #[case("1.0.0-beta1-dev", Stability::Dev)]
    #[case("1.0.0+build.7", Stability::Stable)]
    fn classifies(#[case] version: &str, #[case] expected: Stability) {
        assert_eq!(classify(version), expected);
    }

    #[test]
    fn acceptance_uses_override_in_place_of_minimum() {
        assert!(is_acceptable(Stability::Stable, Stability::Stable, None));
        assert!(!is_acceptable(Stability::Beta, Stability::Stable, None));
        assert!(is_acceptable(Stability::Beta, Stability::Alpha, None));
        assert!(is_acceptable(Stability::Dev, Stability::Stable, Some(Stability::Dev)));
        assert!(!is_acceptable(Stability::Beta, Stability::Dev, Some(Stability::RC)));
    }

    mod flag_extraction {
        use super::*;

        fn flag_for(constraint: &str, minimum: Stability) -> Option<Stability> {
            let flags = StabilityFlags::from_requirements([("Foo/Bar", constraint)], minimum);
            flags.get("foo/bar")
        }

        #[rstest]
        #[case("^1.0@dev", Stability::Stable, Some(Stability::Dev))]
        #[case("@beta", Stability::Stable, Some(Stability::Beta))]
        #[case("^1.0@beta || ^2.0@alpha", Stability::Stable, Some(Stability::Alpha))]
        #[case("dev-main", Stability::Stable, Some(Stability::Dev))]
        #[case("dev-main as 1.0.x-dev", Stability::Stable, Some(Stability::Dev))]
        #[case("2.0.0-beta1", Stability::Stable, Some(Stability::Beta))]
        #[case("2.0.0-beta1", Stability::Dev, None)]
        #[case(">=2.0.0-beta1", Stability::Stable, Some(Stability::Beta))]
        #[case("^1.0", Stability::Stable, None)]
        fn extracts(
            #[case] constraint: &str,
            #[case] minimum: Stability,
            #[case] expected: Option<Stability>,
        ) {
            assert_eq!(flag_for(constraint, minimum), expected);
        }

        #[test]
        fn least_stable_flag_is_kept() {
            let mut flags = StabilityFlags::new();
            flags.extract("foo/bar", "^1.0@dev", Stability::Stable);
            flags.extract("foo/bar", "^1.0@rc", Stability::Stable);
            assert_eq!(flags.get("foo/bar"), Some(Stability::Dev));
            assert_eq!(flags.len(), 1);
        }
    }
}
