//! Composer-compatible version handling.
//!
//! Versions come in two shapes:
//!
//! - Numeric versions: `1.2.3`, `v1.2`, `1.0.0-beta2`, `2.1.x-dev`
//! - Dev branches: `dev-main`, `dev-feature/foo`
//!
//! Every version keeps the string it was written as (the *pretty* version)
//! next to a normalized form with four numeric segments, e.g. `1.2` becomes
//! `1.2.0.0` and `1.0.x-dev` becomes `1.0.9999999.9999999-dev`. Equality,
//! hashing and ordering only look at the normalized form.
//!
//! Ordering follows Composer precedence: numeric segments first, then the
//! modifier (`-dev < alpha < beta < RC < release < patch`), then the
//! modifier number. Dev branches sort above every numeric version.

use libretto_core::Stability;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Version assigned to the default branch of a package (`dev-main as 9999999-dev`).
pub const DEFAULT_BRANCH_ALIAS: &str = "9999999-dev";

/// Placeholder segment used for `x` in numeric branch names (`1.x-dev`).
pub const BRANCH_WILDCARD: u64 = 9_999_999;

static CLASSICAL_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^
        v?
        (\d+)                                   # major
        (?:\.(\d+))?                            # minor
        (?:\.(\d+))?                            # patch
        (?:\.(\d+))?                            # fourth
        (?:
            [._-]?
            (stable|beta|b|rc|alpha|a|patch|pl|p)   # modifier
            ((?:[.-]?\d+)*)                         # modifier number
        )?
        ([.-]?dev)?                             # dev suffix
        $
        ",
    )
    .expect("valid regex")
});

static NUMERIC_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^v?(\d+)(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?$")
        .expect("valid regex")
});

static INLINE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^,\s]+) +as +[^,\s]+$").expect("valid regex"));

static STABILITY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@(?:stable|rc|beta|alpha|dev)$").expect("valid regex")
});

static DEV_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*?)[.-]?dev$").expect("valid regex"));

/// Release modifier attached to a numeric version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `-alpha`, `-a`
    Alpha,
    /// `-beta`, `-b`
    Beta,
    /// `-RC`
    RC,
    /// No modifier.
    Release,
    /// `-patch`, `-pl`, `-p`
    Patch,
}

impl Modifier {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Self::Alpha,
            "beta" | "b" => Self::Beta,
            "rc" => Self::RC,
            "patch" | "pl" | "p" => Self::Patch,
            _ => Self::Release,
        }
    }

    const fn suffix(self) -> &'static str {
        match self {
            Self::Alpha => "-alpha",
            Self::Beta => "-beta",
            Self::RC => "-RC",
            Self::Release => "",
            Self::Patch => "-patch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Numeric {
    segments: [u64; 4],
    modifier: Modifier,
    modifier_number: SmallVec<[u64; 2]>,
    dev: bool,
}

impl Numeric {
    const fn rank(&self) -> u8 {
        match (self.modifier, self.dev) {
            (Modifier::Release, true) => 0,
            (Modifier::Alpha, _) => 1,
            (Modifier::Beta, _) => 2,
            (Modifier::RC, _) => 3,
            (Modifier::Release, false) => 4,
            (Modifier::Patch, _) => 5,
        }
    }

    fn stability(&self) -> Stability {
        if self.dev {
            return Stability::Dev;
        }
        match self.modifier {
            Modifier::Alpha => Stability::Alpha,
            Modifier::Beta => Stability::Beta,
            Modifier::RC => Stability::RC,
            Modifier::Release | Modifier::Patch => Stability::Stable,
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| self.modifier_number.cmp(&other.modifier_number))
            // 1.0.0-beta1-dev sorts before 1.0.0-beta1
            .then_with(|| other.dev.cmp(&self.dev))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Kind {
    Numeric(Numeric),
    Branch(Arc<str>),
}

/// A parsed Composer version.
#[derive(Clone)]
pub struct ComposerVersion {
    kind: Kind,
    pretty: Arc<str>,
}

impl ComposerVersion {
    /// Create a stable `major.minor.patch` version.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self::from_numeric(Numeric {
            segments: [major, minor, patch, 0],
            modifier: Modifier::Release,
            modifier_number: SmallVec::new(),
            dev: false,
        })
    }

    /// The lowest possible version of a numeric release line, `X.Y.Z.W-dev`.
    #[must_use]
    pub fn dev_floor(segments: [u64; 4]) -> Self {
        Self::from_numeric(Numeric {
            segments,
            modifier: Modifier::Release,
            modifier_number: SmallVec::new(),
            dev: true,
        })
    }

    /// Create a dev branch version (`dev-<name>`).
    #[must_use]
    pub fn branch(name: &str) -> Self {
        Self {
            pretty: Arc::from(format!("dev-{name}")),
            kind: Kind::Branch(Arc::from(name)),
        }
    }

    fn from_numeric(numeric: Numeric) -> Self {
        let mut version = Self {
            kind: Kind::Numeric(numeric),
            pretty: Arc::from(""),
        };
        version.pretty = Arc::from(version.to_string());
        version
    }

    /// Parse and normalize a Composer version string.
    ///
    /// # Examples
    ///
    /// ```
    /// use libretto_resolver::ComposerVersion;
    ///
    /// let v = ComposerVersion::parse("v1.2").unwrap();
    /// assert_eq!(v.to_string(), "1.2.0.0");
    /// assert_eq!(v.pretty(), "v1.2");
    ///
    /// let v = ComposerVersion::parse("1.0.x-dev").unwrap();
    /// assert_eq!(v.to_string(), "1.0.9999999.9999999-dev");
    /// ```
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let pretty = input.trim();
        let kind = Self::normalize(pretty).ok_or_else(|| VersionParseError(input.to_string()))?;
        Ok(Self {
            kind,
            pretty: Arc::from(pretty),
        })
    }

    fn normalize(input: &str) -> Option<Kind> {
        let mut version = input;
        if version.is_empty() {
            return None;
        }

        if let Some(caps) = INLINE_ALIAS.captures(version) {
            version = caps.get(1)?.as_str();
        }
        if let Some(found) = STABILITY_SUFFIX.find(version) {
            version = &version[..found.start()];
        }
        if version.eq_ignore_ascii_case("master")
            || version.eq_ignore_ascii_case("trunk")
            || version.eq_ignore_ascii_case("default")
        {
            return Some(Kind::Branch(Arc::from(version)));
        }
        // build metadata never takes part in comparisons
        if let Some((head, _)) = version.split_once('+')
            && !head.is_empty()
        {
            version = head;
        }

        if version.len() > 4 && version[..4].eq_ignore_ascii_case("dev-") {
            return Some(Kind::Branch(Arc::from(&version[4..])));
        }

        if let Some(numeric) = Self::parse_classical(version) {
            return Some(Kind::Numeric(numeric));
        }

        let caps = DEV_SUFFIX.captures(version)?;
        let name = caps.get(1)?.as_str();
        if name.is_empty() {
            return None;
        }
        Some(Self::normalize_branch(name))
    }

    fn parse_classical(version: &str) -> Option<Numeric> {
        let caps = CLASSICAL_VERSION.captures(version)?;
        let mut segments = [0u64; 4];
        for (idx, segment) in segments.iter_mut().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                *segment = m.as_str().parse().ok()?;
            }
        }
        let modifier = caps
            .get(5)
            .map_or(Modifier::Release, |m| Modifier::parse(m.as_str()));
        let modifier_number = caps
            .get(6)
            .map(|m| {
                m.as_str()
                    .split(['.', '-'])
                    .filter(|part| !part.is_empty())
                    .map(str::parse)
                    .collect::<Result<SmallVec<[u64; 2]>, _>>()
            })
            .transpose()
            .ok()?
            .unwrap_or_default();
        Some(Numeric {
            segments,
            modifier,
            modifier_number,
            dev: caps.get(7).is_some(),
        })
    }

    /// `1.x` and `2.1.*` style branch names map onto numeric dev versions.
    fn normalize_branch(name: &str) -> Kind {
        if let Some(caps) = NUMERIC_BRANCH.captures(name) {
            let mut segments = [BRANCH_WILDCARD; 4];
            for (idx, segment) in segments.iter_mut().enumerate() {
                let Some(m) = caps.get(idx + 1) else { break };
                let raw = m.as_str().trim_start_matches(['.', 'v', 'V']);
                if let Ok(n) = raw.parse() {
                    *segment = n;
                }
            }
            return Kind::Numeric(Numeric {
                segments,
                modifier: Modifier::Release,
                modifier_number: SmallVec::new(),
                dev: true,
            });
        }
        Kind::Branch(Arc::from(name))
    }

    /// The string this version was authored as.
    #[must_use]
    #[inline]
    pub fn pretty(&self) -> &str {
        &self.pretty
    }

    /// Same version, different pretty string.
    #[must_use]
    pub fn with_pretty(&self, pretty: &str) -> Self {
        Self {
            kind: self.kind.clone(),
            pretty: Arc::from(pretty),
        }
    }

    /// Whether this is a `dev-*` branch.
    #[must_use]
    #[inline]
    pub fn is_branch(&self) -> bool {
        matches!(self.kind, Kind::Branch(_))
    }

    /// Branch name without the `dev-` prefix.
    #[must_use]
    pub fn branch_name(&self) -> Option<&str> {
        match &self.kind {
            Kind::Branch(name) => Some(name),
            Kind::Numeric(_) => None,
        }
    }

    /// The four numeric segments, `None` for branches.
    #[must_use]
    pub fn segments(&self) -> Option<[u64; 4]> {
        match &self.kind {
            Kind::Numeric(n) => Some(n.segments),
            Kind::Branch(_) => None,
        }
    }

    /// Release modifier, `None` for branches.
    #[must_use]
    pub fn modifier(&self) -> Option<Modifier> {
        match &self.kind {
            Kind::Numeric(n) => Some(n.modifier),
            Kind::Branch(_) => None,
        }
    }

    /// Whether the normalized form ends in `-dev`.
    #[must_use]
    pub fn has_dev_suffix(&self) -> bool {
        matches!(&self.kind, Kind::Numeric(n) if n.dev)
    }

    /// Stability derived from the normalized version.
    #[must_use]
    pub fn stability(&self) -> Stability {
        match &self.kind {
            Kind::Numeric(n) => n.stability(),
            Kind::Branch(_) => Stability::Dev,
        }
    }

    /// Whether this is a development version (branch or `-dev` suffix).
    #[must_use]
    #[inline]
    pub fn is_dev(&self) -> bool {
        self.stability() == Stability::Dev
    }

    /// Whether this is the version given to default branches.
    #[must_use]
    pub fn is_default_branch_alias(&self) -> bool {
        match &self.kind {
            Kind::Numeric(n) => {
                n.dev
                    && n.modifier == Modifier::Release
                    && (n.segments == [BRANCH_WILDCARD, 0, 0, 0]
                        || n.segments == [BRANCH_WILDCARD; 4])
            }
            Kind::Branch(_) => false,
        }
    }

    /// Same numeric version with a `-dev` suffix appended, used for range bounds.
    #[must_use]
    pub fn to_dev(&self) -> Self {
        match &self.kind {
            Kind::Numeric(n) => Self::from_numeric(Numeric {
                dev: true,
                ..n.clone()
            }),
            Kind::Branch(_) => self.clone(),
        }
    }

    /// Same numeric version carrying a stability modifier (`>=1.0@beta`).
    #[must_use]
    pub fn with_stability(&self, stability: Stability) -> Self {
        let Kind::Numeric(n) = &self.kind else {
            return self.clone();
        };
        let modifier = match stability {
            Stability::Dev => return self.to_dev(),
            Stability::Alpha => Modifier::Alpha,
            Stability::Beta => Modifier::Beta,
            Stability::RC => Modifier::RC,
            Stability::Stable => return self.clone(),
        };
        Self::from_numeric(Numeric {
            segments: n.segments,
            modifier,
            modifier_number: SmallVec::new(),
            dev: false,
        })
    }
}

impl fmt::Debug for ComposerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposerVersion")
            .field("normalized", &self.to_string())
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl fmt::Display for ComposerVersion {
    /// Writes the normalized form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Branch(name) => write!(f, "dev-{name}"),
            Kind::Numeric(n) => {
                let [a, b, c, d] = n.segments;
                write!(f, "{a}.{b}.{c}.{d}{}", n.modifier.suffix())?;
                let mut first = true;
                for number in &n.modifier_number {
                    if !first {
                        f.write_str(".")?;
                    }
                    write!(f, "{number}")?;
                    first = false;
                }
                if n.dev {
                    f.write_str("-dev")?;
                }
                Ok(())
            }
        }
    }
}

impl PartialEq for ComposerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for ComposerVersion {}

impl Hash for ComposerVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl PartialOrd for ComposerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComposerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind.cmp(&other.kind)
    }
}

impl FromStr for ComposerVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ComposerVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pretty)
    }
}

impl<'de> Deserialize<'de> for ComposerVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Error when parsing a version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version string \"{0}\"")]
pub struct VersionParseError(pub String);
