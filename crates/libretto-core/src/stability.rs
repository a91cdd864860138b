//! Package stability levels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Stability level for package versions.
///
/// Ordered from least to most stable so that `Stability::Dev < Stability::Stable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Stability {
    /// Development version (lowest stability).
    Dev = 0,
    /// Alpha release.
    Alpha = 1,
    /// Beta release.
    Beta = 2,
    /// Release candidate.
    RC = 3,
    /// Stable release (highest stability).
    #[default]
    Stable = 4,
}

impl Stability {
    /// All levels from most to least stable.
    pub const ALL: [Self; 5] = [Self::Stable, Self::RC, Self::Beta, Self::Alpha, Self::Dev];

    /// Parse a stability name as written in manifests and `@flag` suffixes.
    ///
    /// Accepts the short modifiers `a`, `b` and `rc` as well.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Some(Self::Dev),
            "alpha" | "a" => Some(Self::Alpha),
            "beta" | "b" => Some(Self::Beta),
            "rc" => Some(Self::RC),
            "stable" => Some(Self::Stable),
            _ => None,
        }
    }

    /// Check if this stability is at least as stable as the minimum.
    #[must_use]
    #[inline]
    pub fn satisfies_minimum(&self, minimum: Self) -> bool {
        *self >= minimum
    }

    /// Name as Composer writes it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::RC => "RC",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid stability: {s}"))
    }
}

impl Serialize for Stability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Stability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid stability: {s}")))
    }
}
