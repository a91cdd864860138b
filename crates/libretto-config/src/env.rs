//! Environment variable configuration support.

use crate::error::{ConfigError, Result};
use libretto_core::Stability;
use std::path::PathBuf;

/// Composer environment variables that affect requirement resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposerEnvVar {
    /// COMPOSER - manifest file name or path.
    Composer,
    /// `COMPOSER_HOME` - global configuration directory.
    Home,
    /// `COMPOSER_NO_INTERACTION` - non-interactive mode.
    NoInteraction,
    /// `COMPOSER_IGNORE_PLATFORM_REQS` - ignore every platform requirement.
    IgnorePlatformReqs,
    /// `COMPOSER_IGNORE_PLATFORM_REQ` - comma-separated requirements to ignore.
    IgnorePlatformReq,
    /// `COMPOSER_PREFER_STABLE` - prefer stable versions.
    PreferStable,
    /// `COMPOSER_MINIMUM_STABILITY` - stability floor.
    MinimumStability,
}

impl ComposerEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Composer => "COMPOSER",
            Self::Home => "COMPOSER_HOME",
            Self::NoInteraction => "COMPOSER_NO_INTERACTION",
            Self::IgnorePlatformReqs => "COMPOSER_IGNORE_PLATFORM_REQS",
            Self::IgnorePlatformReq => "COMPOSER_IGNORE_PLATFORM_REQ",
            Self::PreferStable => "COMPOSER_PREFER_STABLE",
            Self::MinimumStability => "COMPOSER_MINIMUM_STABILITY",
        }
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Environment configuration reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Path to composer.json.
    pub composer: Option<PathBuf>,
    /// `COMPOSER_HOME` directory.
    pub home: Option<PathBuf>,
    /// Non-interactive mode.
    pub no_interaction: bool,
    /// Ignore all platform requirements.
    pub ignore_platform_reqs: bool,
    /// Platform requirements to ignore.
    pub ignore_platform_req: Vec<String>,
    /// Prefer stable versions.
    pub prefer_stable: Option<bool>,
    /// Minimum stability override.
    pub minimum_stability: Option<Stability>,
}

impl EnvConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: ComposerEnvVar| lookup(var.as_str()).filter(|v| !v.is_empty());

        let minimum_stability = get(ComposerEnvVar::MinimumStability)
            .map(|value| {
                Stability::parse(&value).ok_or_else(|| ConfigError::EnvError {
                    var: ComposerEnvVar::MinimumStability.as_str().to_string(),
                    message: format!("unknown stability '{value}', expected one of dev, alpha, beta, RC, stable"),
                })
            })
            .transpose()?;

        Ok(Self {
            composer: get(ComposerEnvVar::Composer).map(PathBuf::from),
            home: get(ComposerEnvVar::Home).map(PathBuf::from),
            no_interaction: get(ComposerEnvVar::NoInteraction).is_some_and(|v| truthy(&v)),
            ignore_platform_reqs: get(ComposerEnvVar::IgnorePlatformReqs).is_some_and(|v| truthy(&v)),
            ignore_platform_req: get(ComposerEnvVar::IgnorePlatformReq)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            prefer_stable: get(ComposerEnvVar::PreferStable).map(|v| truthy(&v)),
            minimum_stability,
        })
    }

    /// Check if running in non-interactive mode.
    #[must_use]
    pub const fn is_non_interactive(&self) -> bool {
        self.no_interaction
    }
}
