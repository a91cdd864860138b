//! Layered configuration for Libretto.
//!
//! Settings are merged from, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. The global `config.json` in `COMPOSER_HOME`
//! 3. The project manifest (`composer.json` or `$COMPOSER`)
//! 4. `COMPOSER_*` environment variables
//! 5. Command-line flags

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use env::{ComposerEnvVar, EnvConfig};
pub use error::{ConfigError, Result};
pub use loader::{CliOverrides, ConfigLoader, ConfigSource};
pub use types::{
    ComposerConfig, ComposerManifest, GlobalConfigFile, PlatformValue, PreferredInstall,
    PreferredInstallConfig, Repositories, RepositoryConfig, RepositoryDefinition, RepositoryType,
    ResolvedConfig,
};
