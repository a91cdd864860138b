//! Requirement resolution and version selection for Composer manifests.
//!
//! Given the names a user asks for, this crate decides which package and
//! which constraint to record:
//!
//! - **Versions and constraints**: Composer's normalized four-segment
//!   versions, branch names and the full constraint grammar
//! - **Stability**: classification, `minimum-stability` and `@flag` overrides
//! - **Repositories**: priority-ordered lookups with canonical shadowing,
//!   local `packages.json` listings and lazily loaded HTTP repositories
//! - **Platform**: PHP, extensions and libraries, with ignore filters
//! - **Discovery**: best-version selection and typed explanations when
//!   nothing qualifies
//!
//! # Example
//!
//! ```
//! use libretto_resolver::{
//!     ArrayRepository, PlatformRepository, PlatformRequirementFilter, Repository, Resolver,
//!     ResolverSettings,
//! };
//! use libretto_resolver::loader::PackageDefinition;
//! use std::sync::Arc;
//!
//! let definitions: Vec<PackageDefinition> = libretto_core::from_json(
//!     r#"[{"name": "acme/tool", "version": "1.4.2"}, {"name": "acme/tool", "version": "1.3.0"}]"#,
//! )
//! .unwrap();
//! let repository: Arc<dyn Repository> =
//!     Arc::new(ArrayRepository::from_definitions("packagist", &definitions));
//!
//! let resolver = Resolver::new(
//!     vec![repository],
//!     Arc::new(PlatformRepository::new()),
//!     ResolverSettings::default(),
//! );
//! let (name, constraint) = resolver
//!     .find_best_version_and_name_for_package(
//!         "acme/tool",
//!         None,
//!         &PlatformRequirementFilter::IgnoreNothing,
//!         false,
//!     )
//!     .unwrap();
//! assert_eq!((name.as_str(), constraint.as_str()), ("acme/tool", "^1.4"));
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod constraint;
pub mod discovery;
pub mod error;
pub mod formatter;
pub mod http;
pub mod loader;
pub mod package;
pub mod platform;
pub mod pool;
pub mod repository;
pub mod selector;
pub mod stability;
pub mod version;

pub use constraint::{ComposerConstraint, ConstraintParseError};
pub use discovery::{
    Requirement, RequirementToken, Resolver, ResolverSettings, parse_name_version_pairs,
};
pub use error::{ResolveError, Result};
pub use formatter::{RequirementFormatter, VersionBumper};
pub use http::{HttpClient, HttpClientConfig, HttpComposerRepository, PACKAGIST_URL};
pub use loader::{InlinePackages, PackageDefinition, load_package};
pub use package::{Abandoned, Link, LinkKind, Package, PackageHandle, PackageName};
pub use platform::{
    PlatformRepository, PlatformRequirementFilter, PlatformSnapshot, is_platform_package,
};
pub use pool::{Candidate, CandidatePool, PoolFlags, RepositorySet};
pub use repository::{ArrayRepository, ComposerRepository, Provider, Repository};
pub use selector::VersionSelector;
pub use stability::{StabilityFlags, classify, is_acceptable};
pub use version::{ComposerVersion, DEFAULT_BRANCH_ALIAS, VersionParseError};

pub use libretto_core::Stability;
