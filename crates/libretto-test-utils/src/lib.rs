//! Testing utilities for Libretto.
//!
//! # Modules
//!
//! - [`fixtures`]: package listings and manifests for common scenarios
//! - [`temp_project`]: temporary project directories with a local repository
//! - [`proptest_strategies`]: proptest strategies for versions, constraints and names
//!
//! # Example
//!
//! ```rust,no_run
//! use libretto_test_utils::fixtures::{Fixtures, PackageListing};
//! use libretto_test_utils::temp_project::TempProject;
//!
//! let project = TempProject::new()
//!     .with_composer_json(&Fixtures::simple_composer_json())
//!     .with_packages(PackageListing::new().version("acme/tool", "1.4.2"))
//!     .build()
//!     .unwrap();
//! assert!(project.composer_json_path().exists());
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fixtures;
pub mod proptest_strategies;
pub mod temp_project;

/// Re-export commonly used testing utilities.
pub mod prelude {
    pub use crate::fixtures::{Fixtures, PackageListing};
    pub use crate::proptest_strategies::*;
    pub use crate::temp_project::TempProject;
    pub use proptest::prelude::*;
}
