//! Safe editing of Composer manifests.
//!
//! [`ManifestDocument`] edits the `require`/`require-dev` sections while
//! keeping key order and indentation, [`ManifestTransaction`] wraps a
//! read-modify-write cycle with a backup that is restored unless the
//! caller commits, and [`LockFile`] reads installed versions from
//! `composer.lock`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod atomic;
pub mod document;
pub mod error;
pub mod lock;
pub mod transaction;

pub use atomic::{AtomicWriter, WriteResult};
pub use document::{LinkSection, ManifestDocument};
pub use error::{ManifestError, Result};
pub use lock::LockFile;
pub use transaction::{ManifestSnapshot, ManifestTransaction, RevertGuard};
