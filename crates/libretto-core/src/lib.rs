//! Core types and utilities for Libretto package manager.
//!
//! This crate provides foundational types used throughout Libretto:
//! - Package stability levels
//! - High-performance JSON operations
//! - Error codes and the infrastructure error type

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
mod json;
mod stability;

pub use error::{Diagnosable, Error, ErrorCode, Result};
pub use json::{from_json, from_json_slice, to_json, to_json_pretty};
pub use stability::Stability;

// Re-export commonly used types
pub use ahash::{AHashMap, AHashSet};

/// Global allocator using mimalloc for high performance.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
