//! Error types for Libretto operations.
//!
//! Each error has:
//! - A unique error code (e.g., E0101) for easy reference and searching
//! - A clear error message explaining what went wrong
//! - Suggestions for how to fix the issue

use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for Libretto errors.
///
/// These codes make it easy to search for solutions and reference specific errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Package errors (E01xx)
    /// Package not found in any repository
    E0101,
    /// Version constraint cannot be satisfied
    E0102,
    /// Invalid package name format
    E0104,
    /// Package only exists below the minimum stability
    E0105,
    /// Canonical repository shadows a lower priority match
    E0106,

    // Repository errors (E03xx)
    /// Repository unreachable or unreadable
    E0302,

    // Manifest errors (E04xx)
    /// Invalid composer.json
    E0401,
    /// Invalid JSON syntax
    E0403,
    /// Invalid version constraint format
    E0404,

    // IO errors (E05xx)
    /// File not found
    E0501,
    /// Permission denied
    E0502,
    /// File already exists
    E0505,

    // Configuration errors (E11xx)
    /// Invalid configuration
    E1101,

    // Platform errors (E12xx)
    /// PHP version mismatch
    E1202,
    /// Extension not available
    E1203,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0104 => "E0104",
            Self::E0105 => "E0105",
            Self::E0106 => "E0106",
            Self::E0302 => "E0302",
            Self::E0401 => "E0401",
            Self::E0403 => "E0403",
            Self::E0404 => "E0404",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E0505 => "E0505",
            Self::E1101 => "E1101",
            Self::E1202 => "E1202",
            Self::E1203 => "E1203",
        }
    }

    /// Get a brief title for this error code.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Package not found",
            Self::E0102 => "Version not satisfiable",
            Self::E0104 => "Invalid package name",
            Self::E0105 => "Stability mismatch",
            Self::E0106 => "Repository shadowing conflict",
            Self::E0302 => "Repository unreachable",
            Self::E0401 => "Invalid manifest",
            Self::E0403 => "JSON syntax error",
            Self::E0404 => "Invalid version constraint",
            Self::E0501 => "File not found",
            Self::E0502 => "Permission denied",
            Self::E0505 => "File exists",
            Self::E1101 => "Invalid configuration",
            Self::E1202 => "PHP version mismatch",
            Self::E1203 => "Extension unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that carry a code and a list of remediation hints.
///
/// Implemented by every user-facing error type in the workspace so the
/// binary can render them the same way.
pub trait Diagnosable: fmt::Display {
    /// Stable error code.
    fn code(&self) -> ErrorCode;

    /// Hints for fixing the problem, most relevant first.
    fn suggestions(&self) -> &[String];

    /// Format the error with suggestions for display.
    fn display_with_suggestions(&self) -> String {
        let mut output = self.to_string();
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                let _ = write!(output, "\n  - {suggestion}");
            }
        }
        let _ = write!(
            output,
            "\n\nFor more info, see: https://libretto.dev/errors/{}",
            self.code()
        );
        output
    }
}

/// Main error type for Libretto infrastructure failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid manifest.
    #[error("[{code}] invalid manifest: {message}")]
    InvalidManifest {
        /// Error code.
        code: ErrorCode,
        /// Error message.
        message: String,
        /// File path.
        path: Option<PathBuf>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// JSON error.
    #[error("[E0403] json error: {0}")]
    Json(#[from] sonic_rs::Error),

    /// IO error.
    #[error("[{code}] io error at {path}: {message}")]
    Io {
        /// Error code.
        code: ErrorCode,
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// A repository could not be read.
    #[error("[E0302] repository '{repository}' is unreachable: {message}")]
    Repository {
        /// Repository name or URL.
        repository: String,
        /// Error message.
        message: String,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },

    /// Configuration error.
    #[error("[E1101] config error: {message}")]
    Config {
        /// Error message.
        message: String,
        /// Configuration key.
        key: Option<String>,
        /// Suggestions for fixing.
        suggestions: Vec<String>,
    },
}

impl Diagnosable for Error {
    fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidManifest { code, .. } | Self::Io { code, .. } => *code,
            Self::Json(_) => ErrorCode::E0403,
            Self::Repository { .. } => ErrorCode::E0302,
            Self::Config { .. } => ErrorCode::E1101,
        }
    }

    fn suggestions(&self) -> &[String] {
        match self {
            Self::InvalidManifest { suggestions, .. }
            | Self::Io { suggestions, .. }
            | Self::Repository { suggestions, .. }
            | Self::Config { suggestions, .. } => suggestions,
            Self::Json(_) => &[],
        }
    }
}

impl Error {
    /// Create an IO error with context.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let (code, suggestions) = match err.kind() {
            std::io::ErrorKind::NotFound => (
                ErrorCode::E0501,
                vec![
                    format!("Check if the path exists: {}", path.display()),
                    "Verify you're in the correct directory".to_string(),
                ],
            ),
            std::io::ErrorKind::PermissionDenied => (
                ErrorCode::E0502,
                vec![
                    format!("Check permissions on: {}", path.display()),
                    "On Unix, check file ownership with 'ls -la'".to_string(),
                ],
            ),
            std::io::ErrorKind::AlreadyExists => (
                ErrorCode::E0505,
                vec![format!("File already exists: {}", path.display())],
            ),
            _ => (
                ErrorCode::E0501,
                vec![format!("Check the file: {}", path.display())],
            ),
        };
        Self::Io {
            code,
            path,
            message: err.to_string(),
            suggestions,
        }
    }

    /// Create an invalid manifest error.
    #[must_use]
    pub fn invalid_manifest(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        let message = message.into();
        let mut suggestions = vec!["Check JSON syntax with a JSON validator".to_string()];
        if let Some(ref p) = path {
            suggestions.push(format!("Edit the file: {}", p.display()));
        }
        Self::InvalidManifest {
            code: ErrorCode::E0401,
            message,
            path,
            suggestions,
        }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(repository: impl Into<String>, message: impl Into<String>) -> Self {
        let repository = repository.into();
        Self::Repository {
            suggestions: vec![
                format!("Check the repository definition for '{repository}'"),
                "Run with -vvv to see which file or URL was read".to_string(),
            ],
            repository,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>, key: Option<String>) -> Self {
        let mut suggestions = vec!["Check your composer.json 'config' section".to_string()];
        if let Some(ref k) = key {
            suggestions.insert(0, format!("Review the value of '{k}'"));
        }
        Self::Config {
            message: message.into(),
            key,
            suggestions,
        }
    }
}

/// Result type for Libretto operations.
pub type Result<T> = std::result::Result<T, Error>;
