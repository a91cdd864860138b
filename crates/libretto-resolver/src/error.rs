//! Resolution errors.
//!
//! Every variant except [`ResolveError::Repository`] describes an expected
//! outcome the command layer reports and recovers from.

use crate::constraint::ConstraintParseError;
use libretto_core::{Diagnosable, ErrorCode, Stability};
use thiserror::Error;

/// Why a requirement could not be turned into a package and constraint.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No repository lists the name in any version.
    #[error("[E0101] could not find package {name}{}", did_you_mean(.similar))]
    PackageNotFound {
        /// Requested name.
        name: String,
        /// Similar names from the configured repositories.
        similar: Vec<String>,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// Only versions below the stability floor exist.
    #[error(
        "[E0105] could not find a version of package {name} matching your minimum-stability ({minimum}); the best candidate is {found}"
    )]
    StabilityMismatch {
        /// Requested name.
        name: String,
        /// Effective minimum stability.
        minimum: Stability,
        /// Stability of the best version found with the floor lifted.
        found: Stability,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// Every otherwise acceptable version needs a platform the environment lacks.
    #[error(
        "[E1202] {}{}",
        platform_headline(.name, .constraint.as_deref()),
        platform_details(.details, .stability_note.as_deref())
    )]
    PlatformMismatch {
        /// Requested name.
        name: String,
        /// Requested constraint, if any.
        constraint: Option<String>,
        /// One line per failing platform requirement of the best candidate.
        details: Vec<String>,
        /// Extra note when the package also fails the stability floor.
        stability_note: Option<String>,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// The package exists but no version matches the requested constraint.
    #[error("[E0102] could not find a version of package {name} matching {constraint}; available versions: {}", .available.join(", "))]
    ConstraintUnsatisfiable {
        /// Requested name.
        name: String,
        /// Requested constraint.
        constraint: String,
        /// Versions that do exist, newest first.
        available: Vec<String>,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// A canonical repository hides versions a lower-priority repository has.
    #[error(
        "[E0106] package {name} exists in {canonical} and {shadowed}, which has a lower repository priority; {canonical} is canonical so packages from {shadowed} are not installable"
    )]
    RepositoryShadowConflict {
        /// Requested name.
        name: String,
        /// Higher-priority canonical repository.
        canonical: String,
        /// Lower-priority repository that would have matched.
        shadowed: String,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// The requested constraint does not parse.
    #[error("[E0404] invalid version constraint for {name}: {source}")]
    InvalidConstraintSyntax {
        /// Package the constraint was given for.
        name: String,
        /// Parser error.
        #[source]
        source: ConstraintParseError,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// A requirement token is not a valid package reference.
    #[error("[E0104] invalid requirement '{token}': {reason}")]
    InvalidRequirement {
        /// The token as given.
        token: String,
        /// What is wrong with it.
        reason: String,
        /// Hints.
        suggestions: Vec<String>,
    },

    /// A repository could not be read.
    #[error(transparent)]
    Repository(#[from] libretto_core::Error),
}

fn did_you_mean(similar: &[String]) -> String {
    match similar {
        [] => String::new(),
        [one] => format!("; did you mean {one}?"),
        many => format!("; did you mean one of these? {}", many.join(", ")),
    }
}

fn platform_headline(name: &str, constraint: Option<&str>) -> String {
    match constraint {
        Some(constraint) => format!(
            "package {name} at version {constraint} has requirements incompatible with your PHP version, PHP extensions and Composer version"
        ),
        None => format!(
            "could not find package {name} in any version matching your PHP version, PHP extensions and Composer version"
        ),
    }
}

fn platform_details(details: &[String], stability_note: Option<&str>) -> String {
    let mut out = String::new();
    for line in details {
        out.push_str("\n  - ");
        out.push_str(line);
    }
    if let Some(note) = stability_note {
        out.push_str("\n\n");
        out.push_str(note);
    }
    out
}

impl ResolveError {
    /// Package missing everywhere.
    #[must_use]
    pub fn package_not_found(name: &str, minimum: Stability, similar: Vec<String>) -> Self {
        let mut suggestions = Vec::new();
        if similar.is_empty() {
            suggestions.push("Check the package spelling".to_string());
            suggestions.push(format!(
                "Check that the package is available in a stability which matches your minimum-stability ({minimum})"
            ));
        } else {
            suggestions.extend(similar.iter().map(|s| format!("Did you mean {s}?")));
        }
        Self::PackageNotFound {
            name: name.to_string(),
            similar,
            suggestions,
        }
    }

    /// Package only available below the stability floor.
    #[must_use]
    pub fn stability_mismatch(name: &str, minimum: Stability, found: Stability) -> Self {
        Self::StabilityMismatch {
            name: name.to_string(),
            minimum,
            found,
            suggestions: vec![
                format!("Require it with an explicit stability flag, e.g. {name}:@{found}"),
                format!("Lower minimum-stability to \"{found}\" in composer.json"),
            ],
        }
    }

    /// Package blocked by platform requirements.
    #[must_use]
    pub fn platform_mismatch(
        name: &str,
        constraint: Option<&str>,
        details: Vec<String>,
        stability_note: Option<String>,
    ) -> Self {
        Self::PlatformMismatch {
            name: name.to_string(),
            constraint: constraint.map(str::to_string),
            details,
            stability_note,
            suggestions: vec![
                "Check your PHP version with 'php -v' and loaded extensions with 'php -m'".to_string(),
                "Use --ignore-platform-req=NAME to ignore a single requirement".to_string(),
            ],
        }
    }

    /// No version matches the requested constraint.
    #[must_use]
    pub fn constraint_unsatisfiable(name: &str, constraint: &str, available: Vec<String>) -> Self {
        let mut suggestions = vec![format!("Loosen the constraint '{constraint}'")];
        if let Some(latest) = available.first() {
            suggestions.push(format!("The newest available version is {latest}"));
        }
        Self::ConstraintUnsatisfiable {
            name: name.to_string(),
            constraint: constraint.to_string(),
            available,
            suggestions,
        }
    }

    /// Canonical repository shadowing.
    #[must_use]
    pub fn repository_shadow_conflict(name: &str, canonical: &str, shadowed: &str) -> Self {
        Self::RepositoryShadowConflict {
            name: name.to_string(),
            canonical: canonical.to_string(),
            shadowed: shadowed.to_string(),
            suggestions: vec![
                format!("Mark the repository {canonical} as \"canonical\": false to let lower-priority repositories provide {name}"),
                "See https://getcomposer.org/repoprio for details".to_string(),
            ],
        }
    }

    /// Constraint that does not parse.
    #[must_use]
    pub fn invalid_constraint(name: &str, source: ConstraintParseError) -> Self {
        Self::InvalidConstraintSyntax {
            name: name.to_string(),
            source,
            suggestions: vec!["See https://getcomposer.org/doc/articles/versions.md for the constraint syntax".to_string()],
        }
    }

    /// Malformed requirement token.
    #[must_use]
    pub fn invalid_requirement(token: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRequirement {
            token: token.to_string(),
            reason: reason.into(),
            suggestions: vec!["Use the form vendor/package or vendor/package:constraint".to_string()],
        }
    }

    /// Whether this error aborts the command regardless of the requirement.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

impl Diagnosable for ResolveError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::PackageNotFound { .. } => ErrorCode::E0101,
            Self::ConstraintUnsatisfiable { .. } => ErrorCode::E0102,
            Self::InvalidRequirement { .. } => ErrorCode::E0104,
            Self::StabilityMismatch { .. } => ErrorCode::E0105,
            Self::RepositoryShadowConflict { .. } => ErrorCode::E0106,
            Self::InvalidConstraintSyntax { .. } => ErrorCode::E0404,
            Self::PlatformMismatch { .. } => ErrorCode::E1202,
            Self::Repository(err) => err.code(),
        }
    }

    fn suggestions(&self) -> &[String] {
        match self {
            Self::PackageNotFound { suggestions, .. }
            | Self::StabilityMismatch { suggestions, .. }
            | Self::PlatformMismatch { suggestions, .. }
            | Self::ConstraintUnsatisfiable { suggestions, .. }
            | Self::RepositoryShadowConflict { suggestions, .. }
            | Self::InvalidConstraintSyntax { suggestions, .. }
            | Self::InvalidRequirement { suggestions, .. } => suggestions,
            Self::Repository(err) => err.suggestions(),
        }
    }
}

/// Result alias for resolution.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
