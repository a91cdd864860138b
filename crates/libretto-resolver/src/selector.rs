//! Best-candidate selection.

use crate::constraint::{ComposerConstraint, ConstraintParseError};
use crate::package::PackageHandle;
use crate::platform::{PlatformRepository, PlatformRequirementFilter, is_platform_package};
use crate::pool::{Candidate, PoolFlags, RepositorySet};
use crate::version::ComposerVersion;
use ahash::AHashSet;
use libretto_core::Stability;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Picks the version to install for a package name.
///
/// Stateless per call: the repository set and platform snapshot are fixed at
/// construction.
#[derive(Debug, Clone)]
pub struct VersionSelector {
    repository_set: Arc<RepositorySet>,
    platform: BTreeMap<String, Vec<ComposerVersion>>,
}

impl VersionSelector {
    /// Selector over `repository_set`, checking platform requirements
    /// against `platform` when given.
    #[must_use]
    pub fn new(repository_set: Arc<RepositorySet>, platform: Option<&PlatformRepository>) -> Self {
        Self {
            repository_set,
            platform: platform.map(PlatformRepository::provided_versions).unwrap_or_default(),
        }
    }

    /// Repository set being searched.
    #[must_use]
    pub fn repository_set(&self) -> &RepositorySet {
        &self.repository_set
    }

    /// Best version of `name`, or `None` when nothing qualifies.
    ///
    /// Candidates at least as stable as `preferred_stability` rank first,
    /// newest first; ties keep real packages ahead of aliases and earlier
    /// repositories ahead of later ones. A candidate is skipped when one of
    /// its platform requirements is neither ignored nor satisfied.
    pub fn find_best_candidate(
        &self,
        name: &str,
        target: Option<&str>,
        preferred_stability: Stability,
        platform_filter: &PlatformRequirementFilter,
        flags: PoolFlags,
    ) -> Result<Option<PackageHandle>, ConstraintParseError> {
        let constraint = target.map(ComposerConstraint::parse).transpose()?;
        Ok(self.find_best_matching(name, constraint.as_ref(), preferred_stability, platform_filter, flags))
    }

    /// [`Self::find_best_candidate`] with an already parsed constraint.
    #[must_use]
    pub fn find_best_matching(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
        preferred_stability: Stability,
        platform_filter: &PlatformRequirementFilter,
        flags: PoolFlags,
    ) -> Option<PackageHandle> {
        let pool = self.repository_set.find_packages(name, constraint, flags);
        let mut candidates: Vec<&Candidate> = pool.candidates().iter().collect();
        candidates.sort_by(|a, b| compare_candidates(a, b, preferred_stability));

        let mut warned = AHashSet::new();
        let selected = candidates
            .into_iter()
            .find(|candidate| self.platform_allows(&candidate.package, platform_filter, &mut warned))?;

        let package = match selected.package.alias_of() {
            Some(real) if selected.package.version().is_default_branch_alias() => real.clone(),
            _ => selected.package.clone(),
        };
        debug!(package = %name, selected = %package, "selected candidate");
        Some(package)
    }

    fn platform_allows(
        &self,
        package: &PackageHandle,
        filter: &PlatformRequirementFilter,
        warned: &mut AHashSet<String>,
    ) -> bool {
        for link in package.requires() {
            let target = &*link.target;
            if !is_platform_package(target) || filter.is_ignored(target) {
                continue;
            }

            let reason = match self.platform.get(target) {
                Some(provided) => {
                    let satisfied = provided.iter().any(|version| {
                        link.constraint.matches(version)
                            || (filter.is_upper_bound_ignored(target)
                                && filter.filter_constraint(target, &link.constraint).matches(version))
                    });
                    if satisfied {
                        continue;
                    }
                    "is not satisfied by your platform"
                }
                None => "is missing from your platform",
            };

            if warned.insert(package.name().to_string()) {
                warn!(
                    "cannot use {} {} as it requires {} {} which {}",
                    package.pretty_name(),
                    package.pretty_version(),
                    target,
                    link.constraint.pretty(),
                    reason
                );
            } else {
                debug!(
                    package = %package.pretty_name(),
                    version = %package.pretty_version(),
                    requirement = %target,
                    reason,
                    "candidate rejected by platform"
                );
            }
            return false;
        }
        true
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate, preferred: Stability) -> Ordering {
    let rank = |c: &Candidate| c.package.stability().min(preferred);
    Reverse(rank(a))
        .cmp(&Reverse(rank(b)))
        .then_with(|| b.package.version().cmp(a.package.version()))
        .then_with(|| a.package.is_alias().cmp(&b.package.is_alias()))
        .then_with(|| a.priority.cmp(&b.priority))
}
