//! Candidate lookup across prioritised repositories.
//!
//! A [`RepositorySet`] is the ordered list of repositories a command may
//! install from plus the stability policy. Lookups return a
//! [`CandidatePool`]: the matching package versions in priority order,
//! each tagged with where it came from.

use crate::constraint::ComposerConstraint;
use crate::package::PackageHandle;
use crate::repository::{Provider, Repository};
use crate::stability::{StabilityFlags, is_acceptable};
use dashmap::DashMap;
use libretto_core::{AHashSet, Stability};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Relaxations used when re-querying for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PoolFlags {
    /// Return versions below the stability floor.
    pub allow_unacceptable_stabilities: bool,
    /// Keep looking past canonical repositories that list the name.
    pub allow_shadowed_repositories: bool,
}

impl PoolFlags {
    /// Normal lookup.
    pub const NONE: Self = Self {
        allow_unacceptable_stabilities: false,
        allow_shadowed_repositories: false,
    };

    /// Ignore the stability floor.
    pub const ALLOW_UNACCEPTABLE_STABILITIES: Self = Self {
        allow_unacceptable_stabilities: true,
        allow_shadowed_repositories: false,
    };

    /// Ignore canonical repository shadowing.
    pub const ALLOW_SHADOWED_REPOSITORIES: Self = Self {
        allow_unacceptable_stabilities: false,
        allow_shadowed_repositories: true,
    };
}

/// One package version found in a repository set.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// The package or alias.
    pub package: PackageHandle,
    /// Name of the repository it was found in.
    pub repository: Arc<str>,
    /// Position of that repository; lower wins.
    pub priority: usize,
    /// Canonical higher-priority repository that lists the same name, if any.
    pub shadowed_by: Option<Arc<str>>,
}

impl Candidate {
    /// Whether a canonical repository with higher priority hides this candidate.
    #[must_use]
    pub const fn is_shadowed(&self) -> bool {
        self.shadowed_by.is_some()
    }
}

/// Result of a repository set lookup, in repository priority order.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    /// Pool from already collected candidates, dropping duplicates.
    #[must_use]
    pub fn new(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let mut pool = Self::default();
        for candidate in candidates {
            pool.push(candidate);
        }
        pool
    }

    fn push(&mut self, candidate: Candidate) {
        let duplicate = self.candidates.iter().any(|existing| {
            existing.repository == candidate.repository && existing.package.same_as(&candidate.package)
        });
        if !duplicate {
            self.candidates.push(candidate);
        }
    }

    /// Candidates in priority order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Package handles in priority order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageHandle> {
        self.candidates.iter().map(|c| &c.package)
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Names of the repositories that contributed, in priority order.
    #[must_use]
    pub fn repositories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for candidate in &self.candidates {
            if !seen.contains(&&*candidate.repository) {
                seen.push(&*candidate.repository);
            }
        }
        seen
    }
}

impl IntoIterator for CandidatePool {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

type QueryKey = (String, Option<String>, PoolFlags);

/// Ordered repositories plus the stability policy they are read with.
pub struct RepositorySet {
    minimum_stability: Stability,
    stability_flags: StabilityFlags,
    repositories: Vec<Arc<dyn Repository>>,
    cache: DashMap<QueryKey, Arc<CandidatePool>>,
}

impl fmt::Debug for RepositorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositorySet")
            .field("minimum_stability", &self.minimum_stability)
            .field("stability_flags", &self.stability_flags)
            .field(
                "repositories",
                &self.repositories.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl RepositorySet {
    /// Empty set with a stability floor.
    #[must_use]
    pub fn new(minimum_stability: Stability) -> Self {
        Self {
            minimum_stability,
            stability_flags: StabilityFlags::new(),
            repositories: Vec::new(),
            cache: DashMap::new(),
        }
    }

    /// Use per-package stability overrides.
    #[must_use]
    pub fn with_stability_flags(mut self, flags: StabilityFlags) -> Self {
        self.stability_flags = flags;
        self.cache.clear();
        self
    }

    /// Append a repository with the lowest priority so far.
    pub fn add_repository(&mut self, repository: Arc<dyn Repository>) {
        self.repositories.push(repository);
        self.cache.clear();
    }

    /// Stability floor.
    #[must_use]
    pub const fn minimum_stability(&self) -> Stability {
        self.minimum_stability
    }

    /// Per-package overrides.
    #[must_use]
    pub const fn stability_flags(&self) -> &StabilityFlags {
        &self.stability_flags
    }

    /// Repositories in priority order.
    #[must_use]
    pub fn repositories(&self) -> &[Arc<dyn Repository>] {
        &self.repositories
    }

    /// Whether a version with these names and stability passes the policy.
    ///
    /// Each name is checked against its own override, falling back to the
    /// minimum; one accepting name is enough.
    #[must_use]
    pub fn is_package_acceptable(&self, names: &[&str], stability: Stability) -> bool {
        names.iter().any(|name| {
            is_acceptable(stability, self.minimum_stability, self.stability_flags.get(name))
        })
    }

    fn is_handle_acceptable(&self, package: &PackageHandle) -> bool {
        self.is_package_acceptable(&package.names(), package.stability())
    }

    /// Every version of `name` the policy allows, in priority order.
    ///
    /// By default the lookup stops at the first canonical repository that
    /// lists the name in any version. When an alias matches, the package it
    /// aliases is returned too.
    pub fn find_packages(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
        flags: PoolFlags,
    ) -> Arc<CandidatePool> {
        let name = name.to_ascii_lowercase();
        let key = (name.clone(), constraint.map(ToString::to_string), flags);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit.value());
        }

        let pool = Arc::new(if flags.allow_shadowed_repositories {
            self.load_from_all(&name, constraint, flags)
        } else {
            self.load_until_canonical(&name, constraint, flags)
        });
        trace!(package = %name, candidates = pool.len(), ?flags, "repository set lookup");
        self.cache.insert(key, Arc::clone(&pool));
        pool
    }

    fn load_until_canonical(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
        flags: PoolFlags,
    ) -> CandidatePool {
        let mut pool = CandidatePool::default();
        for (priority, repository) in self.repositories.iter().enumerate() {
            let repo_name: Arc<str> = Arc::from(repository.name());
            for package in repository.find_packages(name, constraint) {
                if !flags.allow_unacceptable_stabilities && !self.is_handle_acceptable(&package) {
                    continue;
                }
                let aliased = package.alias_of().cloned();
                pool.push(Candidate {
                    package,
                    repository: repo_name.clone(),
                    priority,
                    shadowed_by: None,
                });
                if let Some(real) = aliased {
                    pool.push(Candidate {
                        package: real,
                        repository: repo_name.clone(),
                        priority,
                        shadowed_by: None,
                    });
                }
            }
            if repository.is_canonical() && repository.has_package(name) {
                break;
            }
        }
        pool
    }

    fn load_from_all(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
        flags: PoolFlags,
    ) -> CandidatePool {
        let mut pool = CandidatePool::default();
        let mut shadowed_by: Option<Arc<str>> = None;
        for (priority, repository) in self.repositories.iter().enumerate() {
            let repo_name: Arc<str> = Arc::from(repository.name());
            for package in repository.find_packages(name, constraint) {
                if !flags.allow_unacceptable_stabilities && !self.is_handle_acceptable(&package) {
                    continue;
                }
                pool.push(Candidate {
                    package,
                    repository: repo_name.clone(),
                    priority,
                    shadowed_by: shadowed_by.clone(),
                });
            }
            if shadowed_by.is_none() && repository.is_canonical() && repository.has_package(name) {
                shadowed_by = Some(repo_name);
            }
        }
        pool
    }

    /// First canonical repository listing `name`, if any.
    #[must_use]
    pub fn shadowing_repository(&self, name: &str) -> Option<&str> {
        self.repositories
            .iter()
            .find(|repo| repo.is_canonical() && repo.has_package(name))
            .map(|repo| repo.name())
    }

    /// Packages providing or replacing `name` across all repositories.
    #[must_use]
    pub fn find_providers(&self, name: &str) -> Vec<Provider> {
        let mut providers: Vec<Provider> = Vec::new();
        for repository in &self.repositories {
            for provider in repository.find_providers(name) {
                if !providers.iter().any(|p| p.package.same_as(&provider.package)) {
                    providers.push(provider);
                }
            }
        }
        providers
    }

    /// Every package name listed, sorted and deduplicated.
    #[must_use]
    pub fn package_names(&self) -> Vec<String> {
        let mut seen = AHashSet::new();
        let mut names: Vec<String> = self
            .repositories
            .iter()
            .flat_map(|repo| repo.package_names())
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::loader::PackageDefinition;
    use crate::repository::ArrayRepository;

    fn repo(name: &str, canonical: bool, json: &str) -> Arc<dyn Repository> {
        let defs: Vec<PackageDefinition> = sonic_rs::from_str(json).unwrap();
        Arc::new(ArrayRepository::from_definitions(name, &defs).canonical(canonical))
    }

    fn versions(pool: &CandidatePool) -> Vec<String> {
        pool.packages().map(|p| p.pretty_version().to_string()).collect()
    }

    mod stability {
        use super::*;

        fn set(minimum: Stability) -> RepositorySet {
            let mut set = RepositorySet::new(minimum);
            set.add_repository(repo(
                "main",
                true,
                r#"[
                    {"name": "foo/bar", "version": "1.0.0"},
                    {"name": "foo/bar", "version": "1.2.0"},
                    {"name": "foo/bar", "version": "2.0.0-beta"}
                ]"#,
            ));
            set
        }

        #[test]
        fn floor_filters_unstable_versions() {
            let pool = set(Stability::Stable).find_packages("foo/bar", None, PoolFlags::NONE);
            assert_eq!(versions(&pool), vec!["1.0.0", "1.2.0"]);

            let pool = set(Stability::Beta).find_packages("foo/bar", None, PoolFlags::NONE);
            assert_eq!(pool.len(), 3);
        }

        #[test]
        fn unacceptable_stabilities_flag_lifts_floor() {
            let pool = set(Stability::Stable).find_packages(
                "foo/bar",
                None,
                PoolFlags::ALLOW_UNACCEPTABLE_STABILITIES,
            );
            assert_eq!(pool.len(), 3);
        }

        #[test]
        fn per_package_flag_overrides_floor() {
            let mut flags = StabilityFlags::new();
            flags.insert("foo/bar", Stability::Beta);
            let set = set(Stability::Stable).with_stability_flags(flags);
            assert_eq!(set.find_packages("FOO/BAR", None, PoolFlags::NONE).len(), 3);
        }

        #[test]
        fn constraint_narrows_pool() {
            let constraint = ComposerConstraint::parse("~1.0.0").unwrap();
            let pool = set(Stability::Stable).find_packages("foo/bar", Some(&constraint), PoolFlags::NONE);
            assert_eq!(versions(&pool), vec!["1.0.0"]);
        }
    }

    mod priority {
        use super::*;

        fn two_repos(first_canonical: bool) -> RepositorySet {
            let mut set = RepositorySet::new(Stability::Stable);
            set.add_repository(repo(
                "r1",
                first_canonical,
                r#"[{"name": "foo/bar", "version": "1.0.0"}]"#,
            ));
            set.add_repository(repo(
                "r2",
                true,
                r#"[{"name": "foo/bar", "version": "2.0.0"},
                    {"name": "foo/baz", "version": "1.0.0"}]"#,
            ));
            set
        }

        #[test]
        fn canonical_repository_shadows_lower_priority() {
            let set = two_repos(true);
            let pool = set.find_packages("foo/bar", None, PoolFlags::NONE);
            assert_eq!(versions(&pool), vec!["1.0.0"]);
            assert_eq!(pool.repositories(), vec!["r1"]);

            let constraint = ComposerConstraint::parse("^2.0").unwrap();
            assert!(set.find_packages("foo/bar", Some(&constraint), PoolFlags::NONE).is_empty());
            assert_eq!(set.shadowing_repository("foo/bar"), Some("r1"));
        }

        #[test]
        fn shadowed_lookup_marks_hidden_candidates() {
            let set = two_repos(true);
            let pool = set.find_packages("foo/bar", None, PoolFlags::ALLOW_SHADOWED_REPOSITORIES);
            assert_eq!(pool.len(), 2);
            let candidates = pool.candidates();
            assert!(!candidates[0].is_shadowed());
            assert_eq!(candidates[1].shadowed_by.as_deref(), Some("r1"));
            assert_eq!(candidates[1].priority, 1);
        }

        #[test]
        fn non_canonical_repository_falls_through() {
            let set = two_repos(false);
            let pool = set.find_packages("foo/bar", None, PoolFlags::NONE);
            assert_eq!(versions(&pool), vec!["1.0.0", "2.0.0"]);
            assert_eq!(set.shadowing_repository("foo/bar"), Some("r2"));
        }

        #[test]
        fn missing_name_searches_every_repository() {
            let set = two_repos(true);
            let pool = set.find_packages("foo/baz", None, PoolFlags::NONE);
            assert_eq!(pool.repositories(), vec!["r2"]);
        }

        #[test]
        fn lookups_are_memoized() {
            let set = two_repos(true);
            let first = set.find_packages("foo/bar", None, PoolFlags::NONE);
            let second = set.find_packages("foo/bar", None, PoolFlags::NONE);
            assert!(Arc::ptr_eq(&first, &second));
        }

        #[test]
        fn names_are_merged() {
            assert_eq!(two_repos(true).package_names(), vec!["foo/bar", "foo/baz"]);
        }
    }

    mod aliases {
        use super::*;

        #[test]
        fn matching_alias_brings_its_target() {
            let mut set = RepositorySet::new(Stability::Dev);
            set.add_repository(repo(
                "main",
                true,
                r#"[{"name": "foo/bar", "version": "dev-main", "default-branch": true,
                     "extra": {"branch-alias": {"dev-main": "2.x-dev"}}}]"#,
            ));
            let constraint = ComposerConstraint::parse("^2.0@dev").unwrap();
            let pool = set.find_packages("foo/bar", Some(&constraint), PoolFlags::NONE);
            assert_eq!(pool.len(), 2);
            assert!(pool.candidates()[0].package.is_alias());
            assert_eq!(pool.candidates()[1].package.pretty_version(), "dev-main");
        }

        #[test]
        fn providers_are_collected_per_repository() {
            let mut set = RepositorySet::new(Stability::Stable);
            let listing = r#"[{"name": "monolog/monolog", "version": "3.0.0",
                               "provide": {"psr/log-implementation": "3.0.0"}}]"#;
            set.add_repository(repo("a", true, listing));
            set.add_repository(repo("b", true, listing));
            assert_eq!(set.find_providers("psr/log-implementation").len(), 2);
        }
    }
}
