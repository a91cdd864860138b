//! Requirement discovery: from what a user typed to what goes in the manifest.
//!
//! [`Resolver`] owns the configured repositories and platform and answers
//! "which package and which constraint" for each requested name. When no
//! candidate qualifies it re-queries with relaxed filters to explain why,
//! and never uses those relaxed results as an answer.

use crate::constraint::ComposerConstraint;
use crate::error::{ResolveError, Result};
use crate::formatter::RequirementFormatter;
use crate::package::{PackageHandle, is_valid_requirement_name};
use crate::platform::{PlatformRepository, PlatformRequirementFilter, is_platform_package};
use crate::pool::{PoolFlags, RepositorySet};
use crate::repository::Repository;
use crate::selector::VersionSelector;
use crate::stability::StabilityFlags;
use ahash::AHashSet;
use dashmap::DashMap;
use libretto_core::Stability;
use rayon::prelude::*;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static NAME_VERSION_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=: ]+)[=: ](.*)$").expect("valid regex"));

static NAME_WILDCARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[a-z0-9_/-]\*|\*[a-z0-9_/-]").expect("valid regex"));

static TOO_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("valid regex"));

/// Maximum number of "did you mean" suggestions.
const MAX_SUGGESTIONS: usize = 5;

/// Stability policy a [`Resolver`] works with.
#[derive(Debug, Clone, Default)]
pub struct ResolverSettings {
    /// Stability floor from `minimum-stability`.
    pub minimum_stability: Stability,
    /// Prefer stable versions even when less stable ones are allowed.
    pub prefer_stable: bool,
    /// Per-package overrides from the manifest's own requirements.
    pub stability_flags: StabilityFlags,
}

impl ResolverSettings {
    /// Stability candidates are ranked against.
    #[must_use]
    pub const fn preferred_stability(&self) -> Stability {
        if self.prefer_stable {
            Stability::Stable
        } else {
            self.minimum_stability
        }
    }
}

/// A package name with an optional constraint, as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementToken {
    /// Package name.
    pub name: String,
    /// Constraint, if one was given.
    pub version: Option<String>,
}

/// A resolved requirement ready to be written to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Package name as published.
    pub name: String,
    /// Constraint to record.
    pub constraint: String,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.constraint)
    }
}

type SetKey = (Stability, Option<(String, Stability)>);

/// Package discovery service.
pub struct Resolver {
    repositories: Vec<Arc<dyn Repository>>,
    platform: Arc<PlatformRepository>,
    settings: ResolverSettings,
    formatter: RequirementFormatter,
    sets: DashMap<SetKey, Arc<RepositorySet>>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field(
                "repositories",
                &self.repositories.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("settings", &self.settings)
            .field("cached_sets", &self.sets.len())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver over `repositories` in priority order, with the platform
    /// repository ahead of all of them.
    #[must_use]
    pub fn new(
        repositories: Vec<Arc<dyn Repository>>,
        platform: Arc<PlatformRepository>,
        settings: ResolverSettings,
    ) -> Self {
        let formatter = RequirementFormatter::new(platform.find_package("php").as_ref().map(PackageHandle::version));
        Self {
            repositories,
            platform,
            settings,
            formatter,
            sets: DashMap::new(),
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// The platform repository.
    #[must_use]
    pub fn platform(&self) -> &PlatformRepository {
        &self.platform
    }

    /// Repository set for a stability floor plus one extra override,
    /// built once and reused.
    pub fn repository_set(&self, minimum: Stability, extra_flag: Option<(&str, Stability)>) -> Arc<RepositorySet> {
        let key: SetKey = (minimum, extra_flag.map(|(name, s)| (name.to_ascii_lowercase(), s)));
        self.sets
            .entry(key)
            .or_insert_with(|| {
                let mut flags = self.settings.stability_flags.clone();
                if let Some((name, stability)) = extra_flag {
                    flags.insert(name, stability);
                }
                let mut set = RepositorySet::new(minimum).with_stability_flags(flags);
                set.add_repository(Arc::clone(&self.platform) as Arc<dyn Repository>);
                for repository in &self.repositories {
                    set.add_repository(Arc::clone(repository));
                }
                debug!(minimum = %minimum, repositories = set.repositories().len(), "built repository set");
                Arc::new(set)
            })
            .clone()
    }

    fn selector_for(&self, name: &str, required: Option<&str>) -> VersionSelector {
        let minimum = self.settings.minimum_stability;
        let extra = required.and_then(|constraint| {
            let mut flags = StabilityFlags::new();
            flags.extract(name, constraint, minimum);
            flags.get(name)
        });
        let set = self.repository_set(minimum, extra.map(|s| (name, s)));
        VersionSelector::new(set, Some(&self.platform))
    }

    /// Best installable version of `name`, if any.
    pub fn find_best_candidate(
        &self,
        name: &str,
        required: Option<&str>,
        platform_filter: &PlatformRequirementFilter,
    ) -> Result<Option<PackageHandle>> {
        let constraint = parse_required(name, required)?;
        Ok(self.selector_for(name, required).find_best_matching(
            name,
            constraint.as_ref(),
            self.settings.preferred_stability(),
            platform_filter,
            PoolFlags::NONE,
        ))
    }

    /// Constraint to record for `package`.
    #[must_use]
    pub fn find_recommended_require_version(&self, package: &PackageHandle) -> String {
        self.formatter.recommended_require_version(package)
    }

    /// Published name and constraint to record for a requested package.
    ///
    /// With `fixed` the exact version is recorded instead of a range.
    pub fn find_best_version_and_name_for_package(
        &self,
        name: &str,
        required: Option<&str>,
        platform_filter: &PlatformRequirementFilter,
        fixed: bool,
    ) -> Result<(String, String)> {
        let as_given = || (name.to_string(), required.unwrap_or("*").to_string());
        let constraint = parse_required(name, required)?;
        let constraint = constraint.as_ref();
        let selector = self.selector_for(name, required);
        let preferred = self.settings.preferred_stability();
        let minimum = self.settings.minimum_stability;
        let ignore_all = PlatformRequirementFilter::IgnoreAll;
        let find = |c: Option<&ComposerConstraint>, filter: &PlatformRequirementFilter, flags: PoolFlags| {
            selector.find_best_matching(name, c, preferred, filter, flags)
        };

        if let Some(package) = find(constraint, platform_filter, PoolFlags::NONE) {
            let version = if fixed {
                package.pretty_version().to_string()
            } else {
                self.find_recommended_require_version(&package)
            };
            info!(package = %package.pretty_name(), version = %version, "using version");
            return Ok((package.pretty_name().to_string(), version));
        }

        // the platform only offers its installed version, so trust the caller
        if platform_filter.is_ignored(name) {
            return Ok(as_given());
        }

        if !selector.repository_set().find_providers(name).is_empty() {
            debug!(package = %name, "virtual package provided by other packages");
            return Ok(as_given());
        }

        if !platform_filter.is_ignore_all()
            && let Some(candidate) = find(constraint, &ignore_all, PoolFlags::NONE)
        {
            return Err(ResolveError::platform_mismatch(
                name,
                required,
                self.platform_details(&candidate),
                None,
            ));
        }

        if let Some(package) = find(constraint, platform_filter, PoolFlags::ALLOW_UNACCEPTABLE_STABILITIES) {
            if let Some(conflict) = self.shadow_conflict(&selector, name, constraint, platform_filter) {
                return Err(conflict);
            }
            return Err(ResolveError::stability_mismatch(name, minimum, package.stability()));
        }

        if let Some(required) = required
            && find(None, platform_filter, PoolFlags::NONE).is_some()
        {
            if let Some(conflict) = self.shadow_conflict(&selector, name, constraint, platform_filter) {
                return Err(conflict);
            }
            let mut available: Vec<PackageHandle> = selector
                .repository_set()
                .find_packages(name, None, PoolFlags::NONE)
                .packages()
                .filter(|p| !p.is_alias())
                .cloned()
                .collect();
            available.sort_by(|a, b| b.version().cmp(a.version()));
            return Err(ResolveError::constraint_unsatisfiable(
                name,
                required,
                available.iter().map(|p| p.pretty_version().to_string()).collect(),
            ));
        }

        if !platform_filter.is_ignore_all()
            && let Some(candidate) = find(None, &ignore_all, PoolFlags::ALLOW_UNACCEPTABLE_STABILITIES)
        {
            let note = find(None, &ignore_all, PoolFlags::NONE).is_none().then(|| {
                format!(
                    "Additionally, the package was only found with a stability of \"{}\" while your minimum stability is \"{minimum}\".",
                    candidate.stability()
                )
            });
            return Err(ResolveError::platform_mismatch(
                name,
                None,
                self.platform_details(&candidate),
                note,
            ));
        }

        Err(ResolveError::package_not_found(
            name,
            minimum,
            self.find_similar(selector.repository_set(), name),
        ))
    }

    fn shadow_conflict(
        &self,
        selector: &VersionSelector,
        name: &str,
        constraint: Option<&ComposerConstraint>,
        platform_filter: &PlatformRequirementFilter,
    ) -> Option<ResolveError> {
        let shadowed = selector.find_best_matching(
            name,
            constraint,
            self.settings.preferred_stability(),
            platform_filter,
            PoolFlags::ALLOW_SHADOWED_REPOSITORIES,
        )?;
        let canonical = selector.repository_set().shadowing_repository(name)?;
        let shadowed_repo = shadowed.repository()?;
        (canonical != shadowed_repo)
            .then(|| ResolveError::repository_shadow_conflict(name, canonical, shadowed_repo))
    }

    /// One line per platform requirement of `candidate` the platform fails.
    fn platform_details(&self, candidate: &PackageHandle) -> Vec<String> {
        let mut details = Vec::new();
        for link in candidate.requires() {
            let target = &*link.target;
            if !is_platform_package(target) {
                continue;
            }
            let prefix = format!(
                "{} {} requires {} {}",
                candidate.pretty_name(),
                candidate.pretty_version(),
                target,
                link.constraint.pretty()
            );
            match self.platform.find_package(target) {
                None if self.platform.is_disabled(target) => details.push(format!(
                    "{prefix} but it is disabled by your platform config. Enable it again with \"composer config platform.{target} --unset\"."
                )),
                None => details.push(format!("{prefix} but it is not present.")),
                Some(installed) if !link.constraint.matches(installed.version()) => {
                    let origin = installed
                        .resolve()
                        .description
                        .as_deref()
                        .map(|description| format!(" ({description})"))
                        .unwrap_or_default();
                    details.push(format!(
                        "{prefix} which does not match your installed version {}{origin}.",
                        installed.pretty_version()
                    ));
                }
                Some(_) => {}
            }
        }
        details
    }

    /// Package names close to `name`, closest first.
    fn find_similar(&self, set: &RepositorySet, name: &str) -> Vec<String> {
        let wanted = name.to_ascii_lowercase();
        let wanted_package = wanted.rsplit('/').next().unwrap_or(&wanted);
        let threshold = (wanted.len() / 3).max(3);

        let mut scored: Vec<(usize, String)> = set
            .package_names()
            .into_iter()
            .filter(|candidate| !is_platform_package(candidate))
            .filter_map(|candidate| {
                let lower = candidate.to_ascii_lowercase();
                if lower == wanted {
                    return None;
                }
                let distance = levenshtein_distance(&wanted, &lower);
                let same_package = lower.rsplit('/').next() == Some(wanted_package);
                (distance <= threshold || same_package).then_some((distance, candidate))
            })
            .collect();
        scored.sort();
        scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, name)| name).collect()
    }

    /// Resolve every requested package, in input order.
    ///
    /// Tokens may be `vendor/name`, `vendor/name:constraint`,
    /// `vendor/name=constraint`, `"vendor/name constraint"`, or a name
    /// followed by a separate constraint token. Requested constraints are
    /// kept as written; missing ones are filled with the recommended
    /// constraint (or the exact version with `fixed`).
    pub fn determine_requirements<S: AsRef<str>>(
        &self,
        tokens: &[S],
        platform_filter: &PlatformRequirementFilter,
        fixed: bool,
    ) -> Result<Vec<Requirement>> {
        let parsed = parse_name_version_pairs(tokens);

        let mut seen = AHashSet::new();
        for token in &parsed {
            if !is_valid_requirement_name(&token.name) {
                return Err(ResolveError::invalid_requirement(
                    &token.name,
                    "package names must look like vendor/package",
                ));
            }
            if !seen.insert(token.name.to_ascii_lowercase()) {
                return Err(ResolveError::invalid_requirement(
                    &token.name,
                    "the package is listed more than once",
                ));
            }
            if let Some(version) = &token.version
                && TOO_STRICT.is_match(version)
            {
                warn!(
                    "the \"{version}\" constraint for \"{}\" appears too strict and will likely not match what you want",
                    token.name
                );
            }
        }

        parsed
            .par_iter()
            .map(|token| {
                let (name, constraint) = self.find_best_version_and_name_for_package(
                    &token.name,
                    token.version.as_deref(),
                    platform_filter,
                    fixed,
                )?;
                Ok(Requirement {
                    name,
                    constraint: token.version.clone().unwrap_or(constraint),
                })
            })
            .collect::<Vec<Result<Requirement>>>()
            .into_iter()
            .collect()
    }
}

fn parse_required(name: &str, required: Option<&str>) -> Result<Option<ComposerConstraint>> {
    required
        .map(ComposerConstraint::parse)
        .transpose()
        .map_err(|err| ResolveError::invalid_constraint(name, err))
}

/// Split raw command-line tokens into names and optional constraints.
pub fn parse_name_version_pairs<S: AsRef<str>>(tokens: &[S]) -> Vec<RequirementToken> {
    let tokens: Vec<&str> = tokens.iter().map(|t| t.as_ref().trim()).collect();
    let mut result = Vec::with_capacity(tokens.len());
    let mut idx = 0;
    while idx < tokens.len() {
        let mut pair = NAME_VERSION_SEPARATOR.replace(tokens[idx], "$1 $2").into_owned();
        if !pair.contains(' ')
            && let Some(next) = tokens.get(idx + 1)
            && !next.contains('/')
            && !NAME_WILDCARD.is_match(next)
            && !is_platform_package(next)
        {
            pair.push(' ');
            pair.push_str(next);
            idx += 1;
        }
        match pair.split_once(' ') {
            Some((name, version)) => result.push(RequirementToken {
                name: name.to_string(),
                version: Some(version.trim().to_string()).filter(|v| !v.is_empty()),
            }),
            None => result.push(RequirementToken {
                name: pair,
                version: None,
            }),
        }
        idx += 1;
    }
    result
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (curr_row[j] + 1)
                .min(prev_row[j + 1] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::loader::PackageDefinition;
    use crate::platform::PlatformSnapshot;
    use crate::repository::ArrayRepository;
    use libretto_core::{Diagnosable, ErrorCode};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn repo(name: &str, canonical: bool, json: &str) -> Arc<dyn Repository> {
        let defs: Vec<PackageDefinition> = sonic_rs::from_str(json).unwrap();
        Arc::new(ArrayRepository::from_definitions(name, &defs).canonical(canonical))
    }

    fn platform(php: &str) -> Arc<PlatformRepository> {
        Arc::new(PlatformRepository::build(
            &PlatformSnapshot {
                php_version: Some(php.to_string()),
                extensions: BTreeMap::from([("json".to_string(), Some(php.to_string()))]),
                ..PlatformSnapshot::default()
            },
            Vec::<(String, Option<String>)>::new(),
        ))
    }

    fn resolver(repos: Vec<Arc<dyn Repository>>, minimum: Stability) -> Resolver {
        Resolver::new(
            repos,
            platform("8.2.4"),
            ResolverSettings {
                minimum_stability: minimum,
                ..ResolverSettings::default()
            },
        )
    }

    const CATALOG: &str = r#"[
        {"name": "foo/bar", "version": "1.0.0"},
        {"name": "foo/bar", "version": "1.2.0"},
        {"name": "foo/bar", "version": "2.0.0-beta"},
        {"name": "Acme/Logger", "version": "0.3.2"},
        {"name": "acme/unstable", "version": "dev-main"},
        {"name": "acme/unstable", "version": "1.0.0-alpha1"},
        {"name": "acme/modern", "version": "3.0.0", "require": {"php": "^8.3"}},
        {"name": "acme/modern", "version": "2.0.0", "require": {"php": ">=7.2", "ext-gd": "*"}},
        {"name": "acme/psr-impl", "version": "1.0.0", "provide": {"psr/log-implementation": "1.0.0"}},
        {"name": "symfony/console", "version": "6.4.1"},
        {"name": "symfony/process", "version": "6.4.0"}
    ]"#;

    fn lookup(resolver: &Resolver, name: &str, required: Option<&str>) -> Result<(String, String)> {
        resolver.find_best_version_and_name_for_package(
            name,
            required,
            &PlatformRequirementFilter::IgnoreNothing,
            false,
        )
    }

    mod happy_path {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn recommends_caret_of_best_version() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            assert_eq!(lookup(&r, "foo/bar", None).unwrap(), ("foo/bar".into(), "^1.2".into()));
            assert_eq!(
                lookup(&r, "acme/logger", None).unwrap(),
                ("Acme/Logger".into(), "^0.3.2".into())
            );
        }

        #[test]
        fn fixed_records_exact_version() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let found = r
                .find_best_version_and_name_for_package("foo/bar", None, &PlatformRequirementFilter::IgnoreNothing, true)
                .unwrap();
            assert_eq!(found.1, "1.2.0");
        }

        #[test]
        fn explicit_flag_lifts_stability_for_that_package() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            assert_eq!(lookup(&r, "acme/unstable", Some("dev-main")).unwrap().1, "dev-main");
            assert_eq!(lookup(&r, "foo/bar", Some("^2.0@beta")).unwrap().1, "^2.0@beta");
        }

        #[test]
        fn ignored_platform_names_are_taken_as_given() {
            let r = resolver(vec![], Stability::Stable);
            let filter = PlatformRequirementFilter::ignore_list(&["ext-imagick"]);
            assert_eq!(
                r.find_best_version_and_name_for_package("ext-imagick", None, &filter, false).unwrap(),
                ("ext-imagick".into(), "*".into())
            );
        }

        #[test]
        fn ignored_platform_names_prefer_the_installed_version() {
            let r = resolver(vec![], Stability::Stable);
            let filter = PlatformRequirementFilter::ignore_list(&["php"]);
            assert_eq!(
                r.find_best_version_and_name_for_package("php", None, &filter, false).unwrap(),
                ("php".into(), "^8.2".into())
            );
            assert_eq!(
                r.find_best_version_and_name_for_package("php", Some("^7.4"), &filter, false).unwrap(),
                ("php".into(), "^7.4".into())
            );
        }

        #[test]
        fn platform_packages_resolve_from_platform() {
            let r = resolver(vec![], Stability::Stable);
            assert_eq!(lookup(&r, "php", None).unwrap(), ("php".into(), "^8.2".into()));
            assert_eq!(lookup(&r, "ext-json", None).unwrap(), ("ext-json".into(), "*".into()));
        }

        #[test]
        fn virtual_packages_are_accepted() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            assert_eq!(
                lookup(&r, "psr/log-implementation", None).unwrap(),
                ("psr/log-implementation".into(), "*".into())
            );
        }

        #[test]
        fn repository_sets_are_memoized() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let a = r.repository_set(Stability::Stable, None);
            let b = r.repository_set(Stability::Stable, None);
            assert!(Arc::ptr_eq(&a, &b));
            let c = r.repository_set(Stability::Stable, Some(("foo/bar", Stability::Dev)));
            assert!(!Arc::ptr_eq(&a, &c));
        }
    }

    mod diagnostics {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn stability_mismatch_is_reported() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = lookup(&r, "acme/unstable", None).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0105);
            assert!(matches!(err, ResolveError::StabilityMismatch { found: Stability::Alpha, .. }));
        }

        #[test]
        fn platform_mismatch_lists_failing_requirements() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = lookup(&r, "acme/modern", None).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E1202);
            let ResolveError::PlatformMismatch { details, .. } = &err else {
                panic!("unexpected error {err}");
            };
            assert_eq!(
                details,
                &vec!["acme/modern 3.0.0 requires php ^8.3 which does not match your installed version 8.2.4.".to_string()]
            );

            let err = lookup(&r, "acme/modern", Some("^2.0")).unwrap_err();
            let ResolveError::PlatformMismatch { details, constraint, .. } = &err else {
                panic!("unexpected error {err}");
            };
            assert_eq!(constraint.as_deref(), Some("^2.0"));
            assert_eq!(details, &vec!["acme/modern 2.0.0 requires ext-gd * but it is not present.".to_string()]);
        }

        #[test]
        fn constraint_unsatisfiable_lists_versions() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = lookup(&r, "foo/bar", Some("^5.0")).unwrap_err();
            let ResolveError::ConstraintUnsatisfiable { available, .. } = &err else {
                panic!("unexpected error {err}");
            };
            assert_eq!(available, &vec!["1.2.0".to_string(), "1.0.0".to_string()]);
        }

        #[test]
        fn canonical_shadowing_is_a_conflict() {
            let r = resolver(
                vec![
                    repo("r1", true, r#"[{"name": "foo/bar", "version": "1.0.0"}]"#),
                    repo("r2", true, r#"[{"name": "foo/bar", "version": "2.0.0"}]"#),
                ],
                Stability::Stable,
            );
            assert_eq!(lookup(&r, "foo/bar", None).unwrap().1, "^1.0");
            let err = lookup(&r, "foo/bar", Some("^2.0")).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0106);
            let ResolveError::RepositoryShadowConflict { canonical, shadowed, .. } = &err else {
                panic!("unexpected error {err}");
            };
            assert_eq!((canonical.as_str(), shadowed.as_str()), ("r1", "r2"));
        }

        #[test]
        fn shadowed_stability_is_a_conflict() {
            let r = resolver(
                vec![
                    repo("r1", true, r#"[{"name": "foo/bar", "version": "2.0.0-beta1"}]"#),
                    repo("r2", true, r#"[{"name": "foo/bar", "version": "1.0.0"}]"#),
                ],
                Stability::Stable,
            );
            let err = lookup(&r, "foo/bar", None).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0106);
        }

        #[test]
        fn non_canonical_repository_falls_through() {
            let r = resolver(
                vec![
                    repo("r1", false, r#"[{"name": "foo/bar", "version": "1.0.0"}]"#),
                    repo("r2", true, r#"[{"name": "foo/bar", "version": "2.0.0"}]"#),
                ],
                Stability::Stable,
            );
            assert_eq!(lookup(&r, "foo/bar", Some("^2.0")).unwrap().0, "foo/bar");
            assert_eq!(lookup(&r, "foo/bar", None).unwrap().1, "^2.0");
        }

        #[test]
        fn unknown_package_suggests_similar_names() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = lookup(&r, "symfony/consle", None).unwrap_err();
            let ResolveError::PackageNotFound { similar, .. } = &err else {
                panic!("unexpected error {err}");
            };
            assert_eq!(similar.first().map(String::as_str), Some("symfony/console"));

            let err = lookup(&r, "zzz/qqqqqqqqqq", None).unwrap_err();
            assert!(matches!(&err, ResolveError::PackageNotFound { similar, .. } if similar.is_empty()));
        }

        #[test]
        fn invalid_constraint_is_typed() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = lookup(&r, "foo/bar", Some(">=")).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0404);
        }
    }

    mod requirements {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn name_version_pairs() {
            let parsed = parse_name_version_pairs(&[
                "foo/bar:^1.0",
                "baz/qux=2.*",
                "a/b 1.0",
                "c/d",
                "~3.0",
                "e/f",
                "php",
            ]);
            let expected = vec![
                RequirementToken { name: "foo/bar".into(), version: Some("^1.0".into()) },
                RequirementToken { name: "baz/qux".into(), version: Some("2.*".into()) },
                RequirementToken { name: "a/b".into(), version: Some("1.0".into()) },
                RequirementToken { name: "c/d".into(), version: Some("~3.0".into()) },
                RequirementToken { name: "e/f".into(), version: None },
                RequirementToken { name: "php".into(), version: None },
            ];
            assert_eq!(parsed, expected);
        }

        #[test]
        fn determines_in_input_order() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let reqs = r
                .determine_requirements(
                    &["symfony/process", "foo/bar:~1.0", "symfony/console"],
                    &PlatformRequirementFilter::IgnoreNothing,
                    false,
                )
                .unwrap();
            let rendered: Vec<String> = reqs.iter().map(ToString::to_string).collect();
            assert_eq!(rendered, vec!["symfony/process:^6.4", "foo/bar:~1.0", "symfony/console:^6.4"]);
        }

        #[test]
        fn rejects_duplicates_and_bad_names() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let filter = PlatformRequirementFilter::IgnoreNothing;
            let err = r.determine_requirements(&["foo/bar", "Foo/Bar:^1.0"], &filter, false).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0104);
            let err = r.determine_requirements(&["not a package"], &filter, false).unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0104);
        }

        #[test]
        fn first_failure_wins() {
            let r = resolver(vec![repo("main", true, CATALOG)], Stability::Stable);
            let err = r
                .determine_requirements(
                    &["foo/bar", "acme/unstable", "missing/pkg"],
                    &PlatformRequirementFilter::IgnoreNothing,
                    false,
                )
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::E0105);
        }
    }

    #[test]
    fn levenshtein() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("symfony/consle", "symfony/console"), 1);
    }
}
