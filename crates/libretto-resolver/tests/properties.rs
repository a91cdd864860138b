//! Property tests over generated names, versions and constraints.

#![allow(clippy::unwrap_used)]

use libretto_resolver::{
    ArrayRepository, ComposerConstraint, ComposerVersion, Package, PlatformRepository,
    PlatformRequirementFilter, Repository, Resolver, ResolverSettings, parse_name_version_pairs,
};
use libretto_test_utils::proptest_strategies::{
    complex_constraint_strategy, constraint_with_stability_strategy, full_package_name_strategy,
    hyphen_constraint_strategy, requirement_token_strategy, semver_strategy, version_strategy,
};
use proptest::prelude::*;
use std::sync::Arc;

fn resolver_over(name: &str, versions: &[String]) -> Resolver {
    let repository = ArrayRepository::new("generated");
    for version in versions {
        repository.add_package(Package::new(name, ComposerVersion::parse(version).unwrap()));
    }
    Resolver::new(
        vec![Arc::new(repository) as Arc<dyn Repository>],
        Arc::new(PlatformRepository::new()),
        ResolverSettings::default(),
    )
}

proptest! {
    #[test]
    fn generated_versions_parse(version in version_strategy()) {
        prop_assert!(ComposerVersion::parse(&version).is_ok());
    }

    #[test]
    fn generated_constraints_parse(raw in complex_constraint_strategy()) {
        prop_assert!(ComposerConstraint::parse(&raw).is_ok());
    }

    #[test]
    fn stability_flagged_constraints_parse(raw in constraint_with_stability_strategy()) {
        prop_assert!(ComposerConstraint::parse(&raw).is_ok());
    }

    #[test]
    fn hyphen_ranges_reject_stability_flags(range in hyphen_constraint_strategy()) {
        prop_assert!(ComposerConstraint::parse(&range).is_ok());
        let flagged = format!("{range}@dev");
        prop_assert!(ComposerConstraint::parse(&flagged).is_err());
    }

    #[test]
    fn tokens_split_into_valid_names(tokens in prop::collection::vec(requirement_token_strategy(), 1..5)) {
        let parsed = parse_name_version_pairs(&tokens);
        prop_assert_eq!(parsed.len(), tokens.len());
        for token in parsed {
            prop_assert!(token.name.contains('/'));
        }
    }

    #[test]
    fn best_stable_version_is_highest_and_recommendation_matches_it(
        name in full_package_name_strategy(),
        versions in prop::collection::vec(semver_strategy(), 1..12),
    ) {
        let resolver = resolver_over(&name, &versions);
        let best = resolver
            .find_best_candidate(&name, None, &PlatformRequirementFilter::IgnoreNothing)
            .unwrap()
            .unwrap();
        let highest = versions.iter().map(|v| ComposerVersion::parse(v).unwrap()).max().unwrap();
        prop_assert_eq!(best.version(), &highest);

        let (_, recommended) = resolver
            .find_best_version_and_name_for_package(&name, None, &PlatformRequirementFilter::IgnoreNothing, false)
            .unwrap();
        prop_assert!(ComposerConstraint::parse(&recommended).unwrap().matches(best.version()));
    }
}
