//! Proptest strategies for Composer names, versions and constraints.

use proptest::prelude::*;

/// Strategy for generating valid vendor names.
pub fn vendor_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{2,20}".prop_map(|s| s.to_lowercase())
}

/// Strategy for generating valid package names.
pub fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{2,30}".prop_map(|s| s.to_lowercase())
}

/// Strategy for generating full package names (vendor/package).
pub fn full_package_name_strategy() -> impl Strategy<Value = String> {
    (vendor_name_strategy(), package_name_strategy())
        .prop_map(|(vendor, package)| format!("{vendor}/{package}"))
}

/// Strategy for generating three-part stable versions.
pub fn semver_strategy() -> impl Strategy<Value = String> {
    (0u32..30, 0u32..30, 0u32..100)
        .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}

/// Strategy for generating versions with a pre-release suffix.
pub fn prerelease_version_strategy() -> impl Strategy<Value = String> {
    let suffix = prop_oneof![
        Just("alpha".to_string()),
        Just("beta".to_string()),
        Just("RC".to_string()),
        (1u32..10).prop_map(|n| format!("alpha{n}")),
        (1u32..10).prop_map(|n| format!("beta{n}")),
        (1u32..5).prop_map(|n| format!("RC{n}")),
    ];
    (semver_strategy(), suffix).prop_map(|(v, pre)| format!("{v}-{pre}"))
}

/// Strategy for generating dev branch versions.
pub fn dev_version_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("dev-main".to_string()),
        Just("dev-master".to_string()),
        "[a-z][a-z0-9-]{2,15}".prop_map(|s| format!("dev-{s}")),
        (0u32..10).prop_map(|major| format!("{major}.x-dev")),
    ]
}

/// Strategy for generating any version string a repository may list.
pub fn version_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        8 => semver_strategy(),
        2 => prerelease_version_strategy(),
        1 => dev_version_strategy(),
    ]
}

/// Strategy for generating caret constraints (^x.y.z).
pub fn caret_constraint_strategy() -> impl Strategy<Value = String> {
    semver_strategy().prop_map(|v| format!("^{v}"))
}

/// Strategy for generating tilde constraints (~x.y.z).
pub fn tilde_constraint_strategy() -> impl Strategy<Value = String> {
    semver_strategy().prop_map(|v| format!("~{v}"))
}

/// Strategy for generating range constraints.
pub fn range_constraint_strategy() -> impl Strategy<Value = String> {
    (semver_strategy(), semver_strategy()).prop_map(|(v1, v2)| format!(">={v1} <{v2}"))
}

/// Strategy for generating hyphen ranges.
pub fn hyphen_constraint_strategy() -> impl Strategy<Value = String> {
    (semver_strategy(), semver_strategy()).prop_map(|(v1, v2)| format!("{v1} - {v2}"))
}

/// Strategy for generating wildcard constraints.
pub fn wildcard_constraint_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        (0u32..20).prop_map(|major| format!("{major}.*")),
        (0u32..20, 0u32..50).prop_map(|(major, minor)| format!("{major}.{minor}.*")),
    ]
}

/// Strategy for generating any single version constraint.
pub fn single_constraint_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => caret_constraint_strategy(),
        3 => tilde_constraint_strategy(),
        1 => semver_strategy(),
        1 => range_constraint_strategy(),
        1 => hyphen_constraint_strategy(),
        1 => wildcard_constraint_strategy(),
    ]
}

/// Strategy for generating constraints with OR (`||`).
pub fn complex_constraint_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => single_constraint_strategy(),
        1 => (single_constraint_strategy(), single_constraint_strategy())
            .prop_map(|(c1, c2)| format!("{c1} || {c2}")),
    ]
}

/// Strategy for generating constraints with a trailing stability flag.
pub fn constraint_with_stability_strategy() -> impl Strategy<Value = String> {
    let stability = prop_oneof![
        Just("@stable"),
        Just("@RC"),
        Just("@beta"),
        Just("@alpha"),
        Just("@dev"),
    ];

    // hyphen ranges do not take a stability flag
    let flaggable = prop_oneof![
        caret_constraint_strategy(),
        tilde_constraint_strategy(),
        semver_strategy(),
        range_constraint_strategy(),
        wildcard_constraint_strategy(),
    ];

    prop_oneof![
        3 => single_constraint_strategy(),
        1 => (flaggable, stability)
            .prop_map(|(c, s)| format!("{c}{s}")),
    ]
}

/// Strategy for generating requirement tokens as typed on the command line.
pub fn requirement_token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => full_package_name_strategy(),
        2 => (full_package_name_strategy(), single_constraint_strategy())
            .prop_map(|(name, c)| format!("{name}:{c}")),
        1 => (full_package_name_strategy(), semver_strategy())
            .prop_map(|(name, v)| format!("{name}={v}")),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_vendor_name_strategy() {
        let mut runner = TestRunner::default();
        for _ in 0..100 {
            let name = vendor_name_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(name.len() >= 3);
            assert!(name.chars().next().unwrap().is_ascii_lowercase());
        }
    }

    proptest! {
        #[test]
        fn prop_full_package_name_valid(name in full_package_name_strategy()) {
            let parts: Vec<&str> = name.split('/').collect();
            prop_assert_eq!(parts.len(), 2);
            prop_assert!(!parts[0].is_empty());
            prop_assert!(!parts[1].is_empty());
        }

        #[test]
        fn prop_semver_valid_format(version in semver_strategy()) {
            let parts: Vec<&str> = version.split('.').collect();
            prop_assert_eq!(parts.len(), 3);
            for part in parts {
                prop_assert!(part.parse::<u32>().is_ok());
            }
        }

        #[test]
        fn prop_requirement_token_starts_with_name(token in requirement_token_strategy()) {
            let name = token.split([':', '=']).next().unwrap();
            prop_assert!(name.contains('/'));
        }
    }
}
