#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use libretto_resolver::{
    ComposerConstraint, ComposerVersion, Package, PackageHandle, RequirementFormatter,
};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    constraint: &'a str,
    version: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let version = ComposerVersion::parse(input.version).ok();
    if let Some(version) = &version {
        let _ = ComposerVersion::parse(&version.to_string());
        let _ = version.stability();
    }

    let Ok(constraint) = ComposerConstraint::parse(input.constraint) else {
        return;
    };

    let samples = [
        "0.0.0",
        "1.0.0",
        "1.2.3-beta1",
        "2.0.0-RC1",
        "dev-main",
        "3.x-dev",
        "99.99.99",
    ];
    for sample in samples.iter().filter_map(|p| ComposerVersion::parse(p).ok()) {
        let _ = constraint.matches(&sample);
    }
    if let Some(version) = &version {
        let _ = constraint.matches(version);
    }

    let _ = constraint.upper_bound();
    let _ = constraint.without_upper_bound();
    let _ = constraint.is_subset_of(&ComposerConstraint::any());

    let formatter = RequirementFormatter::new(None);
    let installed = PackageHandle::real(Package::new("fuzz/target", ComposerVersion::new(1, 2, 3)));
    let _ = formatter.bump_requirement(&constraint, &installed);
});
