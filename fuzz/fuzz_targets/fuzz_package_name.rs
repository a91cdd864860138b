#![no_main]

use libfuzzer_sys::fuzz_target;
use libretto_resolver::package::is_valid_requirement_name;
use libretto_resolver::{PackageName, is_platform_package, parse_name_version_pairs};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(name) = PackageName::parse(s) {
        // A parsed name always splits into a non-empty vendor and project.
        assert!(!name.vendor().is_empty());
        assert!(!name.name().is_empty());
        assert!(name.as_str().contains('/'));
        assert!(is_valid_requirement_name(name.as_str()));
    }

    let _ = is_platform_package(s);

    let tokens: Vec<&str> = s.split_whitespace().collect();
    let parsed = parse_name_version_pairs(&tokens);
    assert!(parsed.len() <= tokens.len());
});
