//! Benchmarks for constraint handling and version selection.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use libretto_resolver::{
    ArrayRepository, ComposerConstraint, ComposerVersion, Package, PlatformRepository,
    PlatformRequirementFilter, PoolFlags, Repository, RepositorySet, Resolver, ResolverSettings,
    Stability, VersionSelector,
};
use rand::prelude::*;
use std::sync::Arc;

/// Generate a repository with `num_packages` packages of `versions_per_package` versions.
fn generate_repository(name: &str, num_packages: usize, versions_per_package: usize) -> ArrayRepository {
    let repository = ArrayRepository::new(name);
    let mut rng = rand::thread_rng();
    for i in 0..num_packages {
        let package_name = format!("vendor{}/package{}", i / 100, i % 100);
        for v in 0..versions_per_package {
            let suffix = match rng.gen_range(0..10) {
                0 => "-beta1",
                1 => "-RC1",
                _ => "",
            };
            let version = format!("{}.{}.{}{suffix}", v / 10 + 1, v % 10, rng.gen_range(0..5));
            if let Ok(parsed) = ComposerVersion::parse(&version) {
                repository.add_package(Package::new(&package_name, parsed));
            }
        }
    }
    repository
}

/// Benchmark version parsing.
fn bench_version_parsing(c: &mut Criterion) {
    let versions = vec![
        "1.0.0",
        "1.2.3",
        "v2.0.0",
        "1.0.0-alpha",
        "1.0.0-beta.1",
        "1.0.0-RC1",
        "dev-master",
        "1.0.x-dev",
        "2.3.4.5",
    ];

    c.bench_function("version_parse", |b| {
        b.iter(|| {
            for v in &versions {
                black_box(ComposerVersion::parse(v).ok());
            }
        });
    });
}

/// Benchmark constraint parsing.
fn bench_constraint_parsing(c: &mut Criterion) {
    let constraints = vec![
        "^1.0",
        "~1.2.3",
        ">=1.0 <2.0",
        "1.0.*",
        "^1.0 || ^2.0",
        ">=1.0.0 <1.1.0 || >=1.2.0 <2.0.0",
        "1.0.0 - 2.0.0",
        ">=1.0@dev",
        "dev-master",
    ];

    c.bench_function("constraint_parse", |b| {
        b.iter(|| {
            for c in &constraints {
                black_box(ComposerConstraint::parse(c).ok());
            }
        });
    });
}

/// Benchmark constraint matching.
fn bench_constraint_matching(c: &mut Criterion) {
    let Ok(constraint) = ComposerConstraint::parse("^1.0 || >=2.3 <2.8") else {
        return;
    };
    let versions: Vec<_> = (0..100)
        .filter_map(|i| ComposerVersion::parse(&format!("{}.{}.0", i / 10, i % 10)).ok())
        .collect();

    c.bench_function("constraint_match_100", |b| {
        b.iter(|| {
            for v in &versions {
                black_box(constraint.matches(v));
            }
        });
    });
}

/// Benchmark best-candidate selection against repositories of growing size.
fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    for size in [100, 500, 1000] {
        let repository: Arc<dyn Repository> = Arc::new(generate_repository("bench", size, 30));
        let names: Vec<String> = (0..size)
            .map(|i| format!("vendor{}/package{}", i / 100, i % 100))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("cold", size), &names, |b, names| {
            b.iter(|| {
                let mut set = RepositorySet::new(Stability::Stable);
                set.add_repository(Arc::clone(&repository));
                let selector = VersionSelector::new(Arc::new(set), None);
                for name in names {
                    black_box(selector.find_best_matching(
                        name,
                        None,
                        Stability::Stable,
                        &PlatformRequirementFilter::IgnoreNothing,
                        PoolFlags::NONE,
                    ));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark discovery with memoized repository sets.
fn bench_warm_discovery(c: &mut Criterion) {
    let repository: Arc<dyn Repository> = Arc::new(generate_repository("bench", 100, 30));
    let resolver = Resolver::new(
        vec![repository],
        Arc::new(PlatformRepository::new()),
        ResolverSettings::default(),
    );
    let tokens: Vec<String> = (0..100).map(|i| format!("vendor0/package{i}")).collect();
    let filter = PlatformRequirementFilter::IgnoreNothing;
    let _ = resolver.determine_requirements(&tokens, &filter, false);

    c.bench_function("discovery_warm_100", |b| {
        b.iter(|| black_box(resolver.determine_requirements(&tokens, &filter, false).ok()));
    });
}

criterion_group!(
    benches,
    bench_version_parsing,
    bench_constraint_parsing,
    bench_constraint_matching,
    bench_selection,
    bench_warm_discovery,
);

criterion_main!(benches);
