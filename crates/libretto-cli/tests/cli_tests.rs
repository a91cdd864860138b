//! CLI integration tests for Libretto.
//!
//! Each test builds a project in a temporary directory with a local
//! `packages.json` repository and a pinned platform, then runs the binary.
//! Remote repositories are served by a wiremock server.

#![allow(clippy::unwrap_used)]

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use libretto_test_utils::fixtures::{Fixtures, PackageListing};
use libretto_test_utils::temp_project::TempProject;
use predicates::prelude::*;
use sonic_rs::json;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn packages() -> PackageListing {
    PackageListing::new()
        .version("acme/tool", "1.3.0")
        .package(
            "acme/tool",
            json!({
                "name": "acme/tool",
                "version": "1.4.2",
                "type": "library",
                "description": "A tool",
                "require": {"php": ">=8.1"}
            }),
        )
        .version("acme/log", "1.0.0")
        .version("acme/log", "1.5.0")
        .version("acme/unstable", "2.0.0-beta1")
        .requiring("acme/graphics", "1.0.0", &[("ext-gd", "*")])
}

const MANIFEST: &str = r#"{
    "name": "acme/app",
    "require": {
        "acme/log": "^1.0"
    },
    "repositories": [
        {"type": "composer", "url": "repo"}
    ],
    "config": {
        "platform": {
            "php": "8.2.4",
            "ext-gd": false
        }
    }
}
"#;

struct Project {
    inner: TempProject,
}

impl Project {
    fn new() -> Self {
        Self::with_manifest(MANIFEST)
    }

    fn with_manifest(manifest: &str) -> Self {
        let inner = TempProject::new()
            .with_raw_composer_json(manifest)
            .with_packages(packages())
            .build()
            .unwrap();
        Self { inner }
    }

    fn path(&self) -> &Path {
        self.inner.path()
    }

    fn manifest(&self) -> String {
        self.inner.read_composer_json().unwrap()
    }

    fn write_lock(&self, packages: &[(&str, &str)]) {
        self.inner
            .write_composer_lock(&Fixtures::composer_lock(packages, &[]))
            .unwrap();
    }

    fn libretto(&self) -> Command {
        let mut cmd = Command::new(cargo_bin!("libretto"));
        cmd.current_dir(self.path())
            .env("COMPOSER_HOME", self.inner.home_path())
            .env("NO_COLOR", "1")
            .env_remove("COMPOSER")
            .env_remove("COMPOSER_MINIMUM_STABILITY")
            .env_remove("COMPOSER_PREFER_STABLE")
            .env_remove("COMPOSER_IGNORE_PLATFORM_REQS")
            .env_remove("COMPOSER_IGNORE_PLATFORM_REQ")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// A lazy v2 repository served over HTTP.
struct RemoteRepository {
    server: MockServer,
    runtime: Runtime,
}

impl RemoteRepository {
    fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        let remote = Self { server, runtime };
        remote.serve(
            "/packages.json",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"packages": [], "metadata-url": "/p2/%package%.json"}"#),
        );
        remote
    }

    fn serve(&self, route: &str, response: ResponseTemplate) {
        self.runtime.block_on(
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(response)
                .mount(&self.server),
        );
    }

    fn uri(&self) -> String {
        self.server.uri()
    }

    fn was_requested(&self, route: &str) -> bool {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .any(|request| request.url.path() == route)
    }

    fn manifest(&self) -> String {
        format!(
            r#"{{
    "name": "acme/app",
    "require": {{
        "acme/log": "^1.0"
    }},
    "repositories": [
        {{"type": "composer", "url": "{}"}}
    ],
    "config": {{
        "platform": {{
            "php": "8.2.4"
        }}
    }}
}}
"#,
            self.uri()
        )
    }
}

// ========== Help ==========

#[test]
fn test_help_output() {
    Command::new(cargo_bin!("libretto"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Composer-compatible package manager"))
        .stdout(predicate::str::contains("require"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("bump"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_invalid_flag_is_usage_error() {
    Command::new(cargo_bin!("libretto"))
        .args(["require", "--no-such-flag", "acme/tool"])
        .assert()
        .code(2);
}

// ========== require ==========

#[test]
fn test_require_records_recommended_constraint() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using version ^1.4 for acme/tool"));

    let manifest = project.manifest();
    assert!(manifest.contains("        \"acme/tool\": \"^1.4\""));
    assert!(!project.path().join("composer.json.backup").exists());
}

#[test]
fn test_require_keeps_given_constraint_and_sorts() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/tool:~1.3.0", "php", ">=8.1", "--sort-packages"])
        .assert()
        .success();

    let manifest = project.manifest();
    let php = manifest.find("\"php\"").unwrap();
    let log = manifest.find("\"acme/log\"").unwrap();
    let tool = manifest.find("\"acme/tool\": \"~1.3.0\"").unwrap();
    assert!(php < log && log < tool);
}

#[test]
fn test_require_dry_run_does_not_write() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/tool", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/tool:^1.4"));
    assert_eq!(project.manifest(), MANIFEST);
}

#[test]
fn test_require_unknown_package_suggests_names() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/tol"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not find package acme/tol"))
        .stderr(predicate::str::contains("acme/tool"));
    assert_eq!(project.manifest(), MANIFEST);
}

#[test]
fn test_require_unstable_package_reports_stability() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/unstable"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("E0105"))
        .stderr(predicate::str::contains("beta"));
    assert_eq!(project.manifest(), MANIFEST);
}

#[test]
fn test_require_with_stability_flag() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/unstable:@beta"])
        .assert()
        .success();
    assert!(project.manifest().contains("\"acme/unstable\": \"@beta\""));
}

#[test]
fn test_require_disabled_extension_is_platform_mismatch() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "acme/graphics"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("disabled by your platform config"));

    project
        .libretto()
        .args(["require", "acme/graphics", "--ignore-platform-req=ext-gd"])
        .assert()
        .success();
    assert!(project.manifest().contains("\"acme/graphics\": \"^1.0\""));
}

#[test]
fn test_require_dev_moves_existing_entry() {
    let project = Project::new();
    project
        .libretto()
        .args(["require", "--dev", "acme/log:^1.5"])
        .assert()
        .success()
        .stderr(predicate::str::contains("will move it to the require-dev key"));

    let manifest = project.manifest();
    assert!(manifest.contains("\"require-dev\": {\n        \"acme/log\": \"^1.5\""));
    assert!(!manifest.contains("\"require\": {"));
}

#[test]
fn test_require_itself_is_rejected() {
    let project = Project::with_manifest(
        r#"{"name": "acme/tool", "repositories": [{"type": "composer", "url": "repo"}], "config": {"platform": {"php": "8.2.4"}}}"#,
    );
    project
        .libretto()
        .args(["require", "acme/tool"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot require itself"));
}

#[test]
fn test_require_failed_write_reverts_manifest() {
    let project = Project::new();
    // a directory where the temp file should go makes the write fail
    fs::create_dir(project.path().join("composer.json.tmp")).unwrap();

    project
        .libretto()
        .args(["require", "acme/tool"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reverting"))
        .stderr(predicate::str::contains("to its original content"));

    assert_eq!(project.manifest(), MANIFEST);
    assert!(!project.path().join("composer.json.backup").exists());
}

#[test]
fn test_require_from_http_repository() {
    let remote = RemoteRepository::start();
    remote.serve(
        "/p2/acme/remote.json",
        ResponseTemplate::new(200).set_body_string(
            r#"{"minified": "composer/2.0", "packages": {"acme/remote": [
                {"name": "acme/remote", "version": "2.1.0", "require": {"php": ">=8.1"}},
                {"version": "2.0.0"}
            ]}}"#,
        ),
    );
    let project = Project::with_manifest(&remote.manifest());

    project
        .libretto()
        .args(["require", "acme/remote"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using version ^2.1 for acme/remote"));

    assert!(project.manifest().contains("\"acme/remote\": \"^2.1\""));
    assert!(remote.was_requested("/p2/acme/remote~dev.json"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_exits_130_and_leaves_manifest() {
    let remote = RemoteRepository::start();
    remote.serve(
        "/p2/acme/slow.json",
        ResponseTemplate::new(200)
            .set_delay(Duration::from_secs(20))
            .set_body_string(r#"{"packages": {"acme/slow": [{"name": "acme/slow", "version": "1.0.0"}]}}"#),
    );
    let project = Project::with_manifest(&remote.manifest());
    let original = project.manifest();

    let child = project
        .libretto()
        .args(["require", "acme/slow"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(15);
    while !remote.was_requested("/p2/acme/slow.json") {
        assert!(Instant::now() < deadline, "the command never reached the repository");
        std::thread::sleep(Duration::from_millis(50));
    }
    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(130));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Interrupted (SIGTERM)"));
    assert_eq!(project.manifest(), original);
    assert!(!project.path().join("composer.json.backup").exists());
}

// ========== remove ==========

#[test]
fn test_remove_package() {
    let project = Project::new();
    project
        .libretto()
        .args(["remove", "acme/log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- acme/log:^1.0"));
    assert!(!project.manifest().contains("acme/log"));
}

#[test]
fn test_remove_unknown_package_keeps_manifest() {
    let project = Project::new();
    project
        .libretto()
        .args(["remove", "acme/unknown"])
        .assert()
        .success()
        .stderr(predicate::str::contains("is not required in your composer.json"));
    assert_eq!(project.manifest(), MANIFEST);
}

#[test]
fn test_remove_without_manifest_fails() {
    let dir = TempDir::new().unwrap();
    Command::new(cargo_bin!("libretto"))
        .current_dir(dir.path())
        .env("COMPOSER_HOME", dir.path())
        .args(["remove", "acme/log"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

// ========== bump ==========

#[test]
fn test_bump_uses_lock_versions() {
    let project = Project::new();
    project.write_lock(&[("acme/log", "1.5.0")]);

    project
        .libretto()
        .args(["bump", "--dry-run"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("require.acme/log: ^1.0 => ^1.5"));
    assert_eq!(project.manifest(), MANIFEST);

    project.libretto().arg("bump").assert().success();
    assert!(project.manifest().contains("\"acme/log\": \"^1.5\""));

    project
        .libretto()
        .args(["bump", "--dry-run"])
        .assert()
        .success();
}

#[test]
fn test_bump_without_lock_fails() {
    let project = Project::new();
    project
        .libretto()
        .arg("bump")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("composer.lock"));
}

// ========== show ==========

#[test]
fn test_show_best_candidate() {
    let project = Project::new();
    project
        .libretto()
        .args(["show", "acme/tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.4.2"))
        .stdout(predicate::str::contains("^1.4"))
        .stdout(predicate::str::contains("requires"));
}

#[test]
fn test_show_with_constraint() {
    let project = Project::new();
    project
        .libretto()
        .args(["show", "acme/tool", "<1.4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.3.0"));

    project
        .libretto()
        .args(["show", "acme/tool", "^3.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("available versions: 1.4.2, 1.3.0"));
}

// ========== configuration ==========

#[test]
fn test_invalid_minimum_stability_is_config_error() {
    let project = Project::with_manifest(r#"{"minimum-stability": "sometimes"}"#);
    project
        .libretto()
        .args(["show", "acme/tool"])
        .assert()
        .code(2);
}

#[test]
fn test_working_dir_option() {
    let project = Project::new();
    Command::new(cargo_bin!("libretto"))
        .env("COMPOSER_HOME", project.path().join("home"))
        .arg("-d")
        .arg(project.path())
        .args(["show", "acme/log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1.5.0"));
}

#[test]
fn test_composer_env_selects_manifest() {
    let project = Project::new();
    fs::write(project.path().join("other.json"), MANIFEST).unwrap();
    project
        .libretto()
        .env("COMPOSER", "other.json")
        .args(["remove", "acme/log"])
        .assert()
        .success();
    assert!(!fs::read_to_string(project.path().join("other.json")).unwrap().contains("acme/log"));
    assert_eq!(project.manifest(), MANIFEST);
}
