//! Detection of the PHP runtime the project will run on.
//!
//! One `php -r` invocation reports the interpreter version, its integer
//! size, every loaded extension with its version and the versions of a few
//! bundled libraries. A missing interpreter yields an empty snapshot.

use libretto_resolver::PlatformSnapshot;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::process::{Command, Output};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info};

const DETECT_SCRIPT: &str = r#"$e = [];
foreach (get_loaded_extensions() as $n) { $e[strtolower($n)] = phpversion($n) ?: null; }
echo json_encode([
    'version' => PHP_VERSION,
    'int_size' => PHP_INT_SIZE,
    'extensions' => (object) $e,
    'libraries' => array_filter([
        'openssl' => defined('OPENSSL_VERSION_TEXT') ? OPENSSL_VERSION_TEXT : null,
        'curl' => function_exists('curl_version') ? curl_version()['version'] : null,
        'icu' => defined('INTL_ICU_VERSION') ? INTL_ICU_VERSION : null,
        'libxml' => defined('LIBXML_DOTTED_VERSION') ? LIBXML_DOTTED_VERSION : null,
        'pcre' => defined('PCRE_VERSION') ? PCRE_VERSION : null,
    ]),
]);"#;

static LIBRARY_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+){0,3})([a-z]?)").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct DetectedPlatform {
    version: String,
    int_size: u8,
    #[serde(default)]
    extensions: BTreeMap<String, Option<String>>,
    #[serde(default)]
    libraries: BTreeMap<String, String>,
}

/// Runs the PHP detection script.
#[derive(Debug, Clone)]
pub struct PlatformDetector {
    php_binary: String,
}

impl Default for PlatformDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformDetector {
    /// Detector using `php` from `PATH`.
    pub fn new() -> Self {
        Self::with_php_binary("php")
    }

    /// Detector using a specific interpreter.
    pub fn with_php_binary(php_binary: impl Into<String>) -> Self {
        Self {
            php_binary: php_binary.into(),
        }
    }

    /// Run a PHP command and, on Windows, retry through `cmd /C` when a shim
    /// such as `php.bat` cannot be executed directly.
    fn run_php_command(&self, args: &[&str]) -> io::Result<Output> {
        match Command::new(&self.php_binary).args(args).output() {
            Ok(output) => Ok(output),
            Err(err) => {
                #[cfg(windows)]
                {
                    debug!(php_binary = %self.php_binary, error = %err, "retrying through cmd /C");
                    return Command::new("cmd")
                        .arg("/C")
                        .arg(&self.php_binary)
                        .args(args)
                        .output();
                }

                #[cfg(not(windows))]
                {
                    Err(err)
                }
            }
        }
    }

    /// Snapshot of the runtime; empty when no interpreter answers.
    pub fn detect(&self) -> PlatformSnapshot {
        let start = Instant::now();
        let output = match self.run_php_command(&["-r", DETECT_SCRIPT]) {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(status = ?output.status.code(), "PHP platform detection failed");
                return PlatformSnapshot::default();
            }
            Err(e) => {
                debug!(php_binary = %self.php_binary, error = %e, "PHP not found");
                return PlatformSnapshot::default();
            }
        };

        let snapshot = match parse_detected(&String::from_utf8_lossy(&output.stdout)) {
            Some(snapshot) => snapshot,
            None => {
                debug!("unreadable PHP platform output");
                PlatformSnapshot::default()
            }
        };
        info!(
            version = ?snapshot.php_version,
            extensions = snapshot.extensions.len(),
            duration_ms = start.elapsed().as_millis(),
            "platform detection complete"
        );
        snapshot
    }
}

fn parse_detected(json: &str) -> Option<PlatformSnapshot> {
    let detected: DetectedPlatform = sonic_rs::from_str(json.trim()).ok()?;
    let libraries = detected
        .libraries
        .into_iter()
        .filter_map(|(name, text)| library_version(&text).map(|v| (name, v)))
        .collect();
    Some(PlatformSnapshot {
        php_version: Some(detected.version),
        php_64bit: detected.int_size == 8,
        extensions: detected.extensions,
        libraries,
    })
}

/// First version-looking token of a library banner, e.g. `OpenSSL 3.0.2 15 Mar 2022`
/// gives `3.0.2`; a trailing letter becomes a fourth segment (`1.1.1k` → `1.1.1.11`).
fn library_version(text: &str) -> Option<String> {
    let caps = LIBRARY_VERSION.captures(text)?;
    let mut version = caps[1].to_string();
    if let Some(letter) = caps[2].chars().next() {
        version.push_str(&format!(".{}", letter as u32 - 'a' as u32 + 1));
    }
    Some(version)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection_output() {
        let json = r#"{"version":"8.2.4","int_size":8,"extensions":{"json":"8.2.4","mbstring":"8.2.4","ffi":null},"libraries":{"openssl":"OpenSSL 3.0.2 15 Mar 2022","pcre":"10.42 2022-12-11"}}"#;
        let snapshot = parse_detected(json).unwrap();
        assert_eq!(snapshot.php_version.as_deref(), Some("8.2.4"));
        assert!(snapshot.php_64bit);
        assert_eq!(snapshot.extensions.get("ffi"), Some(&None));
        assert_eq!(snapshot.libraries.get("openssl").map(String::as_str), Some("3.0.2"));
        assert_eq!(snapshot.libraries.get("pcre").map(String::as_str), Some("10.42"));
    }

    #[test]
    fn garbage_output_is_ignored() {
        assert!(parse_detected("PHP Warning: something").is_none());
    }

    #[test]
    fn library_letters_become_segments() {
        assert_eq!(library_version("OpenSSL 1.1.1k  25 Mar 2021").unwrap(), "1.1.1.11");
        assert_eq!(library_version("no digits"), None);
    }

    #[test]
    fn missing_binary_gives_empty_snapshot() {
        let snapshot = PlatformDetector::with_php_binary("/nonexistent/php-binary").detect();
        assert_eq!(snapshot, PlatformSnapshot::default());
    }
}
