//! Composer repositories served over HTTP.
//!
//! The root `packages.json` is read on first use. Repositories that publish
//! a `metadata-url` (Composer v2, Packagist) are loaded lazily, one package
//! file per requested name plus its `~dev` counterpart. Like every other
//! repository, a remote one that cannot answer simply lists nothing.

use crate::constraint::ComposerConstraint;
use crate::loader::PackageDefinition;
use crate::package::PackageHandle;
use crate::platform::is_platform_package;
use crate::repository::{ArrayRepository, PackagesJson, Provider, Repository};
use backon::{ExponentialBuilder, Retryable};
use dashmap::DashSet;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use sonic_rs::{JsonValueTrait, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use url::Url;

/// Default Packagist repository URL.
pub const PACKAGIST_URL: &str = "https://repo.packagist.org";

/// Marker for keys removed between consecutive minified versions.
const UNSET: &str = "__unset";

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Maximum retries.
    pub max_retries: usize,
    /// Initial retry delay.
    pub retry_delay: Duration,
    /// Maximum retry delay.
    pub max_retry_delay: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(10),
            user_agent: format!("Libretto/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Why a single request failed.
#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url}: request timed out")]
    Timeout { url: String },

    #[error("{url}: {message}")]
    Network { url: String, message: String },

    #[error("{url}: invalid metadata: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    /// Server errors, rate limits and transport failures are worth another try.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Parse { .. } => false,
        }
    }
}

/// HTTP client with retry logic.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration.
    ///
    /// # Errors
    /// Returns error if client cannot be created.
    pub fn new() -> libretto_core::Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration.
    ///
    /// # Errors
    /// Returns error if client cannot be created.
    pub fn with_config(config: HttpClientConfig) -> libretto_core::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| libretto_core::Error::config(format!("failed to create HTTP client: {e}"), None))?;
        Ok(Self { client, config })
    }

    /// GET `url`, retrying transient failures.
    ///
    /// A 404 is not an error: the resource simply does not exist.
    async fn get(&self, url: &Url) -> Result<Option<Vec<u8>>, FetchError> {
        let config = &self.config;
        (|| async { self.get_once(url).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(config.retry_delay)
                    .with_max_delay(config.max_retry_delay)
                    .with_max_times(config.max_retries),
            )
            .when(FetchError::is_retryable)
            .notify(|err, dur| {
                warn!(error = %err, retry_in = ?dur, "retrying request");
            })
            .await
    }

    async fn get_once(&self, url: &Url) -> Result<Option<Vec<u8>>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { url: url.to_string() }
                } else {
                    FetchError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: format!("failed to read body: {e}"),
        })?;
        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(Some(body.to_vec()))
    }
}

/// Per-package metadata file (`p2/vendor/name.json`).
#[derive(Debug, Default, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    packages: BTreeMap<String, Vec<BTreeMap<String, Value>>>,
    #[serde(default)]
    minified: Option<String>,
}

/// Undo `composer/2.0` minification.
///
/// Each entry only lists the keys that differ from the entry before it;
/// a value of `"__unset"` removes the key.
fn expand_minified(versions: Vec<BTreeMap<String, Value>>) -> Vec<BTreeMap<String, Value>> {
    let mut expanded = Vec::with_capacity(versions.len());
    let mut previous: Option<BTreeMap<String, Value>> = None;
    for diff in versions {
        let version = match previous.take() {
            None => diff,
            Some(mut base) => {
                for (key, value) in diff {
                    if value.as_str() == Some(UNSET) {
                        base.remove(&key);
                    } else {
                        base.insert(key, value);
                    }
                }
                base
            }
        };
        expanded.push(version.clone());
        previous = Some(version);
    }
    expanded
}

fn to_definition(version: &BTreeMap<String, Value>, url: &Url) -> Option<PackageDefinition> {
    let bytes = sonic_rs::to_vec(version).ok()?;
    sonic_rs::from_slice(&bytes)
        .map_err(|err| debug!(url = %url, error = %err, "skipping unreadable version"))
        .ok()
}

/// Path of a package's metadata file from a `metadata-url` pattern.
fn metadata_path(pattern: &str, name: &str, dev: bool) -> String {
    let file = if dev { format!("{name}~dev") } else { name.to_string() };
    pattern.replace("%package%", &file)
}

/// A Composer repository reached over HTTP(S).
///
/// Lookups block on `runtime`, so they must not be made from inside
/// asynchronous code.
pub struct HttpComposerRepository {
    url: String,
    root_url: Option<Url>,
    client: HttpClient,
    runtime: Handle,
    root: OnceLock<PackagesJson>,
    fetched: DashSet<String>,
    packages: ArrayRepository,
}

impl fmt::Debug for HttpComposerRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpComposerRepository")
            .field("url", &self.url)
            .field("fetched", &self.fetched.len())
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl HttpComposerRepository {
    /// Create the repository. Nothing is fetched until the first lookup.
    #[must_use]
    pub fn open(url: &str, canonical: bool, client: HttpClient, runtime: Handle) -> Self {
        let root_url = root_url(url);
        if root_url.is_none() {
            warn!(repository = %url, "invalid repository URL, it will list no packages");
        }
        Self {
            url: url.to_string(),
            root_url,
            client,
            runtime,
            root: OnceLock::new(),
            fetched: DashSet::new(),
            packages: ArrayRepository::new(url).canonical(canonical),
        }
    }

    /// Packagist, the default repository.
    #[must_use]
    pub fn packagist(client: HttpClient, runtime: Handle) -> Self {
        Self::open(PACKAGIST_URL, true, client, runtime)
    }

    /// Whether `url` names a repository this type serves.
    #[must_use]
    pub fn is_remote(url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// The repository URL as configured.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn root(&self) -> &PackagesJson {
        self.root.get_or_init(|| {
            let listing = self.fetch_root().unwrap_or_else(|err| {
                warn!(repository = %self.url, error = %err, "repository could not be loaded, continuing without it");
                PackagesJson::default()
            });
            listing.add_to(&self.packages);
            listing
        })
    }

    fn fetch_root(&self) -> Result<PackagesJson, FetchError> {
        let Some(url) = &self.root_url else {
            return Ok(PackagesJson::default());
        };
        let Some(body) = self.block_on(self.client.get(url))? else {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            });
        };
        let listing: PackagesJson = sonic_rs::from_slice(&body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        debug!(
            repository = %self.url,
            lazy = listing.metadata_url.is_some(),
            inline = listing.packages.len(),
            "loaded repository root"
        );
        Ok(listing)
    }

    /// Fetch the metadata files for `name` once.
    fn ensure_loaded(&self, name: &str) {
        let key = name.to_ascii_lowercase();
        let root = self.root();
        if is_platform_package(&key) || !self.fetched.insert(key.clone()) {
            return;
        }
        let Some(pattern) = root.metadata_url.as_deref() else {
            return;
        };
        if let Some(available) = &root.available_packages
            && !available.iter().any(|listed| listed.eq_ignore_ascii_case(&key))
        {
            return;
        }

        let mut loaded = 0;
        for dev in [false, true] {
            match self.block_on(self.fetch_metadata(pattern, &key, dev)) {
                Ok(definitions) => {
                    for definition in &definitions {
                        self.packages.add_definition(definition, Some(&key));
                    }
                    loaded += definitions.len();
                }
                Err(err) => {
                    warn!(repository = %self.url, package = %key, error = %err, "package metadata could not be loaded");
                }
            }
        }
        info!(repository = %self.url, package = %key, versions = loaded, "fetched package metadata");
    }

    async fn fetch_metadata(
        &self,
        pattern: &str,
        name: &str,
        dev: bool,
    ) -> Result<Vec<PackageDefinition>, FetchError> {
        let Some(base) = &self.root_url else {
            return Ok(Vec::new());
        };
        let path = metadata_path(pattern, name, dev);
        let url = base.join(&path).map_err(|e| FetchError::Network {
            url: format!("{base}{path}"),
            message: e.to_string(),
        })?;
        let Some(body) = self.client.get(&url).await? else {
            return Ok(Vec::new());
        };
        let response: MetadataResponse = sonic_rs::from_slice(&body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let minified = response.minified.is_some();
        let versions = response
            .packages
            .into_iter()
            .find(|(listed, _)| listed.eq_ignore_ascii_case(name))
            .map(|(_, versions)| versions)
            .unwrap_or_default();
        let versions = if minified { expand_minified(versions) } else { versions };
        Ok(versions
            .iter()
            .filter_map(|version| to_definition(version, &url))
            .collect())
    }
}

/// URL of the root `packages.json`.
fn root_url(url: &str) -> Option<Url> {
    let mut parsed = Url::parse(url).ok()?;
    if parsed.path().ends_with(".json") {
        return Some(parsed);
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.join("packages.json").ok()
}

impl Repository for HttpComposerRepository {
    fn name(&self) -> &str {
        &self.url
    }

    fn is_canonical(&self) -> bool {
        self.packages.is_canonical()
    }

    fn find_packages(
        &self,
        name: &str,
        constraint: Option<&ComposerConstraint>,
    ) -> Vec<PackageHandle> {
        self.ensure_loaded(name);
        self.packages.find_packages(name, constraint)
    }

    fn has_package(&self, name: &str) -> bool {
        self.ensure_loaded(name);
        self.packages.has_package(name)
    }

    fn find_providers(&self, name: &str) -> Vec<Provider> {
        self.root();
        self.packages.find_providers(name)
    }

    fn package_names(&self) -> Vec<String> {
        let root = self.root();
        let mut names = self.packages.package_names();
        if let Some(available) = &root.available_packages {
            names.extend(available.iter().cloned());
        }
        names.sort();
        names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        names
    }
}
