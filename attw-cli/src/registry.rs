//! Registry tarball fetching for the attw CLI.

use attw_core::{AnalyzerError, AttwError};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;

/// Registry used when neither `--registry` nor `ATTW_REGISTRY` is set.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Boxed future returned by [`TarballFetcher::fetch`].
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, AnalyzerError>> + Send + 'a>>;

/// Downloads package tarballs by name and version.
pub trait TarballFetcher {
    /// Fetch the tarball for `name`, at `version` or the `latest` tag.
    fn fetch<'a>(&'a self, name: &'a str, version: Option<&'a str>) -> FetchFuture<'a>;
}

/// Version manifest returned by `GET <registry>/<name>/<version>`.
#[derive(Debug, Deserialize)]
struct VersionManifest {
    name: String,
    version: String,
    dist: Dist,
}

#[derive(Debug, Deserialize)]
struct Dist {
    tarball: String,
}

/// Reqwest-backed registry client.
pub struct RegistryFetcher {
    client: Client,
    registry: String,
}

impl RegistryFetcher {
    /// Build a fetcher for the given registry base URL.
    pub fn new(registry: &str) -> Result<Self, AttwError> {
        let registry = normalize_registry_url(registry)?;
        let client = Client::builder()
            .user_agent(concat!("attw-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AttwError::Other(format!("failed to build http client: {err}")))?;
        Ok(Self { client, registry })
    }
}

impl TarballFetcher for RegistryFetcher {
    fn fetch<'a>(&'a self, name: &'a str, version: Option<&'a str>) -> FetchFuture<'a> {
        Box::pin(fetch_tarball(&self.client, &self.registry, name, version))
    }
}

/// Normalize the registry URL for consistent requests.
fn normalize_registry_url(registry: &str) -> Result<String, AttwError> {
    let trimmed = registry.trim();
    if trimmed.is_empty() {
        return Err(AttwError::Usage("registry url is required".to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Manifest URL for a package; scoped names keep `@` and encode `/`.
fn manifest_url(registry: &str, name: &str, version: Option<&str>) -> String {
    let encoded = name.replace('/', "%2F");
    format!("{registry}/{encoded}/{}", version.unwrap_or("latest"))
}

async fn fetch_tarball(
    client: &Client,
    registry: &str,
    name: &str,
    version: Option<&str>,
) -> Result<Vec<u8>, AnalyzerError> {
    let url = manifest_url(registry, name, version);
    log::debug!("fetching manifest {url}");
    let manifest = client
        .get(&url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| fetch_error(&url, err))?
        .json::<VersionManifest>()
        .await
        .map_err(|err| fetch_error(&url, err))?;
    log::debug!(
        "resolved {}@{} to {}",
        manifest.name,
        manifest.version,
        manifest.dist.tarball
    );

    let tarball_url = manifest.dist.tarball;
    let bytes = client
        .get(&tarball_url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|err| fetch_error(&tarball_url, err))?
        .bytes()
        .await
        .map_err(|err| fetch_error(&tarball_url, err))?;
    Ok(bytes.to_vec())
}

/// Map a reqwest failure to a fetch error with a stable code.
fn fetch_error(url: &str, err: reqwest::Error) -> AnalyzerError {
    let code = if let Some(status) = err.status() {
        format!("E{}", status.as_u16())
    } else if err.is_timeout() {
        "ETIMEDOUT".to_string()
    } else if err.is_connect() {
        "ECONNREFUSED".to_string()
    } else {
        "EFETCH".to_string()
    };
    AnalyzerError::Fetch {
        message: format!("failed to fetch {url}: {err}"),
        code,
    }
}
