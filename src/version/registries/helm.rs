//! Helm chart repository index implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::version::cache::FetchCache;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{PackageRef, PackageVersions};

/// Index resource served at the root of every chart repository
const INDEX_FILE: &str = "index.yaml";

/// Repository index document
#[derive(Debug, Deserialize)]
struct HelmIndex {
    entries: HashMap<String, Vec<HelmIndexEntry>>,
}

/// One published chart version; the remaining metadata is not needed
#[derive(Debug, Deserialize)]
struct HelmIndexEntry {
    #[serde(default)]
    version: String,
}

/// Chart name -> raw version strings
type ChartVersions = HashMap<String, Vec<String>>;

/// Registry implementation for HTTP Helm chart repositories
pub struct HelmRepositoryRegistry {
    client: reqwest::Client,
    indexes: FetchCache<Arc<ChartVersions>, RegistryError>,
}

impl HelmRepositoryRegistry {
    /// Creates a new HelmRepositoryRegistry with a per-request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            indexes: FetchCache::new(),
        }
    }

    /// Location of the index for a repository base URL
    pub fn index_url(base_url: &str) -> Result<Url, RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let mut url = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }

        let path = format!("{}/{}", url.path().trim_end_matches('/'), INDEX_FILE);
        url.set_path(&path);
        Ok(url)
    }

    async fn fetch_index(&self, url: &Url) -> Result<Arc<ChartVersions>, RegistryError> {
        let fetch_error = |reason: String| RegistryError::CatalogFetch {
            url: url.to_string(),
            reason,
        };

        debug!("Fetching chart index {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Chart repository returned status {}: {}", status, url);
            return Err(fetch_error(format!("Unexpected status: {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let index: HelmIndex = serde_yaml_ng::from_str(&body).map_err(|e| {
            warn!("Failed to parse chart index {}: {}", url, e);
            RegistryError::CatalogParse {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        let charts = index
            .entries
            .into_iter()
            .map(|(chart, entries)| (chart, entries.into_iter().map(|e| e.version).collect()))
            .collect();

        Ok(Arc::new(charts))
    }
}

impl Default for HelmRepositoryRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(FETCH_TIMEOUT_MS))
    }
}

#[async_trait::async_trait]
impl Registry for HelmRepositoryRegistry {
    async fn fetch_all_versions(
        &self,
        package: &PackageRef,
    ) -> Result<PackageVersions, RegistryError> {
        let url = Self::index_url(&package.source)?;

        let index = self
            .indexes
            .get_or_try_fetch(url.as_str(), || self.fetch_index(&url))
            .await?;

        let versions = index.get(&package.name).cloned().unwrap_or_default();
        debug!(
            "Chart {} has {} published versions in {}",
            package.name,
            versions.len(),
            url
        );

        Ok(PackageVersions::new(versions))
    }
}
