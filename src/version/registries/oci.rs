//! OCI distribution registry implementation
//!
//! Lists tags through `GET /v2/<repository>/tags/list`. Anonymous pulls on
//! public registries still go through the bearer token handshake: the first
//! request answers 401 with a `WWW-Authenticate: Bearer realm=...` challenge,
//! the token is fetched from the realm, and the request is retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, LINK, RETRY_AFTER, WWW_AUTHENTICATE};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT_MS;
use crate::manifest::image::DOCKER_HUB;
use crate::version::cache::FetchCache;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{PackageRef, PackageVersions};

/// Host actually serving the Docker Hub registry API
const DOCKER_HUB_ENDPOINT: &str = "registry-1.docker.io";

/// Upper bound on followed `Link: rel="next"` pages
const MAX_PAGES: usize = 100;

/// Response from the tags list endpoint
#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Response from a token realm; registries use either field name
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut params = parse_auth_params(params);
        Some(Self {
            realm: params.remove("realm").filter(|r| !r.is_empty())?,
            service: params.remove("service"),
            scope: params.remove("scope"),
        })
    }
}

/// Parses `key="value", key=value` pairs; quoted values may contain commas
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();

    while let Some((key, after)) = rest.split_once('=') {
        let key = key.trim().to_ascii_lowercase();
        let after = after.trim_start();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (after[..end].trim_end(), &after[end..]),
                None => (after.trim_end(), ""),
            },
        };
        params.insert(key, value.to_string());
        rest = remaining.trim_start().trim_start_matches(',').trim_start();
    }

    params
}

/// Target of the `rel="next"` entry of a Link header, resolved against the
/// current page
fn next_link(headers: &HeaderMap, current: &Url) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let (target, params) = link.split_once(';')?;
            let is_next = params.split(';').any(|param| {
                param
                    .trim()
                    .strip_prefix("rel=")
                    .is_some_and(|rel| rel.trim_matches('"') == "next")
            });
            if !is_next {
                return None;
            }
            let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
            current.join(target).ok()
        })
}

/// Registry implementation for OCI distribution registries
pub struct ContainerRegistry {
    client: reqwest::Client,
    /// Base URL receiving every request, regardless of the image host
    endpoint: Option<String>,
    /// Hosts reached over plain HTTP
    plain_http: Vec<String>,
    tags: FetchCache<Arc<Vec<String>>, RegistryError>,
}

impl ContainerRegistry {
    /// Creates a new ContainerRegistry with a per-request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            endpoint: None,
            plain_http: Vec::new(),
            tags: FetchCache::new(),
        }
    }

    /// Sends every request to `endpoint` instead of the image's registry host
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self
    }

    /// Reaches the given hosts over plain HTTP
    pub fn with_plain_http(mut self, hosts: Vec<String>) -> Self {
        self.plain_http = hosts;
        self
    }

    /// Base URL of the registry API serving `host`
    fn base_url(&self, host: &str) -> Result<Url, RegistryError> {
        let invalid = |url: &str, reason: String| RegistryError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        if let Some(endpoint) = &self.endpoint {
            return Url::parse(endpoint).map_err(|e| invalid(endpoint, e.to_string()));
        }

        let api_host = if host == DOCKER_HUB {
            DOCKER_HUB_ENDPOINT
        } else {
            host
        };
        let scheme = if self.plain_http.iter().any(|h| h == host || h == api_host) {
            "http"
        } else {
            "https"
        };
        let url = format!("{}://{}", scheme, api_host);
        Url::parse(&url).map_err(|e| invalid(&url, e.to_string()))
    }

    fn tags_url(base: &Url, repository: &str) -> Url {
        let mut url = base.clone();
        let path = format!(
            "{}/v2/{}/tags/list",
            base.path().trim_end_matches('/'),
            repository
        );
        url.set_path(&path);
        url.set_query(None);
        url
    }

    async fn get(&self, url: &Url, token: Option<&str>) -> reqwest::Result<reqwest::Response> {
        let request = self
            .client
            .get(url.clone())
            .header("Accept", "application/json");
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await
    }

    async fn fetch_token(
        &self,
        challenge: &BearerChallenge,
        package: &PackageRef,
    ) -> Result<String, RegistryError> {
        let error = |reason: String| RegistryError::Registry {
            reference: package.to_string(),
            reason,
        };

        let mut url = Url::parse(&challenge.realm)
            .map_err(|e| error(format!("invalid token realm {:?}: {}", challenge.realm, e)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &challenge.service {
                query.append_pair("service", service);
            }
            match &challenge.scope {
                Some(scope) => query.append_pair("scope", scope),
                None => query.append_pair("scope", &format!("repository:{}:pull", package.name)),
            };
        }

        debug!("Requesting registry token from {}", url);
        let response = self
            .get(&url, None)
            .await
            .map_err(|e| error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token realm returned status {}: {}", status, url);
            return Err(error(format!("token request failed with status {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| error(format!("invalid token response: {}", e)))?;

        body.token
            .or(body.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| error("token response carries no token".to_string()))
    }

    async fn fetch_tags(&self, package: &PackageRef) -> Result<Arc<Vec<String>>, RegistryError> {
        let error = |reason: String| RegistryError::Registry {
            reference: package.to_string(),
            reason,
        };

        let base = self.base_url(&package.source)?;
        let mut next = Some(Self::tags_url(&base, &package.name));
        let mut token: Option<String> = None;
        let mut tags = Vec::new();
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                warn!("Stopped listing tags of {} after {} pages", package, MAX_PAGES);
                break;
            }

            debug!("Fetching tag list {}", url);
            let mut response = self
                .get(&url, token.as_deref())
                .await
                .map_err(|e| error(e.to_string()))?;

            if response.status() == StatusCode::UNAUTHORIZED && token.is_none() {
                let challenge = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(BearerChallenge::parse)
                    .ok_or_else(|| error("authentication required".to_string()))?;
                token = Some(self.fetch_token(&challenge, package).await?);
                response = self
                    .get(&url, token.as_deref())
                    .await
                    .map_err(|e| error(e.to_string()))?;
            }

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                warn!("Registry rate limited listing {}", package);
                return Err(RegistryError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            if !status.is_success() {
                warn!("Registry returned status {}: {}", status, url);
                return Err(error(format!("Unexpected status: {}", status)));
            }

            next = next_link(response.headers(), &url);
            let page: TagList = response
                .json()
                .await
                .map_err(|e| error(format!("invalid tag list: {}", e)))?;
            tags.extend(page.tags.unwrap_or_default());
        }

        Ok(Arc::new(tags))
    }
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        Self::new(Duration::from_millis(FETCH_TIMEOUT_MS))
    }
}

#[async_trait::async_trait]
impl Registry for ContainerRegistry {
    async fn fetch_all_versions(
        &self,
        package: &PackageRef,
    ) -> Result<PackageVersions, RegistryError> {
        let key = package.to_string();
        let tags = self
            .tags
            .get_or_try_fetch(&key, || self.fetch_tags(package))
            .await?;

        Ok(PackageVersions::new(tags.as_ref().clone()))
    }
}
