//! Drift detectors
//!
//! A detector looks for one category of versioned reference in the document
//! set, resolves each reference against its upstream catalog, and yields one
//! `VersionDrift` per resolved reference. References that cannot be resolved
//! are logged and left out.

pub mod image;
pub mod join;
pub mod release;
pub mod scanner;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::manifest::types::DocumentSet;
use crate::version::constraint::Constraint;
use crate::version::error::ResolveError;
use crate::version::registries::{ContainerRegistry, HelmRepositoryRegistry};
use crate::version::registry::Registry;
use crate::version::resolver::resolve;
use crate::version::types::PackageRef;

pub use image::ImageDetector;
pub use release::HelmReleaseDetector;
pub use scanner::{DriftReport, Scanner};

/// Category of versioned reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    HelmRelease,
    Image,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::HelmRelease => "helm_release",
            DetectorKind::Image => "image",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a reference compares with its catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// The latest version is outside the declared constraint
    Old,
    /// The declared constraint admits the latest version
    Latest,
    /// The catalog advertised no usable version
    Unresolved,
}

impl DriftStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DriftStatus::Old => "old",
            DriftStatus::Latest => "latest",
            DriftStatus::Unresolved => "unresolved",
        }
    }
}

/// Result for one versioned reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDrift {
    pub detector: DetectorKind,
    /// Chart name or image name
    pub name: String,
    /// Declared version or constraint as written
    pub current_version: String,
    /// Greatest advertised version, absent when unresolved
    pub latest_version: Option<String>,
    pub stale: bool,
}

impl VersionDrift {
    pub fn status(&self) -> DriftStatus {
        match (&self.latest_version, self.stale) {
            (None, _) => DriftStatus::Unresolved,
            (Some(_), true) => DriftStatus::Old,
            (Some(_), false) => DriftStatus::Latest,
        }
    }
}

/// A source of drift results
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Find and resolve every reference of this detector's category
    async fn detect(&self, documents: &DocumentSet) -> Vec<VersionDrift>;
}

/// A located reference waiting for its catalog lookup
pub(crate) struct PendingReference {
    pub registry: Arc<dyn Registry>,
    pub package: PackageRef,
    pub constraint: Constraint,
    pub name: String,
}

/// Resolve one reference; `None` when it has to be skipped
async fn resolve_reference(kind: DetectorKind, pending: PendingReference) -> Option<VersionDrift> {
    let PendingReference {
        registry,
        package,
        constraint,
        name,
    } = pending;

    let versions = match registry.fetch_all_versions(&package).await {
        Ok(versions) => versions,
        Err(e) => {
            warn!("Skipping {} {}: {}", kind, name, e);
            return None;
        }
    };

    match resolve(&constraint, &versions.versions) {
        Ok(resolution) => {
            if resolution.stale {
                info!(
                    "Using older version of {}: current={}, latest={}",
                    name, resolution.current, resolution.latest
                );
            }
            Some(VersionDrift {
                detector: kind,
                name,
                current_version: resolution.current,
                latest_version: Some(resolution.latest),
                stale: resolution.stale,
            })
        }
        Err(ResolveError::NoVersionsAvailable) => {
            info!("No versions of {} advertised by {}", name, package);
            Some(VersionDrift {
                detector: kind,
                name,
                current_version: constraint.to_string(),
                latest_version: None,
                stale: false,
            })
        }
        Err(e) => {
            warn!("Skipping {} {}: {}", kind, name, e);
            None
        }
    }
}

/// Resolve references concurrently, starting each fetch `stagger` after the
/// previous one. Output keeps the input order.
pub(crate) async fn resolve_all(
    kind: DetectorKind,
    pending: Vec<PendingReference>,
    stagger: Duration,
) -> Vec<VersionDrift> {
    debug!("Resolving {} {} references", pending.len(), kind);

    let futures = pending.into_iter().enumerate().map(|(i, reference)| {
        let delay = stagger.saturating_mul(i as u32);
        async move {
            sleep(delay).await;
            resolve_reference(kind, reference).await
        }
    });

    join_all(futures).await.into_iter().flatten().collect()
}

/// Create the enabled detectors in their reporting order
pub fn create_default_detectors(config: &Config) -> Vec<Box<dyn Detector>> {
    let timeout = config.fetch.timeout();
    let stagger = config.fetch.stagger_delay();
    let container = &config.registries.container;

    let charts: Arc<dyn Registry> = Arc::new(HelmRepositoryRegistry::new(timeout));
    let images: Arc<dyn Registry> = Arc::new(
        ContainerRegistry::new(timeout)
            .with_endpoint(container.endpoint.clone())
            .with_plain_http(container.plain_http.clone()),
    );

    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
    if config.detectors.helm_release.enabled {
        detectors.push(Box::new(
            HelmReleaseDetector::new(charts, images.clone()).with_stagger(stagger),
        ));
    }
    if config.detectors.image.enabled {
        detectors.push(Box::new(ImageDetector::new(images).with_stagger(stagger)));
    }
    detectors
}
