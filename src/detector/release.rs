//! Flux HelmRelease chart drift

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::detector::join::SourceIndex;
use crate::detector::{Detector, DetectorKind, PendingReference, VersionDrift, resolve_all};
use crate::manifest::flux::{HELM_RELEASE_GROUP, HELM_RELEASE_KIND, ReleaseRecord};
use crate::manifest::types::DocumentSet;
use crate::version::constraint::Constraint;
use crate::version::registry::Registry;

/// Compares each HelmRelease chart version with the charts its
/// HelmRepository publishes
pub struct HelmReleaseDetector {
    /// Chart repository indexes
    charts: Arc<dyn Registry>,
    /// OCI registries, for repositories of type `oci`
    images: Arc<dyn Registry>,
    stagger: Duration,
}

impl HelmReleaseDetector {
    pub fn new(charts: Arc<dyn Registry>, images: Arc<dyn Registry>) -> Self {
        Self {
            charts,
            images,
            stagger: Duration::from_millis(FETCH_STAGGER_DELAY_MS),
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    fn pending_references(&self, documents: &DocumentSet) -> Vec<PendingReference> {
        let sources = SourceIndex::build(documents);
        let mut pending = Vec::new();

        for document in documents.of_kind(HELM_RELEASE_GROUP, HELM_RELEASE_KIND) {
            let release = match ReleaseRecord::from_document(document) {
                Ok(Some(release)) => release,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping HelmRelease in {}: {}", document.location(), e);
                    continue;
                }
            };

            let Some(declared) = release.version.as_deref() else {
                info!(
                    "Skipping HelmRelease {}/{}: no chart version declared",
                    release.namespace, release.name
                );
                continue;
            };

            let constraint = match Constraint::parse(declared) {
                Ok(constraint) => constraint,
                Err(e) => {
                    warn!(
                        "Skipping HelmRelease {}/{}: {}",
                        release.namespace, release.name, e
                    );
                    continue;
                }
            };

            let source = match sources.get(&release.source_ref) {
                Ok(source) => source,
                Err(e) => {
                    warn!(
                        "Skipping HelmRelease {}/{}: {}",
                        release.namespace, release.name, e
                    );
                    continue;
                }
            };

            let Some(package) = source.package_ref(&release.chart) else {
                warn!(
                    "Skipping HelmRelease {}/{}: unusable repository URL {:?}",
                    release.namespace, release.name, source.url
                );
                continue;
            };

            let registry = if source.is_oci() {
                self.images.clone()
            } else {
                self.charts.clone()
            };

            pending.push(PendingReference {
                registry,
                package,
                constraint,
                name: release.chart,
            });
        }

        pending
    }
}

#[async_trait::async_trait]
impl Detector for HelmReleaseDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::HelmRelease
    }

    async fn detect(&self, documents: &DocumentSet) -> Vec<VersionDrift> {
        let pending = self.pending_references(documents);
        resolve_all(self.kind(), pending, self.stagger).await
    }
}
