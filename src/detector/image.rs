//! Container image tag drift

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::detector::{Detector, DetectorKind, PendingReference, VersionDrift, resolve_all};
use crate::manifest::image::ImageExtractor;
use crate::manifest::types::DocumentSet;
use crate::version::constraint::Constraint;
use crate::version::registry::Registry;
use crate::version::semver::is_semver;

/// Compares each `image:` tag with the tags its registry advertises
pub struct ImageDetector {
    registry: Arc<dyn Registry>,
    extractor: ImageExtractor,
    stagger: Duration,
}

impl ImageDetector {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            extractor: ImageExtractor::new(),
            stagger: Duration::from_millis(FETCH_STAGGER_DELAY_MS),
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    fn pending_references(&self, documents: &DocumentSet) -> Vec<PendingReference> {
        let mut pending = Vec::new();

        for document in documents {
            for extracted in self.extractor.extract(document.raw()) {
                let image = match extracted {
                    Ok(image) => image,
                    Err(e) => {
                        warn!("Skipping image in {}: {}", document.location(), e);
                        continue;
                    }
                };

                if !is_semver(&image.tag) {
                    debug!("Skipping {}: tag is not a semantic version", image);
                    continue;
                }

                // A tag pins one version
                let constraint = match Constraint::parse(&image.tag) {
                    Ok(constraint) => constraint,
                    Err(e) => {
                        warn!("Skipping {}: {}", image, e);
                        continue;
                    }
                };

                pending.push(PendingReference {
                    registry: self.registry.clone(),
                    package: image.package_ref(),
                    constraint,
                    name: image.name,
                });
            }
        }

        pending
    }
}

#[async_trait::async_trait]
impl Detector for ImageDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Image
    }

    async fn detect(&self, documents: &DocumentSet) -> Vec<VersionDrift> {
        let pending = self.pending_references(documents);
        resolve_all(self.kind(), pending, self.stagger).await
    }
}
