//! Detector aggregation

use serde::Serialize;
use tracing::info;

use crate::detector::{Detector, VersionDrift};
use crate::manifest::types::DocumentSet;

/// Merged results of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Results in detector order, then document order
    pub results: Vec<VersionDrift>,
    /// At least one result is stale
    pub stale: bool,
}

impl DriftReport {
    pub fn new(results: Vec<VersionDrift>) -> Self {
        let stale = results.iter().any(|r| r.stale);
        Self { results, stale }
    }
}

/// Runs detectors in registration order over one document set
#[derive(Default)]
pub struct Scanner {
    detectors: Vec<Box<dyn Detector>>,
}

impl Scanner {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub async fn scan(&self, documents: &DocumentSet) -> DriftReport {
        let mut results = Vec::new();

        for detector in &self.detectors {
            let found = detector.detect(documents).await;
            info!("{} detector produced {} results", detector.kind(), found.len());
            results.extend(found);
        }

        DriftReport::new(results)
    }
}
