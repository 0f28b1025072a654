//! Registry test utilities

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use manifest_drift::version::error::RegistryError;
use manifest_drift::version::registry::Registry;
use manifest_drift::version::types::{PackageRef, PackageVersions};

/// Mock registry serving fixed versions per package name
#[derive(Default)]
pub struct MockRegistry {
    versions: HashMap<String, Vec<String>>,
    requests: Mutex<Vec<PackageRef>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, package: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            package.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Packages requested so far, in call order
    pub fn requests(&self) -> Vec<PackageRef> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn fetch_all_versions(
        &self,
        package: &PackageRef,
    ) -> Result<PackageVersions, RegistryError> {
        self.requests.lock().unwrap().push(package.clone());
        match self.versions.get(&package.name) {
            Some(versions) => Ok(PackageVersions::new(versions.clone())),
            None => Err(RegistryError::Registry {
                reference: package.to_string(),
                reason: "not found".to_string(),
            }),
        }
    }
}
