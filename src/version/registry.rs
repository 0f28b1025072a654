//! Registry trait for fetching package versions from upstream catalogs

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::{PackageRef, PackageVersions};

/// Trait for fetching package versions from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches all versions for a package from the registry
    ///
    /// # Arguments
    /// * `package` - Catalog location and package name
    ///   (e.g., `https://charts.example.com` + `app`, or `docker.io` + `library/nginx`)
    ///
    /// # Returns
    /// * `Ok(PackageVersions)` - Raw version strings in no particular order
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_all_versions(
        &self,
        package: &PackageRef,
    ) -> Result<PackageVersions, RegistryError>;
}
