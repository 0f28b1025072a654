//! Registry implementations for fetching package versions

pub mod helm;
pub mod oci;

pub use helm::HelmRepositoryRegistry;
pub use oci::ContainerRegistry;
