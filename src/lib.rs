//! Detects outdated Helm chart releases and container image tags in a tree of
//! Kubernetes manifests.

pub mod config;
pub mod detector;
pub mod logging;
pub mod manifest;
pub mod report;
pub mod version;
