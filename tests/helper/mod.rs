//! Shared integration test utilities

#![allow(dead_code)]

pub mod manifests;
pub mod registry;

pub use manifests::{helm_release, helm_repository, join_documents, pod, write_tree};
pub use registry::MockRegistry;
