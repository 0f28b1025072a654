//! Manifest layer
//! - types.rs: ManifestDocument, DocumentSet, ObjectKey
//! - error.rs: ClassificationError
//! - classify.rs: document splitting and classification
//! - loader.rs: directory walking
//! - flux.rs: typed projections of Flux HelmRelease / HelmRepository objects
//! - image.rs: inline container image reference extraction

pub mod classify;
pub mod error;
pub mod flux;
pub mod image;
pub mod loader;
pub mod types;

pub use classify::{classify_document, classify_text, split_documents};
pub use error::ClassificationError;
pub use flux::{ReleaseRecord, SourceRecord};
pub use image::{ImageExtractor, ImageReference};
pub use loader::{LoadError, load_directory};
pub use types::{DocumentSet, ManifestDocument, ObjectKey};
