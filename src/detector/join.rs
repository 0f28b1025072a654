//! Release-to-repository cross reference

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use thiserror::Error;
use tracing::warn;

use crate::manifest::flux::{HELM_REPOSITORY_KIND, SOURCE_GROUP, SourceRecord};
use crate::manifest::types::{DocumentSet, ObjectKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Source {0} not found")]
    SourceNotFound(ObjectKey),
}

/// HelmRepositories of one document set, keyed by (kind, name, namespace)
#[derive(Debug, Default)]
pub struct SourceIndex {
    sources: HashMap<ObjectKey, SourceRecord>,
}

impl SourceIndex {
    /// Index every HelmRepository in the set.
    ///
    /// When the same key is declared twice the first declaration wins.
    pub fn build(documents: &DocumentSet) -> Self {
        let mut index = Self::default();

        for document in documents.of_kind(SOURCE_GROUP, HELM_REPOSITORY_KIND) {
            match SourceRecord::from_document(document) {
                Ok(Some(source)) => index.insert(source),
                Ok(None) => {}
                Err(e) => warn!("Skipping HelmRepository in {}: {}", document.location(), e),
            }
        }

        index
    }

    pub fn insert(&mut self, source: SourceRecord) {
        match self.sources.entry(source.key.clone()) {
            Entry::Occupied(existing) => warn!(
                "Duplicate declaration of {}: keeping {}, ignoring {}",
                source.key,
                existing.get().url,
                source.url
            ),
            Entry::Vacant(slot) => {
                slot.insert(source);
            }
        }
    }

    pub fn get(&self, key: &ObjectKey) -> Result<&SourceRecord, JoinError> {
        self.sources
            .get(key)
            .ok_or_else(|| JoinError::SourceNotFound(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
