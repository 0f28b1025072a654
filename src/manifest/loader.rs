//! Manifest tree loading

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::manifest::classify::classify_text;
use crate::manifest::types::DocumentSet;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read manifest root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest root {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Returns true if the file name ends with one of the given suffixes
pub fn matches_extension(file_name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
}

/// Walk `root` recursively and classify every matching file.
///
/// Only a root that cannot be read is fatal; unreadable entries below it are
/// logged and skipped.
pub fn load_directory(root: &Path, extensions: &[String]) -> Result<DocumentSet, LoadError> {
    let metadata = std::fs::metadata(root).map_err(|source| LoadError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(LoadError::NotADirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| LoadError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut documents = DocumentSet::default();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();
        if !matches_extension(&file_name, extensions) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        let classified = classify_text(&content, Some(path));
        debug!(
            "Classified {} documents in {}",
            classified.len(),
            path.display()
        );
        documents.extend(classified);
    }

    Ok(documents)
}
