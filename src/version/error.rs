use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Failed to fetch catalog {url}: {reason}")]
    CatalogFetch { url: String, reason: String },

    #[error("Failed to parse catalog {url}: {reason}")]
    CatalogParse { url: String, reason: String },

    #[error("Invalid catalog URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Registry error for {reference}: {reason}")]
    Registry { reference: String, reason: String },

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid version constraint: {0:?}")]
    InvalidConstraint(String),

    #[error("No valid versions available")]
    NoVersionsAvailable,
}
