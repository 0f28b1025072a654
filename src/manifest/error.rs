/// Reasons a document fragment or inline reference is excluded from a scan
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// The fragment holds nothing but whitespace and comments
    #[error("Document is empty")]
    Empty,

    /// The fragment is not valid YAML
    #[error("Malformed YAML document: {0}")]
    Malformed(#[from] serde_yaml_ng::Error),

    /// The fragment decoded but has no usable apiVersion/kind pair
    #[error("Document has no apiVersion and kind")]
    MissingDiscriminator,

    /// The discriminators matched a known kind but the body did not have its shape
    #[error("Invalid {kind}: {source}")]
    Projection {
        kind: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// An inline `image:` value could not be read as an image reference
    #[error("Invalid image reference {reference:?}: {reason}")]
    InvalidImageReference { reference: String, reason: String },
}
