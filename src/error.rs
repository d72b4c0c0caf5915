use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cocomask operations.
#[derive(Debug, Error)]
pub enum CocomaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read mask raster {path}: {message}")]
    RasterRead { path: PathBuf, message: String },

    #[error("Failed to write mask raster {path}: {message}")]
    RasterWrite { path: PathBuf, message: String },

    /// A label requested for extraction does not occur in the mask.
    #[error("Label {label} does not occur in the mask")]
    EmptyInstance { label: u32 },

    /// A mask label has no entry in the category mapping.
    #[error("Label {label} has no category mapping")]
    UnknownCategory { label: u32 },

    /// An annotation references an image or category that does not exist.
    #[error("Annotation {annotation_id} references non-existent {kind} {referenced_id}")]
    DanglingReference {
        annotation_id: u64,
        kind: &'static str,
        referenced_id: u64,
    },

    /// Two elements of one document collection share an id.
    #[error("Duplicate {kind} ID {id}")]
    DuplicateId { kind: &'static str, id: u64 },

    /// Two documents declare the same category name with conflicting metadata.
    #[error("Category '{name}' is incompatible between documents: {detail}")]
    IncompatibleCategory { name: String, detail: String },

    /// The category definition file failed validation.
    #[error("Invalid category definition: {0}")]
    InvalidCategoryDefinition(String),

    /// A polygon that cannot be rasterized deterministically.
    #[error("Degenerate geometry: {0}")]
    Geometry(String),

    #[error("Batch completed with {failed} failed unit(s) out of {total}")]
    BatchFailed { failed: usize, total: usize },

    #[error("Health check failed with {errors} error(s) and {warnings} warning(s)")]
    HealthCheckFailed { errors: usize, warnings: usize },

    #[error("No mask rasters found in {path}")]
    NoInputs { path: PathBuf },
}
