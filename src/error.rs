use std::path::PathBuf;
use thiserror::Error;

/// The main error type for aidmap-sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig { field: &'static str, message: String },

    #[error("Invalid tag pattern '{pattern}': {message}")]
    InvalidTagPattern { pattern: String, message: String },

    #[error("Failed to open input {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch row source {url}: {message}")]
    RowSourceFetch { url: String, message: String },

    #[error("Failed to parse HXL rows from {source_name}: {source}")]
    HxlParse {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("No HXL hashtag row found in the first {scanned} row(s) of {source_name}")]
    MissingTagRow { source_name: String, scanned: usize },

    #[error("Invalid URL built from template '{template}': {message}")]
    UrlTemplate { template: String, message: String },

    #[error("Failed to encode catalog payload for {identifier}: {source}")]
    PayloadEncode {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Catalog payload for {identifier} is not a JSON object: {message}")]
    PayloadShape { identifier: String, message: String },

    #[error("Catalog request '{action}' failed: {message}")]
    CatalogRequest { action: String, message: String },

    #[error("Catalog action '{action}' returned {kind}: {message}")]
    CatalogApi {
        action: String,
        kind: String,
        message: String,
    },

    #[error("Unexpected response from catalog action '{action}': {message}")]
    CatalogResponse { action: String, message: String },

    #[error("Catalog preflight failed: {0}")]
    Preflight(String),

    #[error("Failed to write JSON output: {0}")]
    JsonWrite(#[source] serde_json::Error),
}

impl SyncError {
    /// True for decode errors confined to one input row.
    ///
    /// The row reader can continue past these; I/O errors end the stream.
    pub fn is_row_local(&self) -> bool {
        matches!(self, Self::HxlParse { source, .. } if !source.is_io_error())
    }
}
