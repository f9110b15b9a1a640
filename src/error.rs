//! Unified error handling for the trailfox core.
//!
//! Network, decoding and export failures surface as [`ItineraryError`].
//! Geometry problems inside the live-position metrics do not: those paths
//! return `None` so the caller can simply hide the panel.

use thiserror::Error;

/// Error type for trailfox-core operations.
#[derive(Debug, Error)]
pub enum ItineraryError {
    /// The request did not complete within the client-side timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The API answered with a non-success status
    #[error("API Error: {status} {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body or GeoJSON could not be decoded
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON parsed but does not describe a usable route line
    #[error("Invalid route geometry: {0}")]
    InvalidGeometry(String),

    /// No geometry was available for an operation that needs one
    #[error("Route geometry is missing")]
    MissingGeometry,

    /// GPX serialization failed
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<geojson::Error> for ItineraryError {
    fn from(e: geojson::Error) -> Self {
        ItineraryError::InvalidGeometry(e.to_string())
    }
}

/// Result type alias for trailfox-core operations.
pub type Result<T> = std::result::Result<T, ItineraryError>;
