//! Error types for wire-format operations.

use thiserror::Error;

/// Errors that can occur while decoding or exporting annotation data.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A polygon did not have exactly four usable corners
    #[error("Invalid polygon: {message}")]
    InvalidPolygon {
        /// Description of what was wrong
        message: String,
    },

    /// No geometry encoding could be decoded from a record
    #[error("Record carries no usable geometry")]
    MissingGeometry,

    /// Invalid coordinate values
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates {
        /// Description of the coordinate error
        message: String,
    },
}

impl FormatError {
    /// Create an invalid polygon error with a message.
    pub fn invalid_polygon(message: impl Into<String>) -> Self {
        Self::InvalidPolygon {
            message: message.into(),
        }
    }

    /// Create an invalid coordinates error.
    pub fn invalid_coordinates(message: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            message: message.into(),
        }
    }
}
