//! Error types for the PSD writer.
//!
//! This module defines all error types that can occur while assembling and
//! serializing a layered document.

/// Result type alias for PSD writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document serialization.
///
/// All variants describe malformed caller input. They are detected before or
/// during the single write pass and abort the whole serialization; no partial
/// output is ever surfaced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document width or height is not positive
    #[error("Invalid document size: {width}x{height} (both dimensions must be positive)")]
    InvalidDocumentSize {
        /// Declared document width
        width: u32,
        /// Declared document height
        height: u32,
    },

    /// Composite pixel buffer disagrees with the document dimensions
    #[error("Dimension mismatch: composite is {actual_width}x{actual_height}, document is {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Width of the resolved composite buffer
        actual_width: u32,
        /// Height of the resolved composite buffer
        actual_height: u32,
        /// Document width
        expected_width: u32,
        /// Document height
        expected_height: u32,
    },

    /// A 4-character signature constraint was violated
    #[error("Invalid signature '{0}': expected exactly 4 ASCII characters")]
    InvalidSignature(String),

    /// A layer node declares both pixel content and children
    #[error("Invalid layer shape for '{0}': a layer cannot carry both pixels and children")]
    InvalidLayerShape(String),

    /// IO error while writing the finished document to disk
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
