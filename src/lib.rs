// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PSD Oxide
//!
//! Layered image document writer: serializes a layer/group tree into the
//! PSD binary container.
//!
//! ## Core Features
//!
//! - **Layer trees**: arbitrary-depth groups flattened into the container's
//!   divider-marker convention
//! - **Channel layout**: per-layer color/transparency/mask channels,
//!   run-length compressed
//! - **Trimming**: layers store only their non-transparent extent
//! - **Resources**: resolution and thumbnail entries via a closed handler
//!   table
//! - **Masks**: raster masks with density/feather parameters
//!
//! Writing only: this crate never reads or decodes the format.
//!
//! ## Quick Start
//!
//! ```
//! use psd_oxide::{Layer, PixelBuffer, PsdDocument, PsdWriter, Rect};
//!
//! # fn main() -> psd_oxide::Result<()> {
//! let pixels = PixelBuffer::from_rgba(4, 4, vec![255; 64]);
//! let doc = PsdDocument::new(4, 4)
//!     .with_composite(pixels.clone())
//!     .with_layer(Layer::image("Background", Rect::new(0, 0, 4, 4)).with_source(pixels)?);
//!
//! let bytes = PsdWriter::new().write(&doc)?;
//! assert_eq!(&bytes[..4], b"8BPS");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Document model
pub mod blend;
pub mod document;
pub mod geometry;
pub mod raster;

// Channel compression
pub mod compress;

// Container writing
pub mod writer;

// Re-exports
pub use blend::{BlendMode, ColorMode};
pub use document::{Layer, LayerMask, PsdDocument, Resolution, ResourceSet};
pub use error::{Error, Result};
pub use geometry::Rect;
pub use raster::{Drawable, PixelBuffer, PixelFormat, PixelSource};
pub use writer::{PsdWriter, PsdWriterConfig};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
