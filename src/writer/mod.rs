//! PSD writing module for generating container files.
//!
//! This module turns a [`crate::PsdDocument`] into the binary container.
//!
//! ## Architecture
//!
//! ```text
//! PsdDocument
//!     ↓
//! [flatten] (layer tree → flat list with divider markers)
//!     ↓
//! [channels] (per-layer channel layout + compressed payloads)
//!     ↓
//! [layer_record] (fixed records, then payloads, in matching order)
//!     ↓
//! [PsdWriter] (header, sections, composite image)
//!     ↓
//! [ByteSink] (big-endian primitives, backpatched section lengths)
//!     ↓
//! PSD bytes
//! ```
//!
//! ```ignore
//! use psd_oxide::{PsdDocument, PsdWriter};
//!
//! let doc = PsdDocument::new(640, 480);
//! let bytes = PsdWriter::new().write(&doc)?;
//! ```

mod byte_sink;
mod channels;
mod extra;
mod flatten;
mod layer_record;
mod psd_writer;
mod resources;
mod section;

pub use byte_sink::ByteSink;
pub use channels::{
    build_layer_channels, ChannelDescriptor, ChannelId, LayerChannels, PLACEHOLDER_CHANNEL_LEN,
};
pub use extra::{handlers as info_handlers, InfoHandler};
pub use flatten::{flatten, DividerKind, FlatLayer, BOUNDING_DIVIDER_NAME};
pub use layer_record::{opacity_byte, LayerFlags, MaskFlags, MaskParamFlags};
pub use psd_writer::{PsdWriter, PsdWriterConfig};
pub use resources::{handlers as resource_handlers, ResourceContext, ResourceHandler};
pub use section::write_section;
