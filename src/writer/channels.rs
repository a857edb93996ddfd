//! Per-layer channel layout.
//!
//! Decides which channels a flattened record stores (color, optional
//! transparency, optional user mask), applies the bounding-box trim, and
//! produces each channel's compressed payload through the run-length codec.
//! Layer pixel sources are interleaved RGBA; mask sources contribute their
//! first channel.

use bytes::Bytes;

use crate::compress::compress_plane;
use crate::document::Layer;
use crate::error::Result;
use crate::geometry::Rect;
use crate::raster::trim_to_opaque_bounds;
use crate::writer::flatten::FlatLayer;

/// Channel identities, in the order records emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    /// Red plane
    Red,
    /// Green plane
    Green,
    /// Blue plane
    Blue,
    /// Transparency (alpha) plane
    Transparency,
    /// User-mask plane
    UserMask,
}

impl ChannelId {
    /// The i16 identity written in the channel table.
    pub fn wire_code(&self) -> i16 {
        match self {
            ChannelId::Red => 0,
            ChannelId::Green => 1,
            ChannelId::Blue => 2,
            ChannelId::Transparency => -1,
            ChannelId::UserMask => -2,
        }
    }

    /// Byte offset of this channel's sample within an RGBA pixel.
    fn sample_offset(&self) -> usize {
        match self {
            ChannelId::Red => 0,
            ChannelId::Green => 1,
            ChannelId::Blue => 2,
            ChannelId::Transparency => 3,
            ChannelId::UserMask => 0,
        }
    }
}

/// Stored length of a channel with no payload: just the compression tag.
pub const PLACEHOLDER_CHANNEL_LEN: u32 = 2;

/// One channel of a flattened record.
#[derive(Debug)]
pub struct ChannelDescriptor {
    /// Channel identity
    pub id: ChannelId,
    /// Byte length stored in the channel table (payload plus the 2-byte
    /// compression tag, or the placeholder length)
    pub length: u32,
    /// Compressed payload; absent for degenerate layers
    pub payload: Option<Bytes>,
}

/// The resolved channel layout of one flattened record.
#[derive(Debug)]
pub struct LayerChannels {
    /// Final stored bounding box (trimmed, or collapsed for empty layers)
    pub rect: Rect,
    /// The mask's resolved box, kept for the mask-data block
    pub mask_rect: Option<Rect>,
    /// Channel descriptors in emission order
    pub channels: Vec<ChannelDescriptor>,
}

/// Compute the channel layout and compressed payloads for one flattened
/// record.
///
/// `is_background` marks the implicit background slot (the bottom-most
/// content record), which omits its transparency channel while fully opaque
/// and unmasked. `scratch` is the document-wide compression scratch buffer.
pub fn build_layer_channels(
    scratch: &mut Vec<u8>,
    entry: &FlatLayer<'_>,
    is_background: bool,
    trim_enabled: bool,
) -> Result<LayerChannels> {
    let layer = match entry.layer() {
        Some(layer) => layer,
        // Divider pseudo-layers and the empty-forest placeholder carry a
        // single placeholder transparency channel and a zero-size box.
        None => {
            return Ok(LayerChannels {
                rect: Rect::default(),
                mask_rect: None,
                channels: vec![placeholder_descriptor()],
            });
        }
    };

    let declared = layer.rect();
    let mut layout = match entry {
        FlatLayer::Content(_) => content_channels(scratch, layer, is_background, trim_enabled)?,
        // A group's own record never stores pixels.
        _ => LayerChannels {
            rect: declared.collapsed(),
            mask_rect: None,
            channels: vec![placeholder_descriptor()],
        },
    };

    if layer.mask().is_some() {
        let (mask_rect, descriptor) = mask_channel(scratch, layer);
        layout.mask_rect = Some(mask_rect);
        if let Some(descriptor) = descriptor {
            layout.channels.push(descriptor);
        }
    }
    Ok(layout)
}

fn placeholder_descriptor() -> ChannelDescriptor {
    ChannelDescriptor {
        id: ChannelId::Transparency,
        length: PLACEHOLDER_CHANNEL_LEN,
        payload: None,
    }
}

fn content_channels(
    scratch: &mut Vec<u8>,
    layer: &Layer,
    is_background: bool,
    trim_enabled: bool,
) -> Result<LayerChannels> {
    let declared = layer.rect();
    let source = match layer.source() {
        Some(source) => source,
        None => {
            return Ok(LayerChannels {
                rect: declared.collapsed(),
                mask_rect: None,
                channels: vec![placeholder_descriptor()],
            });
        }
    };

    let buffer = source.resolve();
    let full = Rect::new(0, 0, buffer.height() as i32, buffer.width() as i32);
    let local = if trim_enabled {
        trim_to_opaque_bounds(&buffer)
    } else {
        full
    };
    if local.is_empty() {
        return Ok(LayerChannels {
            rect: declared.collapsed(),
            mask_rect: None,
            channels: vec![placeholder_descriptor()],
        });
    }
    let rect = local.offset(declared.left, declared.top);

    let mut ids = vec![ChannelId::Red, ChannelId::Green, ChannelId::Blue];
    if !is_background || buffer.has_transparency() || layer.mask().is_some() {
        ids.push(ChannelId::Transparency);
    }

    let mut channels = Vec::with_capacity(ids.len());
    for id in ids {
        let plane = compress_plane(scratch, &buffer, local, id.sample_offset())
            .expect("non-empty trimmed region");
        channels.push(ChannelDescriptor {
            id,
            length: plane.payload_len() as u32 + 2,
            payload: Some(plane.into_payload()),
        });
    }

    Ok(LayerChannels {
        rect,
        mask_rect: None,
        channels,
    })
}

/// Resolve a layer's mask box and, when it covers pixels, its compressed
/// user-mask channel. The box is declared or inferred from the mask source's
/// dimensions at the layer's top-left; it is never trimmed.
fn mask_channel(scratch: &mut Vec<u8>, layer: &Layer) -> (Rect, Option<ChannelDescriptor>) {
    let mask = layer.mask().expect("caller checked the mask");
    let buffer = mask.source().resolve();
    let declared = layer.rect();
    let rect = mask.rect().unwrap_or_else(|| {
        Rect::from_size(declared.top, declared.left, buffer.width(), buffer.height())
    });
    if rect.is_empty() {
        return (rect, None);
    }

    let region = Rect::new(
        0,
        0,
        (rect.height().min(buffer.height())) as i32,
        (rect.width().min(buffer.width())) as i32,
    );
    let descriptor = compress_plane(scratch, &buffer, region, ChannelId::UserMask.sample_offset())
        .map(|plane| ChannelDescriptor {
            id: ChannelId::UserMask,
            length: plane.payload_len() as u32 + 2,
            payload: Some(plane.into_payload()),
        });
    (rect, descriptor)
}
