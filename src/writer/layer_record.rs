//! Layer record assembly.
//!
//! Records are written in two passes: first every layer's fixed record (box,
//! channel table, blend data, flags, framed extra block), then every layer's
//! channel payloads in the same relative order. The extra block nests the
//! mask-data block, the blending-ranges block, the padded name, and the
//! additional-info records.

use bitflags::bitflags;

use crate::blend::BlendMode;
use crate::error::Result;
use crate::writer::byte_sink::ByteSink;
use crate::writer::channels::LayerChannels;
use crate::writer::extra::write_info_records;
use crate::writer::flatten::FlatLayer;
use crate::writer::section::write_section;

bitflags! {
    /// The layer record's flag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u8 {
        /// Transparency is protected
        const TRANSPARENCY_PROTECTED = 1 << 0;
        /// Layer is hidden
        const HIDDEN = 1 << 1;
        /// A vector mask is present (geometry is not encoded)
        const VECTOR_MASK_PRESENT = 1 << 2;
        /// Always set; marks the byte as carrying valid flags
        const FLAGS_VALID = 1 << 3;
    }
}

bitflags! {
    /// The mask-data block's flag byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaskFlags: u8 {
        /// Position is relative to the layer
        const POSITION_RELATIVE = 1 << 0;
        /// Mask is disabled
        const DISABLED = 1 << 1;
        /// Mask derives from vector data
        const FROM_VECTOR = 1 << 3;
        /// Optional density/feather parameters follow
        const HAS_PARAMETERS = 1 << 4;
    }
}

bitflags! {
    /// Presence bits for the mask's optional parameters, in field order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaskParamFlags: u8 {
        /// User mask density (u8)
        const USER_DENSITY = 1 << 0;
        /// User mask feather (f64)
        const USER_FEATHER = 1 << 1;
        /// Vector mask density (u8)
        const VECTOR_DENSITY = 1 << 2;
        /// Vector mask feather (f64)
        const VECTOR_FEATHER = 1 << 3;
    }
}

/// Scale an opacity in [0, 1] to its stored byte, rounding half up.
pub fn opacity_byte(opacity: f32) -> u8 {
    (opacity * 255.0).round() as u8
}

/// Write one flattened layer's fixed record.
pub fn write_layer_record(
    sink: &mut ByteSink,
    entry: &FlatLayer<'_>,
    layout: &LayerChannels,
) -> Result<()> {
    let rect = layout.rect;
    sink.write_i32(rect.top);
    sink.write_i32(rect.left);
    sink.write_i32(rect.bottom);
    sink.write_i32(rect.right);

    sink.write_u16(layout.channels.len() as u16);
    for channel in &layout.channels {
        sink.write_i16(channel.id.wire_code());
        sink.write_u32(channel.length);
    }

    sink.write_signature("8BIM")?;
    let blend = entry.layer().map_or(BlendMode::Normal, |l| l.blend_mode());
    sink.write_bytes(blend.wire_key());
    sink.write_u8(entry.layer().map_or(255, |l| opacity_byte(l.opacity())));
    sink.write_u8(entry.layer().map_or(0, |l| l.clipping() as u8));

    let mut flags = LayerFlags::FLAGS_VALID;
    if let Some(layer) = entry.layer() {
        flags.set(
            LayerFlags::TRANSPARENCY_PROTECTED,
            layer.protect_transparency(),
        );
        flags.set(LayerFlags::HIDDEN, layer.hidden());
        flags.set(LayerFlags::VECTOR_MASK_PRESENT, layer.vector_mask());
    }
    sink.write_u8(flags.bits());
    sink.write_u8(0); // filler

    write_section(sink, 2, true, |sink| {
        write_mask_block(sink, entry, layout)?;
        write_blending_ranges(sink, layout.channels.len())?;
        sink.write_pascal_string(entry.name(), 4);
        write_info_records(sink, entry)
    })
}

/// Write the nested mask-data block, or an empty section without a mask.
fn write_mask_block(
    sink: &mut ByteSink,
    entry: &FlatLayer<'_>,
    layout: &LayerChannels,
) -> Result<()> {
    let mask = entry.layer().and_then(|l| l.mask());
    let (mask, rect) = match (mask, layout.mask_rect) {
        (Some(mask), Some(rect)) => (mask, rect),
        _ => return write_section(sink, 1, true, |_| Ok(())),
    };

    write_section(sink, 2, true, |sink| {
        sink.write_i32(rect.top);
        sink.write_i32(rect.left);
        sink.write_i32(rect.bottom);
        sink.write_i32(rect.right);
        sink.write_u8(mask.default_color());

        let mut params = MaskParamFlags::empty();
        params.set(MaskParamFlags::USER_DENSITY, mask.user_density().is_some());
        params.set(MaskParamFlags::USER_FEATHER, mask.user_feather().is_some());
        params.set(
            MaskParamFlags::VECTOR_DENSITY,
            mask.vector_density().is_some(),
        );
        params.set(
            MaskParamFlags::VECTOR_FEATHER,
            mask.vector_feather().is_some(),
        );

        let mut flags = MaskFlags::empty();
        flags.set(MaskFlags::POSITION_RELATIVE, mask.position_relative());
        flags.set(MaskFlags::DISABLED, mask.disabled());
        flags.set(MaskFlags::FROM_VECTOR, mask.from_vector());
        flags.set(MaskFlags::HAS_PARAMETERS, !params.is_empty());
        sink.write_u8(flags.bits());

        sink.write_u8(params.bits());
        if let Some(density) = mask.user_density() {
            sink.write_u8(density);
        }
        if let Some(feather) = mask.user_feather() {
            sink.write_f64(feather);
        }
        if let Some(density) = mask.vector_density() {
            sink.write_u8(density);
        }
        if let Some(feather) = mask.vector_feather() {
            sink.write_f64(feather);
        }

        sink.write_zeros(2);
        Ok(())
    })
}

/// Write the blending-ranges block: a default full-range pair for the
/// composite, then one per declared channel.
fn write_blending_ranges(sink: &mut ByteSink, channel_count: usize) -> Result<()> {
    write_section(sink, 1, true, |sink| {
        for _ in 0..(1 + channel_count) {
            sink.write_u32(0x0000_FFFF); // source range
            sink.write_u32(0x0000_FFFF); // destination range
        }
        Ok(())
    })
}

/// Second pass: write one layer's channel payloads, in descriptor order.
///
/// Every channel leads with its compression-method tag; placeholder channels
/// are the raw tag alone.
pub fn write_channel_payloads(sink: &mut ByteSink, layout: &LayerChannels) {
    for channel in &layout.channels {
        match &channel.payload {
            Some(payload) => {
                sink.write_u16(1); // run-length encoded
                sink.write_bytes(payload);
            }
            None => sink.write_u16(0), // raw, no data
        }
    }
}
