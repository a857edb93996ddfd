//! Length-prefixed section framing.
//!
//! Every variable-length block in the container (color-mode data, resource
//! entries, the layer-and-mask block, each layer's extra-data block, each
//! additional-info record) is written the same way: reserve a 4-byte length
//! placeholder, write the body, pad to the section's alignment, backpatch the
//! placeholder. Sections nest freely.

use crate::error::Result;
use crate::writer::byte_sink::ByteSink;

/// Write one length-prefixed section.
///
/// Runs `body`, pads the body with zeros until its length is a multiple of
/// `alignment`, then backpatches the reserved length field. The recorded
/// length covers the padding iff `length_includes_padding`; either way the
/// bytes are written, so a section always ends aligned.
pub fn write_section<F>(
    sink: &mut ByteSink,
    alignment: usize,
    length_includes_padding: bool,
    body: F,
) -> Result<()>
where
    F: FnOnce(&mut ByteSink) -> Result<()>,
{
    debug_assert!(alignment > 0);
    let placeholder = sink.position();
    sink.write_u32(0);
    let body_start = sink.position();
    body(sink)?;

    let body_len = sink.position() - body_start;
    let padding = body_len.next_multiple_of(alignment) - body_len;
    sink.write_zeros(padding);

    let recorded = if length_includes_padding {
        body_len + padding
    } else {
        body_len
    };
    sink.patch_u32(placeholder, recorded as u32);
    Ok(())
}
