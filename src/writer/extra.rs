//! Additional-layer-info records.
//!
//! Each record is `8BIM` + a 4-byte key + a framed data block. Which records
//! a flattened layer gets is decided by a closed table of (key, predicate,
//! writer) entries, consumed in order; the record writer stays agnostic to
//! what each entry emits.

use crate::error::Result;
use crate::writer::byte_sink::ByteSink;
use crate::writer::flatten::FlatLayer;
use crate::writer::section::write_section;

/// One entry of the additional-info table.
pub struct InfoHandler {
    /// 4-character record key
    pub key: &'static str,
    /// Whether this record applies to the given flattened layer
    pub has: fn(&FlatLayer<'_>) -> bool,
    /// Emit the record's data block (framing is handled by the caller)
    pub write: fn(&mut ByteSink, &FlatLayer<'_>) -> Result<()>,
}

static HANDLERS: [InfoHandler; 2] = [
    InfoHandler {
        key: "luni",
        has: has_unicode_name,
        write: write_unicode_name,
    },
    InfoHandler {
        key: "lsct",
        has: has_section_divider,
        write: write_section_divider,
    },
];

/// The records this writer emits, in emission order.
pub fn handlers() -> &'static [InfoHandler] {
    &HANDLERS
}

/// Write every applicable additional-info record for one flattened layer.
pub fn write_info_records(sink: &mut ByteSink, entry: &FlatLayer<'_>) -> Result<()> {
    for handler in handlers() {
        if !(handler.has)(entry) {
            continue;
        }
        sink.write_signature("8BIM")?;
        sink.write_signature(handler.key)?;
        if handler.key == "luni" {
            // Established exception: this key's length field excludes
            // trailing padding, and the record is followed by 2 extra zero
            // bytes. Preserved exactly; do not generalize.
            write_section(sink, 1, false, |sink| (handler.write)(sink, entry))?;
            sink.write_zeros(2);
        } else {
            write_section(sink, 4, true, |sink| (handler.write)(sink, entry))?;
        }
    }
    Ok(())
}

fn has_unicode_name(entry: &FlatLayer<'_>) -> bool {
    !entry.name().is_empty()
}

fn write_unicode_name(sink: &mut ByteSink, entry: &FlatLayer<'_>) -> Result<()> {
    sink.write_unicode_string(entry.name());
    Ok(())
}

fn has_section_divider(entry: &FlatLayer<'_>) -> bool {
    entry.divider().is_some()
}

fn write_section_divider(sink: &mut ByteSink, entry: &FlatLayer<'_>) -> Result<()> {
    let kind = entry.divider().expect("predicate checked the divider");
    sink.write_u32(kind.wire_code());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Layer;
    use crate::geometry::Rect;
    use crate::writer::flatten::{flatten, DividerKind};

    #[test]
    fn test_content_layer_gets_unicode_name_only() {
        let layer = Layer::image("ab", Rect::default());
        let entry = FlatLayer::Content(&layer);
        let mut sink = ByteSink::new();
        write_info_records(&mut sink, &entry).unwrap();
        // 8BIM + luni + len(8) + count(2) + "ab" UTF-16 + 2 trailing zeros.
        let expected: &[u8] = &[
            b'8', b'B', b'I', b'M', b'l', b'u', b'n', b'i', 0, 0, 0, 8, 0, 0, 0, 2, 0, b'a', 0,
            b'b', 0, 0,
        ];
        assert_eq!(sink.as_slice(), expected);
    }

    #[test]
    fn test_luni_length_excludes_its_trailing_zeros() {
        let layer = Layer::image("abc", Rect::default());
        let entry = FlatLayer::Content(&layer);
        let mut sink = ByteSink::new();
        write_info_records(&mut sink, &entry).unwrap();
        // Data is count(4) + 3 units(6) = 10 bytes; two zeros follow anyway.
        assert_eq!(&sink.as_slice()[8..12], &[0, 0, 0, 10]);
        assert_eq!(sink.len(), 8 + 4 + 10 + 2);
        assert_eq!(&sink.as_slice()[sink.len() - 2..], &[0, 0]);
    }

    #[test]
    fn test_group_records_get_divider_data() {
        let group = Layer::group("G")
            .with_child(Layer::image("a", Rect::default()))
            .unwrap();
        let forest = [group];
        let flat = flatten(&forest).unwrap();

        // The bounding divider carries its conventional name plus lsct 3.
        let mut sink = ByteSink::new();
        write_info_records(&mut sink, &flat[0]).unwrap();
        let bytes = sink.as_slice();
        let lsct = bytes.len() - 16;
        assert_eq!(&bytes[lsct..lsct + 8], b"8BIMlsct");
        assert_eq!(&bytes[lsct + 8..], &[0, 0, 0, 4, 0, 0, 0, 3]);

        // The group's own record closes with its open-folder subtype.
        let mut sink = ByteSink::new();
        write_info_records(&mut sink, &flat[2]).unwrap();
        assert_eq!(flat[2].divider(), Some(DividerKind::OpenFolder));
        let bytes = sink.as_slice();
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_empty_placeholder_gets_no_records() {
        let mut sink = ByteSink::new();
        write_info_records(&mut sink, &FlatLayer::Empty).unwrap();
        assert!(sink.is_empty());
    }
}
