//! End-to-end tests for document serialization.
//!
//! Walks the produced byte stream with a small cursor reader and checks the
//! container invariants: header fields, framed section lengths, record
//! layout, channel payload order, and the composite image block.

use psd_oxide::{
    BlendMode, Layer, LayerMask, PixelBuffer, PsdDocument, PsdWriter, PsdWriterConfig, Rect,
};

/// Minimal big-endian cursor over the produced bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let v = self.data[self.pos];
        self.pos += 1;
        v
    }

    fn u16(&mut self) -> u16 {
        let v = u16::from_be_bytes(self.data[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        v
    }

    fn i16(&mut self) -> i16 {
        let v = i16::from_be_bytes(self.data[self.pos..self.pos + 2].try_into().unwrap());
        self.pos += 2;
        v
    }

    fn u32(&mut self) -> u32 {
        let v = u32::from_be_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        v
    }

    fn i32(&mut self) -> i32 {
        let v = i32::from_be_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        v
    }

    fn bytes(&mut self, len: usize) -> &'a [u8] {
        let v = &self.data[self.pos..self.pos + len];
        self.pos += len;
        v
    }

    fn skip(&mut self, len: usize) {
        self.pos += len;
        assert!(self.pos <= self.data.len());
    }
}

fn opaque(width: u32, height: u32, fill: [u8; 4]) -> PixelBuffer {
    let mut data = Vec::new();
    for _ in 0..width * height {
        data.extend_from_slice(&fill);
    }
    PixelBuffer::from_rgba(width, height, data)
}

/// Skip the header, color-mode, and resource sections; leave the reader at
/// the layer-and-mask section length.
fn seek_layer_mask<'a>(reader: &mut Reader<'a>) {
    reader.skip(26);
    let color_mode_len = reader.u32();
    reader.skip(color_mode_len as usize);
    let resources_len = reader.u32();
    reader.skip(resources_len as usize);
}

#[test]
fn test_single_opaque_layer_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pixels = opaque(4, 4, [10, 20, 30, 255]);
    let doc = PsdDocument::new(4, 4)
        .with_composite(pixels.clone())
        .with_layer(
            Layer::image("Background", Rect::new(0, 0, 4, 4))
                .with_source(pixels)
                .unwrap(),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    // Header: opaque composite keeps 3 channels.
    assert_eq!(r.bytes(4), b"8BPS");
    assert_eq!(r.u16(), 1);
    assert_eq!(r.bytes(6), &[0; 6]);
    assert_eq!(r.u16(), 3);
    assert_eq!(r.u32(), 4); // height
    assert_eq!(r.u32(), 4); // width
    assert_eq!(r.u16(), 8);
    assert_eq!(r.u16(), 3); // RGB

    // Color-mode data is an empty stub.
    assert_eq!(r.u32(), 0);

    let resources_len = r.u32();
    r.skip(resources_len as usize);

    let lm_len = r.u32();
    let lm_end = r.pos + lm_len as usize;
    let info_len = r.u32();
    assert_eq!(info_len % 2, 0);

    // One record; positive count, since the composite is fully opaque.
    assert_eq!(r.i16(), 1);
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 4, 4));

    // The sole background layer is opaque and unmasked: no transparency
    // channel.
    assert_eq!(r.u16(), 3);
    let mut lengths = Vec::new();
    for expected_id in 0..3i16 {
        assert_eq!(r.i16(), expected_id);
        lengths.push(r.u32());
    }

    assert_eq!(r.bytes(4), b"8BIM");
    assert_eq!(r.bytes(4), b"norm");
    assert_eq!(r.u8(), 255); // opacity
    assert_eq!(r.u8(), 0); // clipping
    assert_eq!(r.u8(), 0x08); // flags-valid only
    assert_eq!(r.u8(), 0); // filler

    let extra_len = r.u32();
    let extra_end = r.pos + extra_len as usize;
    assert_eq!(r.u32(), 0); // no mask
    let ranges_len = r.u32();
    assert_eq!(ranges_len, 8 * (1 + 3));
    r.skip(ranges_len as usize);
    assert_eq!(r.u8(), 10); // name length
    assert_eq!(r.bytes(10), b"Background");
    r.skip(1); // name padding to a 4-byte multiple
    assert_eq!(r.bytes(4), b"8BIM");
    assert_eq!(r.bytes(4), b"luni");
    r.pos = extra_end;

    // Channel payloads in record order, each led by the RLE tag.
    for len in &lengths {
        assert_eq!(r.u16(), 1);
        r.skip(*len as usize - 2);
    }

    // Global layer mask stub closes the section.
    assert_eq!(r.u32(), 0);
    assert_eq!(r.pos, lm_end);

    // Composite: tag, 3 planes of 4 row counts, then the packed rows.
    assert_eq!(r.u16(), 1);
    let mut total_rows = 0usize;
    for _ in 0..3 * 4 {
        total_rows += r.u16() as usize;
    }
    r.skip(total_rows);
    assert_eq!(r.pos, bytes.len());
}

#[test]
fn test_framed_section_lengths_are_consistent() {
    let doc = PsdDocument::new(7, 3)
        .with_composite(opaque(7, 3, [1, 2, 3, 255]))
        .with_layer(
            Layer::image("odd", Rect::new(0, 0, 3, 7))
                .with_source(opaque(7, 3, [9, 9, 9, 255]))
                .unwrap(),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    r.skip(26);
    let color_mode_len = r.u32();
    assert_eq!(color_mode_len, 0);

    let resources_len = r.u32();
    r.skip(resources_len as usize);

    let lm_len = r.u32();
    assert_eq!(lm_len % 2, 0);
    let lm_start = r.pos;
    let info_len = r.u32();
    assert_eq!(info_len % 2, 0);
    r.skip(info_len as usize);
    // Layer info plus the 4-byte global mask stub fills the section.
    assert_eq!(r.u32(), 0);
    assert_eq!(r.pos, lm_start + lm_len as usize);
}

#[test]
fn test_layer_count_negated_when_composite_has_alpha() {
    let mut data = vec![255u8; 4 * 4 * 4];
    data[3] = 254;
    let doc = PsdDocument::new(4, 4)
        .with_composite(PixelBuffer::from_rgba(4, 4, data))
        .with_layer(
            Layer::image("a", Rect::new(0, 0, 4, 4))
                .with_source(opaque(4, 4, [1, 1, 1, 255]))
                .unwrap(),
        )
        .with_layer(
            Layer::image("b", Rect::new(0, 0, 4, 4))
                .with_source(opaque(4, 4, [2, 2, 2, 255]))
                .unwrap(),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    // Four header channels once the composite carries alpha.
    r.skip(12);
    assert_eq!(r.u16(), 4);
    r.pos = 0;

    seek_layer_mask(&mut r);
    r.skip(8); // section + subsection lengths
    assert_eq!(r.i16(), -2);
}

#[test]
fn test_empty_forest_writes_placeholder_record() {
    let doc = PsdDocument::new(2, 2).with_composite(opaque(2, 2, [5, 5, 5, 255]));
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    seek_layer_mask(&mut r);
    r.skip(8);
    assert_eq!(r.i16(), 1);
    // Zero-size box, single placeholder transparency channel.
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 0, 0));
    assert_eq!(r.u16(), 1);
    assert_eq!(r.i16(), -1);
    assert_eq!(r.u32(), 2);
}

#[test]
fn test_group_flattening_on_the_wire() {
    let group = Layer::group("Folder")
        .with_expanded(false)
        .with_child(
            Layer::image("inner", Rect::new(0, 0, 2, 2))
                .with_source(opaque(2, 2, [1, 2, 3, 255]))
                .unwrap(),
        )
        .unwrap();
    let doc = PsdDocument::new(2, 2)
        .with_composite(opaque(2, 2, [0, 0, 0, 255]))
        .with_layer(group);
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    seek_layer_mask(&mut r);
    r.skip(8);
    // Bounding divider + child + group header.
    assert_eq!(r.i16(), 3);

    // First record is the zero-size bounding divider with its conventional
    // name and an lsct subtype of 3.
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 0, 0));
    assert_eq!(r.u16(), 1);
    r.skip(6 + 12);
    let extra_len = r.u32() as usize;
    let extra = r.bytes(extra_len);
    let name_at = 4 + 4 + 8 * 2; // empty mask + framed ranges for 1 channel
    assert_eq!(extra[name_at] as usize, "</Layer group>".len());
    assert_eq!(&extra[name_at + 1..name_at + 15], b"</Layer group>");
    let lsct = extra.len() - 16;
    assert_eq!(&extra[lsct..lsct + 8], b"8BIMlsct");
    assert_eq!(&extra[lsct + 12..], &[0, 0, 0, 3]);

    // Second record is the content layer.
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 2, 2));
    let channels = r.u16();
    assert_eq!(channels, 4);
    r.skip(channels as usize * 6 + 12);
    let extra_len = r.u32() as usize;
    r.skip(extra_len);

    // Third record is the group's own, closed-folder subtype 2.
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 0, 0));
    r.skip(2 + 6);
    assert_eq!(r.bytes(4), b"8BIM");
    assert_eq!(r.bytes(4), b"norm");
    r.skip(4);
    let extra_len = r.u32() as usize;
    let extra = r.bytes(extra_len);
    let lsct = extra.len() - 16;
    assert_eq!(&extra[lsct..lsct + 8], b"8BIMlsct");
    assert_eq!(&extra[lsct + 12..], &[0, 0, 0, 2]);
}

#[test]
fn test_opacity_and_blend_mode_on_the_wire() {
    let doc = PsdDocument::new(2, 2)
        .with_composite(opaque(2, 2, [0, 0, 0, 255]))
        .with_layer(
            Layer::image("half", Rect::new(0, 0, 2, 2))
                .with_source(opaque(2, 2, [1, 1, 1, 255]))
                .unwrap()
                .with_opacity(0.5)
                .with_blend_mode(BlendMode::Multiply),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    seek_layer_mask(&mut r);
    r.skip(8 + 2 + 16);
    let channels = r.u16();
    r.skip(channels as usize * 6);
    assert_eq!(r.bytes(4), b"8BIM");
    assert_eq!(r.bytes(4), b"mul ");
    assert_eq!(r.u8(), 128);
}

#[test]
fn test_masked_layer_channel_set_and_mask_block() {
    let mask = LayerMask::new(PixelBuffer::from_gray(2, 2, vec![100; 4]))
        .with_default_color(0)
        .with_user_feather(2.5);
    let doc = PsdDocument::new(2, 2)
        .with_composite(opaque(2, 2, [0, 0, 0, 255]))
        .with_layer(
            Layer::image("masked", Rect::new(0, 0, 2, 2))
                .with_source(opaque(2, 2, [1, 1, 1, 255]))
                .unwrap()
                .with_mask(mask),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);

    seek_layer_mask(&mut r);
    r.skip(8 + 2 + 16);

    // RGBA plus the user mask.
    assert_eq!(r.u16(), 5);
    let ids: Vec<i16> = (0..5).map(|_| { let id = r.i16(); r.skip(4); id }).collect();
    assert_eq!(ids, vec![0, 1, 2, -1, -2]);

    r.skip(12);
    let _extra_len = r.u32();
    let mask_len = r.u32() as usize;
    // rect + color + flags + params + feather f64 + reserved zeros.
    assert_eq!(mask_len, 16 + 1 + 1 + 1 + 8 + 2 + 1);
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 2, 2));
    assert_eq!(r.u8(), 0); // default color
    assert_eq!(r.u8(), 0x10); // parameters present
    assert_eq!(r.u8(), 0x02); // user feather bit
    assert_eq!(f64::from_be_bytes(r.bytes(8).try_into().unwrap()), 2.5);
}

#[test]
fn test_trim_disabled_keeps_declared_extent() {
    let mut data = vec![0u8; 4 * 4 * 4];
    data[0..4].copy_from_slice(&[9, 9, 9, 255]); // single opaque corner pixel
    let config = PsdWriterConfig::default().with_trim_layers(false);
    let doc = PsdDocument::new(4, 4)
        .with_composite(opaque(4, 4, [0, 0, 0, 255]))
        .with_layer(
            Layer::image("untrimmed", Rect::new(0, 0, 4, 4))
                .with_source(PixelBuffer::from_rgba(4, 4, data.clone()))
                .unwrap(),
        );
    let bytes = PsdWriter::with_config(config).write(&doc).unwrap();
    let mut r = Reader::new(&bytes);
    seek_layer_mask(&mut r);
    r.skip(8 + 2);
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 4, 4));

    // With trimming on, the same layer stores only the corner pixel.
    let doc = PsdDocument::new(4, 4)
        .with_composite(opaque(4, 4, [0, 0, 0, 255]))
        .with_layer(
            Layer::image("trimmed", Rect::new(0, 0, 4, 4))
                .with_source(PixelBuffer::from_rgba(4, 4, data))
                .unwrap(),
        );
    let bytes = PsdWriter::new().write(&doc).unwrap();
    let mut r = Reader::new(&bytes);
    seek_layer_mask(&mut r);
    r.skip(8 + 2);
    assert_eq!((r.i32(), r.i32(), r.i32(), r.i32()), (0, 0, 1, 1));
}

#[test]
fn test_save_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.psd");
    let doc = PsdDocument::new(2, 2).with_composite(opaque(2, 2, [1, 2, 3, 255]));

    let writer = PsdWriter::new();
    writer.save(&doc, &path).unwrap();
    let from_disk = std::fs::read(&path).unwrap();
    let in_memory = writer.write(&doc).unwrap();
    assert_eq!(from_disk, in_memory);
    assert_eq!(&from_disk[..4], b"8BPS");
}

#[test]
fn test_thumbnail_resource_present_when_enabled() {
    let config = PsdWriterConfig::default().with_thumbnail(true);
    let doc = PsdDocument::new(8, 8).with_composite(opaque(8, 8, [1, 2, 3, 255]));
    let bytes = PsdWriter::with_config(config).write(&doc).unwrap();
    let mut r = Reader::new(&bytes);
    r.skip(26 + 4);
    let resources_len = r.u32() as usize;
    let resources = r.bytes(resources_len);
    let needle = [b'8', b'B', b'I', b'M', 0x04, 0x0C]; // id 1036
    assert!(resources.windows(6).any(|w| w == needle));
}
