//! PSD document writer.
//!
//! Assembles the complete container in order: header, color-mode data,
//! image resources, the layer-and-mask block, and the composite image.
//! Serialization is single-threaded and synchronous: it either returns the
//! finished bytes or fails with a typed error before any output surfaces.

use std::borrow::Cow;
use std::path::Path;

use bytes::Bytes;

use crate::compress::compress_plane;
use crate::document::PsdDocument;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::raster::PixelBuffer;
use crate::writer::byte_sink::ByteSink;
use crate::writer::channels::{build_layer_channels, LayerChannels};
use crate::writer::flatten::{flatten, FlatLayer};
use crate::writer::layer_record::{write_channel_payloads, write_layer_record};
use crate::writer::resources::{write_resources_section, ResourceContext};
use crate::writer::section::write_section;

/// Configuration for PSD generation.
#[derive(Debug, Clone)]
pub struct PsdWriterConfig {
    /// Shrink each layer's stored region to its non-transparent extent
    pub trim_layers: bool,
    /// Generate a thumbnail resource from the composite
    pub thumbnail: bool,
}

impl Default for PsdWriterConfig {
    fn default() -> Self {
        Self {
            trim_layers: true,
            thumbnail: false,
        }
    }
}

impl PsdWriterConfig {
    /// Enable or disable bounding-box trimming.
    pub fn with_trim_layers(mut self, trim: bool) -> Self {
        self.trim_layers = trim;
        self
    }

    /// Enable or disable thumbnail generation.
    pub fn with_thumbnail(mut self, thumbnail: bool) -> Self {
        self.thumbnail = thumbnail;
        self
    }
}

/// PSD document writer.
///
/// ```
/// use psd_oxide::{PsdDocument, PsdWriter};
///
/// let doc = PsdDocument::new(4, 4);
/// let bytes = PsdWriter::new().write(&doc).unwrap();
/// assert_eq!(&bytes[..4], b"8BPS");
/// ```
pub struct PsdWriter {
    config: PsdWriterConfig,
}

impl PsdWriter {
    /// Create a writer with default configuration.
    pub fn new() -> Self {
        Self::with_config(PsdWriterConfig::default())
    }

    /// Create a writer with the given configuration.
    pub fn with_config(config: PsdWriterConfig) -> Self {
        Self { config }
    }

    /// Serialize a document to its container bytes.
    pub fn write(&self, document: &PsdDocument) -> Result<Bytes> {
        let (width, height) = (document.width(), document.height());
        if width == 0 || height == 0 {
            return Err(Error::InvalidDocumentSize { width, height });
        }

        let composite = self.resolve_composite(document)?;
        let has_global_alpha = composite.has_transparency();
        let channel_count: u16 = if has_global_alpha { 4 } else { 3 };

        // Flattening validates layer shapes before any bytes are written.
        let flat = flatten(document.layers())?;
        log::debug!(
            "writing {}x{} document: {} flattened records, {} composite channels",
            width,
            height,
            flat.len(),
            channel_count
        );

        let mut scratch = Vec::with_capacity(scratch_capacity(document, &flat));
        let layouts = flat
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let is_background = i == 0 && matches!(entry, FlatLayer::Content(_));
                build_layer_channels(&mut scratch, entry, is_background, self.config.trim_layers)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut sink = ByteSink::new();
        self.write_header(&mut sink, document, channel_count)?;

        // Color-mode data: empty for every supported mode.
        write_section(&mut sink, 1, true, |_| Ok(()))?;

        let ctx = ResourceContext {
            document,
            config: &self.config,
            composite: Some(&*composite),
        };
        write_resources_section(&mut sink, &ctx)?;

        self.write_layer_mask_section(&mut sink, &flat, &layouts, has_global_alpha)?;
        self.write_composite(&mut sink, &mut scratch, &composite, channel_count);

        Ok(sink.to_bytes())
    }

    /// Serialize a document and write it to `path`.
    pub fn save(&self, document: &PsdDocument, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.write(document)?;
        std::fs::write(path, &bytes)?;
        Ok(())
    }

    /// Resolve the composite pixels, checking them against the canvas.
    ///
    /// A document without a composite gets an opaque white merged image.
    fn resolve_composite<'a>(&self, document: &'a PsdDocument) -> Result<Cow<'a, PixelBuffer>> {
        let (width, height) = (document.width(), document.height());
        match document.composite() {
            Some(source) => {
                let buffer = source.resolve();
                if buffer.width() != width || buffer.height() != height {
                    return Err(Error::DimensionMismatch {
                        actual_width: buffer.width(),
                        actual_height: buffer.height(),
                        expected_width: width,
                        expected_height: height,
                    });
                }
                Ok(buffer)
            }
            None => {
                log::warn!("no composite source; writing an opaque white merged image");
                let data = vec![255u8; width as usize * height as usize * 4];
                Ok(Cow::Owned(PixelBuffer::from_rgba(width, height, data)))
            }
        }
    }

    fn write_header(
        &self,
        sink: &mut ByteSink,
        document: &PsdDocument,
        channel_count: u16,
    ) -> Result<()> {
        sink.write_signature("8BPS")?;
        sink.write_u16(1); // version
        sink.write_zeros(6);
        sink.write_u16(channel_count);
        sink.write_u32(document.height());
        sink.write_u32(document.width());
        sink.write_u16(8); // bit depth
        sink.write_u16(document.color_mode().wire_code());
        Ok(())
    }

    /// The layer-and-mask block: layer-info subsection (count, records, then
    /// payloads in record order) and the global-layer-mask stub.
    fn write_layer_mask_section(
        &self,
        sink: &mut ByteSink,
        flat: &[FlatLayer<'_>],
        layouts: &[LayerChannels],
        has_global_alpha: bool,
    ) -> Result<()> {
        write_section(sink, 2, true, |sink| {
            write_section(sink, 2, true, |sink| {
                let count = flat.len() as i16;
                sink.write_i16(if has_global_alpha { -count } else { count });
                for (entry, layout) in flat.iter().zip(layouts) {
                    write_layer_record(sink, entry, layout)?;
                }
                for layout in layouts {
                    write_channel_payloads(sink, layout);
                }
                Ok(())
            })?;
            // Global layer mask info: not encoded.
            sink.write_u32(0);
            Ok(())
        })
    }

    /// The merged image: one compression tag, then every channel's row-count
    /// table, then every channel's packed rows.
    fn write_composite(
        &self,
        sink: &mut ByteSink,
        scratch: &mut Vec<u8>,
        composite: &PixelBuffer,
        channel_count: u16,
    ) {
        let region = Rect::new(0, 0, composite.height() as i32, composite.width() as i32);
        sink.write_u16(1); // run-length encoded

        let mut planes = Vec::with_capacity(channel_count as usize);
        for offset in 0..channel_count as usize {
            if let Some(plane) = compress_plane(scratch, composite, region, offset) {
                planes.push(plane);
            }
        }
        for plane in &planes {
            sink.write_bytes(plane.row_counts());
        }
        for plane in &planes {
            sink.write_bytes(plane.rows());
        }
    }
}

impl Default for PsdWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Worst-case scratch size across every plane a document write compresses:
/// twice the largest row count plus twice the largest plane's pixel count.
fn scratch_capacity(document: &PsdDocument, flat: &[FlatLayer<'_>]) -> usize {
    let mut max_rows = document.height() as usize;
    let mut max_pixels = document.width() as usize * document.height() as usize;
    for entry in flat {
        let Some(layer) = entry.layer() else { continue };
        let mut consider = |w: u32, h: u32| {
            max_rows = max_rows.max(h as usize);
            max_pixels = max_pixels.max(w as usize * h as usize);
        };
        if let Some(source) = layer.source() {
            consider(source.width(), source.height());
        }
        if let Some(mask) = layer.mask() {
            consider(mask.source().width(), mask.source().height());
        }
    }
    2 * max_rows + 2 * max_pixels
}
