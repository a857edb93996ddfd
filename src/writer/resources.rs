//! Image-resource entries.
//!
//! The resource section is a sequence of `8BIM` entries, each with a u16 id,
//! a padded Pascal name, and a framed data block whose recorded length
//! excludes the even-alignment padding. Which entries are written is decided
//! by a closed table of (id, predicate, writer) pairs.

use crate::error::Result;
use crate::raster::{resample_nearest, PixelBuffer, PixelFormat};
use crate::writer::byte_sink::ByteSink;
use crate::writer::psd_writer::PsdWriterConfig;
use crate::writer::section::write_section;
use crate::PsdDocument;

/// Resolution resource id.
const RES_RESOLUTION_INFO: u16 = 1005;
/// Thumbnail resource id.
const RES_THUMBNAIL: u16 = 1036;

/// Thumbnail bound, width x height.
const THUMBNAIL_MAX: (u32, u32) = (160, 120);

/// Everything a resource writer may consult.
pub struct ResourceContext<'a> {
    /// The document being serialized
    pub document: &'a PsdDocument,
    /// Write-time options
    pub config: &'a PsdWriterConfig,
    /// The resolved composite pixels, when the document has any
    pub composite: Option<&'a PixelBuffer>,
}

/// One entry of the resource table.
pub struct ResourceHandler {
    /// Resource id
    pub id: u16,
    /// Resource name (conventionally empty)
    pub name: &'static str,
    /// Whether this resource applies
    pub has: fn(&ResourceContext<'_>) -> bool,
    /// Emit the resource data (framing is handled by the caller)
    pub write: fn(&mut ByteSink, &ResourceContext<'_>) -> Result<()>,
}

static HANDLERS: [ResourceHandler; 2] = [
    ResourceHandler {
        id: RES_RESOLUTION_INFO,
        name: "",
        has: has_resolution,
        write: write_resolution,
    },
    ResourceHandler {
        id: RES_THUMBNAIL,
        name: "",
        has: has_thumbnail,
        write: write_thumbnail,
    },
];

/// The resources this writer emits, in emission order.
pub fn handlers() -> &'static [ResourceHandler] {
    &HANDLERS
}

/// Write the whole image-resource section, entries framed individually.
pub fn write_resources_section(sink: &mut ByteSink, ctx: &ResourceContext<'_>) -> Result<()> {
    write_section(sink, 1, true, |sink| {
        for handler in handlers() {
            if !(handler.has)(ctx) {
                continue;
            }
            sink.write_signature("8BIM")?;
            sink.write_u16(handler.id);
            sink.write_pascal_string(handler.name, 2);
            // Data is padded to even length; the recorded length is not.
            write_section(sink, 2, false, |sink| (handler.write)(sink, ctx))?;
        }
        Ok(())
    })
}

fn has_resolution(ctx: &ResourceContext<'_>) -> bool {
    ctx.document.resources().resolution.is_some()
}

fn write_resolution(sink: &mut ByteSink, ctx: &ResourceContext<'_>) -> Result<()> {
    let resolution = ctx
        .document
        .resources()
        .resolution
        .expect("predicate checked the resolution");
    // Densities as 16.16 fixed point; display units are pixels/inch and
    // inches.
    sink.write_fixed_16_16(resolution.horizontal_dpi as f64);
    sink.write_u16(1);
    sink.write_u16(1);
    sink.write_fixed_16_16(resolution.vertical_dpi as f64);
    sink.write_u16(1);
    sink.write_u16(1);
    Ok(())
}

fn has_thumbnail(ctx: &ResourceContext<'_>) -> bool {
    ctx.config.thumbnail && matches!(ctx.composite, Some(c) if c.format() == PixelFormat::Rgba8)
}

/// Raw-RGB thumbnail: header, then rows padded to 4-byte multiples.
fn write_thumbnail(sink: &mut ByteSink, ctx: &ResourceContext<'_>) -> Result<()> {
    let composite = ctx.composite.expect("predicate checked the composite");
    let thumb = resample_nearest(composite, THUMBNAIL_MAX.0, THUMBNAIL_MAX.1);
    let (w, h) = (thumb.width(), thumb.height());
    let row_bytes = (w * 24).div_ceil(32) * 4;
    let total = row_bytes * h;

    sink.write_u32(0); // raw RGB format
    sink.write_u32(w);
    sink.write_u32(h);
    sink.write_u32(row_bytes);
    sink.write_u32(total);
    sink.write_u32(total); // size after compression (raw)
    sink.write_u16(24);
    sink.write_u16(1); // planes
    for y in 0..h {
        for x in 0..w {
            sink.write_u8(thumb.sample(x, y, 0));
            sink.write_u8(thumb.sample(x, y, 1));
            sink.write_u8(thumb.sample(x, y, 2));
        }
        sink.write_zeros((row_bytes - w * 3) as usize);
    }
    Ok(())
}
