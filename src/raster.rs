//! Pixel buffers, rasterizable sources, and raster-level analysis.
//!
//! The writer consumes pixel data through [`PixelSource`]: either an explicit
//! interleaved buffer or a [`Drawable`] that rasterizes on demand. This module
//! also hosts the bounding-box trimmer that shrinks a layer's stored region to
//! its non-transparent extent, and the thumbnail resampler.

use std::borrow::Cow;
use std::fmt;

use crate::geometry::Rect;

/// Interleaved sample layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, four bytes per pixel
    Rgba8,
    /// 8-bit single channel, one byte per pixel (masks)
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// An owned, interleaved 8-bit pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer from interleaved RGBA bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::from_parts(width, height, PixelFormat::Rgba8, data)
    }

    /// Create a single-channel buffer from grayscale bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != width * height`.
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::from_parts(width, height, PixelFormat::Gray8, data)
    }

    fn from_parts(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        assert_eq!(
            data.len(),
            expected,
            "pixel data length {} does not match {}x{} {:?}",
            data.len(),
            width,
            height,
            format
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The interleaved sample bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// One sample of the pixel at (x, y), at `offset` bytes into the pixel.
    #[inline]
    pub fn sample(&self, x: u32, y: u32, offset: usize) -> u8 {
        let bpp = self.format.bytes_per_pixel();
        self.data[(y as usize * self.width as usize + x as usize) * bpp + offset]
    }

    /// Alpha of the pixel at (x, y). Single-channel buffers are opaque.
    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        match self.format {
            PixelFormat::Rgba8 => self.sample(x, y, 3),
            PixelFormat::Gray8 => 255,
        }
    }

    /// Whether any pixel carries a non-opaque alpha sample.
    pub fn has_transparency(&self) -> bool {
        match self.format {
            PixelFormat::Rgba8 => self.data.iter().skip(3).step_by(4).any(|&a| a != 255),
            PixelFormat::Gray8 => false,
        }
    }
}

/// A source that can be rasterized into a [`PixelBuffer`] on demand.
pub trait Drawable {
    /// Width of the rasterized output in pixels.
    fn width(&self) -> u32;

    /// Height of the rasterized output in pixels.
    fn height(&self) -> u32;

    /// Produce the pixel data.
    fn rasterize(&self) -> PixelBuffer;
}

/// Where a layer, mask, or composite gets its pixels from.
pub enum PixelSource {
    /// An explicit, already-materialized buffer
    Buffer(PixelBuffer),
    /// A source rasterized once per serialization
    Drawable(Box<dyn Drawable>),
}

impl PixelSource {
    /// Resolve to pixel data, rasterizing if needed.
    pub fn resolve(&self) -> Cow<'_, PixelBuffer> {
        match self {
            PixelSource::Buffer(buffer) => Cow::Borrowed(buffer),
            PixelSource::Drawable(drawable) => Cow::Owned(drawable.rasterize()),
        }
    }

    /// Width of the resolved pixels, without rasterizing.
    pub fn width(&self) -> u32 {
        match self {
            PixelSource::Buffer(buffer) => buffer.width(),
            PixelSource::Drawable(drawable) => drawable.width(),
        }
    }

    /// Height of the resolved pixels, without rasterizing.
    pub fn height(&self) -> u32 {
        match self {
            PixelSource::Buffer(buffer) => buffer.height(),
            PixelSource::Drawable(drawable) => drawable.height(),
        }
    }
}

impl From<PixelBuffer> for PixelSource {
    fn from(buffer: PixelBuffer) -> Self {
        PixelSource::Buffer(buffer)
    }
}

impl fmt::Debug for PixelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelSource::Buffer(buffer) => f.debug_tuple("Buffer").field(buffer).finish(),
            PixelSource::Drawable(drawable) => f
                .debug_struct("Drawable")
                .field("width", &drawable.width())
                .field("height", &drawable.height())
                .finish(),
        }
    }
}

/// Compute the minimal bounding box containing any non-transparent pixel.
///
/// Each edge shrinks independently and monotonically while every pixel along
/// it has zero alpha, and stops at the first non-transparent pixel; edges
/// never cross. Only the alpha channel is inspected, so single-channel
/// buffers always keep their full box. A fully transparent buffer collapses
/// to zero width and/or height; callers must treat a zero-area result as
/// "omit this layer's pixels", not as geometry to encode.
///
/// The returned box is in buffer-local coordinates.
pub fn trim_to_opaque_bounds(buffer: &PixelBuffer) -> Rect {
    let (w, h) = (buffer.width(), buffer.height());
    if buffer.format() == PixelFormat::Gray8 {
        return Rect::new(0, 0, h as i32, w as i32);
    }

    let row_transparent = |y: u32, x0: u32, x1: u32| (x0..x1).all(|x| buffer.alpha(x, y) == 0);
    let col_transparent = |x: u32, y0: u32, y1: u32| (y0..y1).all(|y| buffer.alpha(x, y) == 0);

    let mut top = 0u32;
    let mut bottom = h;
    let mut left = 0u32;
    let mut right = w;

    while top < bottom && row_transparent(top, 0, w) {
        top += 1;
    }
    while bottom > top && row_transparent(bottom - 1, 0, w) {
        bottom -= 1;
    }
    while left < right && col_transparent(left, top, bottom) {
        left += 1;
    }
    while right > left && col_transparent(right - 1, top, bottom) {
        right -= 1;
    }

    Rect::new(top as i32, left as i32, bottom as i32, right as i32)
}

/// Nearest-neighbor downsample, preserving aspect ratio.
///
/// Output dimensions never exceed `max_width` x `max_height`; buffers already
/// within bounds are returned unscaled.
pub fn resample_nearest(buffer: &PixelBuffer, max_width: u32, max_height: u32) -> PixelBuffer {
    let (w, h) = (buffer.width(), buffer.height());
    if w <= max_width && h <= max_height {
        return buffer.clone();
    }

    let scale = (max_width as f64 / w as f64).min(max_height as f64 / h as f64);
    let out_w = ((w as f64 * scale).round() as u32).clamp(1, max_width);
    let out_h = ((h as f64 * scale).round() as u32).clamp(1, max_height);

    let bpp = buffer.format().bytes_per_pixel();
    let mut data = Vec::with_capacity(out_w as usize * out_h as usize * bpp);
    for y in 0..out_h {
        let src_y = (y as u64 * h as u64 / out_h as u64) as u32;
        for x in 0..out_w {
            let src_x = (x as u64 * w as u64 / out_w as u64) as u32;
            for offset in 0..bpp {
                data.push(buffer.sample(src_x, src_y, offset));
            }
        }
    }
    PixelBuffer::from_parts(out_w, out_h, buffer.format(), data)
}
