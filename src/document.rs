//! The layered document model.
//!
//! A [`PsdDocument`] owns an ordered forest of [`Layer`] nodes (bottom to
//! top), an optional composite pixel source, and document-level resources.
//! The model is caller-constructed and read-only to the writer: serialization
//! derives transient structures from it and never mutates it.

use crate::blend::{BlendMode, ColorMode};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::raster::PixelSource;

/// Pixel density stored in the resolution resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Horizontal density in pixels per inch
    pub horizontal_dpi: f32,
    /// Vertical density in pixels per inch
    pub vertical_dpi: f32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            horizontal_dpi: 72.0,
            vertical_dpi: 72.0,
        }
    }
}

/// Document-level resources emitted into the image-resource section.
#[derive(Debug)]
pub struct ResourceSet {
    /// Resolution resource; written whenever present
    pub resolution: Option<Resolution>,
}

impl Default for ResourceSet {
    fn default() -> Self {
        Self {
            resolution: Some(Resolution::default()),
        }
    }
}

/// A raster mask attached to a layer.
///
/// The mask has its own pixel source and its own bounding box: declared
/// explicitly, or inferred from the source's dimensions at the layer's
/// top-left corner. Mask boxes are taken at face value, never trimmed.
#[derive(Debug)]
pub struct LayerMask {
    source: PixelSource,
    rect: Option<Rect>,
    default_color: u8,
    disabled: bool,
    position_relative: bool,
    from_vector: bool,
    user_density: Option<u8>,
    user_feather: Option<f64>,
    vector_density: Option<u8>,
    vector_feather: Option<f64>,
}

impl LayerMask {
    /// Create a mask from a pixel source, with an inferred box and an opaque
    /// white default fill.
    pub fn new(source: impl Into<PixelSource>) -> Self {
        Self {
            source: source.into(),
            rect: None,
            default_color: 255,
            disabled: false,
            position_relative: false,
            from_vector: false,
            user_density: None,
            user_feather: None,
            vector_density: None,
            vector_feather: None,
        }
    }

    /// Declare the mask's bounding box explicitly.
    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Set the fill value used outside the mask's box.
    pub fn with_default_color(mut self, color: u8) -> Self {
        self.default_color = color;
        self
    }

    /// Disable the mask without removing it.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Mark the mask's position as relative to the layer.
    pub fn with_position_relative(mut self, relative: bool) -> Self {
        self.position_relative = relative;
        self
    }

    /// Mark the mask as derived from vector data.
    pub fn with_from_vector(mut self, from_vector: bool) -> Self {
        self.from_vector = from_vector;
        self
    }

    /// Set the user mask density (0-255).
    pub fn with_user_density(mut self, density: u8) -> Self {
        self.user_density = Some(density);
        self
    }

    /// Set the user mask feather radius in pixels.
    pub fn with_user_feather(mut self, feather: f64) -> Self {
        self.user_feather = Some(feather);
        self
    }

    /// Set the vector mask density (0-255).
    pub fn with_vector_density(mut self, density: u8) -> Self {
        self.vector_density = Some(density);
        self
    }

    /// Set the vector mask feather radius in pixels.
    pub fn with_vector_feather(mut self, feather: f64) -> Self {
        self.vector_feather = Some(feather);
        self
    }

    /// The mask's pixel source.
    pub fn source(&self) -> &PixelSource {
        &self.source
    }

    /// The declared box, if any.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Fill value outside the box.
    pub fn default_color(&self) -> u8 {
        self.default_color
    }

    /// Whether the mask is disabled.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the position is relative to the layer.
    pub fn position_relative(&self) -> bool {
        self.position_relative
    }

    /// Whether the mask derives from vector data.
    pub fn from_vector(&self) -> bool {
        self.from_vector
    }

    /// Optional user mask density.
    pub fn user_density(&self) -> Option<u8> {
        self.user_density
    }

    /// Optional user mask feather.
    pub fn user_feather(&self) -> Option<f64> {
        self.user_feather
    }

    /// Optional vector mask density.
    pub fn vector_density(&self) -> Option<u8> {
        self.vector_density
    }

    /// Optional vector mask feather.
    pub fn vector_feather(&self) -> Option<f64> {
        self.vector_feather
    }
}

/// One node of the layer forest: a content layer or a group.
///
/// A node never carries both pixels and children; the mutators reject the
/// combination with [`Error::InvalidLayerShape`] and the flattener re-checks
/// before any bytes are written. Children are exclusively owned by their
/// parent group.
#[derive(Debug)]
pub struct Layer {
    name: String,
    rect: Rect,
    source: Option<PixelSource>,
    children: Vec<Layer>,
    is_group: bool,
    expanded: bool,
    blend_mode: BlendMode,
    opacity: f32,
    clipping: bool,
    protect_transparency: bool,
    hidden: bool,
    vector_mask: bool,
    mask: Option<LayerMask>,
}

impl Layer {
    fn common(name: String, rect: Rect, is_group: bool) -> Self {
        Self {
            name,
            rect,
            source: None,
            children: Vec::new(),
            is_group,
            expanded: true,
            blend_mode: BlendMode::default(),
            opacity: 1.0,
            clipping: false,
            protect_transparency: false,
            hidden: false,
            vector_mask: false,
            mask: None,
        }
    }

    /// Create a content layer positioned at `rect`.
    pub fn image(name: impl Into<String>, rect: Rect) -> Self {
        Self::common(name.into(), rect, false)
    }

    /// Create an (initially expanded) group layer.
    pub fn group(name: impl Into<String>) -> Self {
        Self::common(name.into(), Rect::default(), true)
    }

    /// Attach a pixel source to a content layer.
    ///
    /// Fails with [`Error::InvalidLayerShape`] on a group.
    pub fn with_source(mut self, source: impl Into<PixelSource>) -> Result<Self> {
        if self.is_group {
            return Err(Error::InvalidLayerShape(self.name));
        }
        self.source = Some(source.into());
        Ok(self)
    }

    /// Append a child to a group.
    ///
    /// Fails with [`Error::InvalidLayerShape`] on a content layer.
    pub fn add_child(&mut self, child: Layer) -> Result<()> {
        if !self.is_group || self.source.is_some() {
            return Err(Error::InvalidLayerShape(self.name.clone()));
        }
        self.children.push(child);
        Ok(())
    }

    /// Append a child to a group, by value.
    pub fn with_child(mut self, child: Layer) -> Result<Self> {
        self.add_child(child)?;
        Ok(self)
    }

    /// Set the blend mode.
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// Set the opacity, clamped to [0, 1].
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Clip the layer to the layer below.
    pub fn with_clipping(mut self, clipping: bool) -> Self {
        self.clipping = clipping;
        self
    }

    /// Protect the layer's transparency.
    pub fn with_protect_transparency(mut self, protect: bool) -> Self {
        self.protect_transparency = protect;
        self
    }

    /// Hide the layer.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Flag the layer as carrying a vector mask.
    ///
    /// Only the record flag is written; vector geometry is not encoded.
    pub fn with_vector_mask(mut self, vector_mask: bool) -> Self {
        self.vector_mask = vector_mask;
        self
    }

    /// Attach a raster mask.
    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Set whether a group shows expanded (open) or collapsed (closed).
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared bounding box.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Pixel source, if any.
    pub fn source(&self) -> Option<&PixelSource> {
        self.source.as_ref()
    }

    /// Child nodes (empty for content layers).
    pub fn children(&self) -> &[Layer] {
        &self.children
    }

    /// Whether this node is a group.
    pub fn is_group(&self) -> bool {
        self.is_group
    }

    /// Whether a group shows expanded.
    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// Blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Opacity in [0, 1].
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clipping flag.
    pub fn clipping(&self) -> bool {
        self.clipping
    }

    /// Transparency-protected flag.
    pub fn protect_transparency(&self) -> bool {
        self.protect_transparency
    }

    /// Hidden flag.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Vector-mask-present flag.
    pub fn vector_mask(&self) -> bool {
        self.vector_mask
    }

    /// Raster mask, if any.
    pub fn mask(&self) -> Option<&LayerMask> {
        self.mask.as_ref()
    }

    /// Bypass the shape guard so the flattener's own check can be exercised.
    #[cfg(test)]
    pub(crate) fn set_source_unchecked(&mut self, source: PixelSource) {
        self.source = Some(source);
    }
}

/// A layered raster document ready for serialization.
#[derive(Debug)]
pub struct PsdDocument {
    width: u32,
    height: u32,
    color_mode: ColorMode,
    composite: Option<PixelSource>,
    layers: Vec<Layer>,
    resources: ResourceSet,
}

impl PsdDocument {
    /// Create a document with the given canvas size.
    ///
    /// Dimensions are validated when the document is written; a zero
    /// dimension fails serialization with
    /// [`Error::InvalidDocumentSize`].
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_mode: ColorMode::default(),
            composite: None,
            layers: Vec::new(),
            resources: ResourceSet::default(),
        }
    }

    /// Attach the flattened composite rendering of the whole document.
    pub fn with_composite(mut self, source: impl Into<PixelSource>) -> Self {
        self.composite = Some(source.into());
        self
    }

    /// Append a top-level layer. Layers are ordered bottom to top.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Replace the document resolution resource.
    pub fn with_resolution(mut self, resolution: Option<Resolution>) -> Self {
        self.resources.resolution = resolution;
        self
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Document color mode.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// The composite pixel source, if any.
    pub fn composite(&self) -> Option<&PixelSource> {
        self.composite.as_ref()
    }

    /// The layer forest, bottom to top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Document-level resources.
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }
}
