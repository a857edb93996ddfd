//! Layer-tree flattening.
//!
//! The container stores nested groups as a flat, bottom-to-top list of layer
//! records with divider pseudo-layers: a zero-size bounding divider precedes
//! a group's children, and the group's own record (carrying the open/closed
//! divider subtype) trails them. Flattening is one-directional and stateless
//! between calls; the produced list borrows the caller's tree.

use crate::document::Layer;
use crate::error::{Error, Result};

/// Name the container conventionally gives bounding-divider records.
pub const BOUNDING_DIVIDER_NAME: &str = "</Layer group>";

/// Divider subtype carried by a pseudo-layer record's `lsct` data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividerKind {
    /// Group record, shown expanded
    OpenFolder,
    /// Group record, shown collapsed
    ClosedFolder,
    /// Hidden divider bounding the group's children
    Bounding,
}

impl DividerKind {
    /// The u32 value written in the `lsct` record.
    pub fn wire_code(&self) -> u32 {
        match self {
            DividerKind::OpenFolder => 1,
            DividerKind::ClosedFolder => 2,
            DividerKind::Bounding => 3,
        }
    }
}

/// One element of the flattened layer list.
#[derive(Debug)]
pub enum FlatLayer<'a> {
    /// A content layer, written as-is
    Content(&'a Layer),
    /// Zero-size pseudo-layer marking where a group's children start
    GroupStart,
    /// The group's own trailing record
    GroupEnd(&'a Layer),
    /// Placeholder for an empty forest (the format requires one record)
    Empty,
}

impl<'a> FlatLayer<'a> {
    /// The borrowed layer behind this entry, if any.
    pub fn layer(&self) -> Option<&'a Layer> {
        match *self {
            FlatLayer::Content(layer) | FlatLayer::GroupEnd(layer) => Some(layer),
            FlatLayer::GroupStart | FlatLayer::Empty => None,
        }
    }

    /// The divider subtype this entry's record carries, if any.
    pub fn divider(&self) -> Option<DividerKind> {
        match self {
            FlatLayer::GroupStart => Some(DividerKind::Bounding),
            FlatLayer::GroupEnd(layer) => Some(if layer.expanded() {
                DividerKind::OpenFolder
            } else {
                DividerKind::ClosedFolder
            }),
            FlatLayer::Content(_) | FlatLayer::Empty => None,
        }
    }

    /// The name written in this entry's record.
    pub fn name(&self) -> &'a str {
        match self {
            FlatLayer::Content(layer) | FlatLayer::GroupEnd(layer) => layer.name(),
            FlatLayer::GroupStart => BOUNDING_DIVIDER_NAME,
            FlatLayer::Empty => "",
        }
    }
}

/// Flatten a layer forest into the container's linear list.
///
/// Depth-first: content layers append as-is; a group appends a bounding
/// divider, its children in order, then its own record. An empty forest
/// yields a single placeholder record. Fails with
/// [`Error::InvalidLayerShape`] if any node carries both pixels and
/// children.
pub fn flatten(forest: &[Layer]) -> Result<Vec<FlatLayer<'_>>> {
    if forest.is_empty() {
        return Ok(vec![FlatLayer::Empty]);
    }
    let mut flat = Vec::new();
    for layer in forest {
        push_node(layer, &mut flat)?;
    }
    Ok(flat)
}

fn push_node<'a>(layer: &'a Layer, flat: &mut Vec<FlatLayer<'a>>) -> Result<()> {
    // The model's mutators already reject this shape; re-check before any
    // record derives from the node.
    if layer.source().is_some() && !layer.children().is_empty() {
        return Err(Error::InvalidLayerShape(layer.name().to_string()));
    }
    if layer.is_group() {
        flat.push(FlatLayer::GroupStart);
        for child in layer.children() {
            push_node(child, flat)?;
        }
        flat.push(FlatLayer::GroupEnd(layer));
    } else {
        flat.push(FlatLayer::Content(layer));
    }
    Ok(())
}
