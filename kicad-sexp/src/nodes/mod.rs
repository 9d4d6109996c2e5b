//! Typed KiCad nodes
//!
//! Each node type exposes a `descriptor` that [`register_kicad_nodes`] adds
//! to a [`Registry`]. Applications that model more of the format register
//! their own descriptors next to these.

pub mod container;
pub mod geometry;
pub mod layer;
pub mod leaf;
pub mod text;

pub use container::{Document, Footprint, Verbatim};
pub use geometry::{At, Coord, FontSize, Pts, PtsArc, PtsItem};
pub use layer::Layer;
pub use leaf::{Leaf, LeafKind};
pub use text::{Effects, Font, Justify, Property};

use crate::core::Result;
use crate::registry::{NodeDescriptor, Registry};

const NUMBER_LEAVES: &[&str] = &["version", "thickness", "width", "id"];
const TEXT_LEAVES: &[&str] = &["generator", "generator_version", "uuid", "tstamp", "descr", "tags"];
const BOOL_LEAVES: &[&str] = &[
    "hide",
    "bold",
    "italic",
    "locked",
    "exclude_from_sim",
    "in_bom",
    "on_board",
    "dnp",
];
const COORD_TOKENS: &[&str] = &["xy", "start", "mid", "end", "center", "size"];
const DOCUMENT_TOKENS: &[&str] = &["kicad_sch", "kicad_pcb", "kicad_symbol_lib"];
const FOOTPRINT_TOKENS: &[&str] = &["footprint", "module"];
const VERBATIM_TOKENS: &[&str] = &["paper", "title_block", "lib_symbols", "setup", "general", "net"];

/// Every descriptor shipped with this crate.
pub fn kicad_descriptors() -> Vec<NodeDescriptor> {
    let leaves = [
        (NUMBER_LEAVES, LeafKind::Number),
        (TEXT_LEAVES, LeafKind::Text),
        (BOOL_LEAVES, LeafKind::Bool),
    ];

    let mut descriptors: Vec<NodeDescriptor> = leaves
        .iter()
        .flat_map(|(tokens, kind)| tokens.iter().map(move |t| Leaf::descriptor(t, *kind)))
        .collect();

    descriptors.extend(["layer", "layers"].iter().map(|t| Layer::descriptor(t)));
    descriptors.push(At::descriptor());
    descriptors.extend(COORD_TOKENS.iter().map(|t| Coord::descriptor(t)));
    descriptors.push(FontSize::descriptor());
    descriptors.push(Pts::descriptor());
    descriptors.push(PtsArc::descriptor());
    descriptors.push(Property::descriptor());
    descriptors.push(Effects::descriptor());
    descriptors.push(Font::descriptor());
    descriptors.push(Justify::descriptor());
    descriptors.extend(DOCUMENT_TOKENS.iter().map(|t| Document::descriptor(t)));
    descriptors.extend(FOOTPRINT_TOKENS.iter().map(|t| Footprint::descriptor(t)));
    descriptors.extend(VERBATIM_TOKENS.iter().map(|t| Verbatim::descriptor(t)));
    descriptors
}

pub fn register_kicad_nodes(registry: &mut Registry) -> Result<()> {
    registry.register_all(kicad_descriptors())
}
