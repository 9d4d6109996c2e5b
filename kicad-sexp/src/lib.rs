//! kicad-sexp - typed, round-trip faithful KiCad S-expression engine
//!
//! This library reads the S-expression files KiCad writes (schematics,
//! boards, footprints and symbol libraries) into a tree of typed nodes and
//! writes that tree back out. Output is not byte-identical to the input but
//! is canonically equivalent to it, and children this crate does not model
//! are carried through verbatim.
//!
//! # Quick Start
//!
//! ```no_run
//! use kicad_sexp::{parse_kicad_pcb, Footprint, Registry};
//!
//! let registry = Registry::kicad();
//! let text = std::fs::read_to_string("board.kicad_pcb").unwrap();
//! let board = parse_kicad_pcb(&registry, &text).unwrap();
//!
//! for fp in board.children_of::<Footprint>() {
//!     println!("{} on {}", fp.name(), fp.layer().name());
//! }
//! println!("{}", kicad_sexp::Node::render(&board));
//! ```
//!
//! # Features
//!
//! - **Primitive layer**: tokenizer, parser and printer for the raw tree
//! - **Registry**: token dispatch scoped by the enclosing token
//! - **Node library**: typed leaves, coordinates, text effects, footprints
//! - **Canonical comparison**: order-insensitive equivalence with a path to
//!   the first difference

pub mod canonical;
pub mod classify;
pub mod core;
pub mod document;
pub mod node;
pub mod nodes;
pub mod parser;
pub mod registry;

// Re-export main types
pub use crate::canonical::{canonicalize, compare, equivalent, CanonicalOptions, Divergence, DivergenceKind};
pub use crate::classify::{ChildBuckets, Unclaimed};
pub use crate::core::{
    check_file, check_round_trip, discover_kicad_files, load_file, KicadSexpError, Result,
    RoundTripOptions, RoundTripReport, SyntaxErrorKind,
};
pub use crate::document::{
    parse_file, parse_kicad_mod, parse_kicad_pcb, parse_kicad_sch, parse_kicad_sym, DocumentKind,
    KicadDocument,
};
pub use crate::node::{downcast, LeafValue, Node, Parsed};
pub use crate::nodes::{
    At, Coord, Document, Effects, Font, FontSize, Footprint, Justify, Layer, Leaf, LeafKind,
    Property, Pts, PtsArc, PtsItem, Verbatim,
};
pub use crate::parser::{parse_forms, SExp};
pub use crate::registry::{NodeArgs, NodeDescriptor, Registry};

/// Parse text into its canonical primitive tree (convenience wrapper).
pub fn canonical_forms(text: &str, options: &CanonicalOptions) -> Result<Vec<SExp>> {
    Ok(parse_forms(text)?
        .iter()
        .map(|form| canonicalize(form, options))
        .collect())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Document, Footprint, KicadDocument, KicadSexpError, Node, NodeArgs, NodeDescriptor,
        Registry, Result, SExp,
    };
}
