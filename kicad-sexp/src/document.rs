//! Root-typed entry points for the four KiCad S-expression file formats.

use std::path::Path;

use crate::core::{KicadSexpError, Result};
use crate::node::{downcast, Node, Parsed};
use crate::nodes::{Document, Footprint};
use crate::parser::{parse_forms, SExp};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Schematic,
    Pcb,
    Footprint,
    SymbolLib,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Schematic,
        DocumentKind::Pcb,
        DocumentKind::Footprint,
        DocumentKind::SymbolLib,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Schematic => "kicad_sch",
            DocumentKind::Pcb => "kicad_pcb",
            DocumentKind::Footprint => "kicad_mod",
            DocumentKind::SymbolLib => "kicad_sym",
        }
    }

    /// Root token written by current KiCad versions.
    pub fn root_token(self) -> &'static str {
        match self {
            DocumentKind::Schematic => "kicad_sch",
            DocumentKind::Pcb => "kicad_pcb",
            DocumentKind::Footprint => "footprint",
            DocumentKind::SymbolLib => "kicad_symbol_lib",
        }
    }

    fn accepts_root(self, token: &str) -> bool {
        token == self.root_token() || (self == DocumentKind::Footprint && token == "module")
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }
}

/// Kind of file at `path`, judged by its extension.
pub fn kind_for_path(path: &Path) -> Result<DocumentKind> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentKind::from_extension)
        .ok_or_else(|| KicadSexpError::UnsupportedFile(path.to_path_buf()))
}

/// A parsed file of any supported format.
#[derive(Debug)]
pub enum KicadDocument {
    Schematic(Document),
    Pcb(Document),
    Footprint(Footprint),
    SymbolLib(Document),
}

impl KicadDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            KicadDocument::Schematic(_) => DocumentKind::Schematic,
            KicadDocument::Pcb(_) => DocumentKind::Pcb,
            KicadDocument::Footprint(_) => DocumentKind::Footprint,
            KicadDocument::SymbolLib(_) => DocumentKind::SymbolLib,
        }
    }

    pub fn root(&self) -> &dyn Node {
        match self {
            KicadDocument::Schematic(doc) | KicadDocument::Pcb(doc) | KicadDocument::SymbolLib(doc) => doc,
            KicadDocument::Footprint(fp) => fp,
        }
    }

    /// The document as text, with a trailing newline like KiCad writes.
    pub fn render(&self) -> String {
        let mut text = self.root().render();
        text.push('\n');
        text
    }
}

fn describe(parsed: &Parsed) -> String {
    match parsed {
        Parsed::Node(node) => node.token().to_string(),
        Parsed::Atom(atom) => format!("{} atom", atom.type_name()),
        Parsed::List(_) => "untagged list".to_string(),
    }
}

/// The typed root of already parsed `forms`, which must be exactly one
/// form accepted by `kind`.
pub(crate) fn root_of_forms(registry: &Registry, kind: DocumentKind, forms: &[SExp]) -> Result<Box<dyn Node>> {
    let mismatch = |found: String| KicadSexpError::RootTypeMismatch {
        expected: kind.root_token().to_string(),
        found,
    };

    let form = match forms {
        [form] => form,
        [] => return Err(mismatch("empty input".to_string())),
        many => return Err(mismatch(format!("{} top-level forms", many.len()))),
    };

    match registry.parse_primitive(form, None)? {
        Parsed::Node(node) if kind.accepts_root(node.token()) => Ok(node),
        other => Err(mismatch(describe(&other))),
    }
}

fn single_root(registry: &Registry, kind: DocumentKind, text: &str) -> Result<Box<dyn Node>> {
    root_of_forms(registry, kind, &parse_forms(text)?)
}

/// Parse `text` as a document of the given kind.
pub fn parse_document_str(registry: &Registry, kind: DocumentKind, text: &str) -> Result<KicadDocument> {
    let root = single_root(registry, kind, text)?;
    Ok(match kind {
        DocumentKind::Schematic => KicadDocument::Schematic(downcast(root)?),
        DocumentKind::Pcb => KicadDocument::Pcb(downcast(root)?),
        DocumentKind::Footprint => KicadDocument::Footprint(downcast(root)?),
        DocumentKind::SymbolLib => KicadDocument::SymbolLib(downcast(root)?),
    })
}

pub fn parse_kicad_sch(registry: &Registry, text: &str) -> Result<Document> {
    downcast(single_root(registry, DocumentKind::Schematic, text)?)
}

pub fn parse_kicad_pcb(registry: &Registry, text: &str) -> Result<Document> {
    downcast(single_root(registry, DocumentKind::Pcb, text)?)
}

pub fn parse_kicad_mod(registry: &Registry, text: &str) -> Result<Footprint> {
    downcast(single_root(registry, DocumentKind::Footprint, text)?)
}

pub fn parse_kicad_sym(registry: &Registry, text: &str) -> Result<Document> {
    downcast(single_root(registry, DocumentKind::SymbolLib, text)?)
}

/// Read and parse a file, picking the format from its extension.
pub fn parse_file(registry: &Registry, path: &Path) -> Result<KicadDocument> {
    let kind = kind_for_path(path)?;
    tracing::debug!("Parsing {:?} from {}", kind, path.display());
    let text = std::fs::read_to_string(path)?;
    parse_document_str(registry, kind, &text)
}
