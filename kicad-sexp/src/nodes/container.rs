//! Document roots, footprints and verbatim blocks.

use crate::classify::{split_flags, Unclaimed};
use crate::core::{KicadSexpError, Result};
use crate::node::{render_children, render_container, string_arg, LeafValue, Node};
use crate::parser::sexp::SExp;
use crate::registry::{NodeArgs, NodeDescriptor};

use super::geometry::At;
use super::layer::Layer;
use super::leaf::Leaf;
use super::text::Property;

/// Root of a schematic, board or symbol library file.
///
/// Children this crate models are parsed into nodes; everything else is kept
/// verbatim so that files written by newer KiCad versions survive a round
/// trip.
#[derive(Debug)]
pub struct Document {
    token: String,
    flags: Vec<SExp>,
    version: Option<Leaf>,
    generator: Option<Leaf>,
    generator_version: Option<Leaf>,
    uuid: Option<Leaf>,
    properties: Vec<Property>,
    unclaimed: Unclaimed,
}

impl Document {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            flags: Vec::new(),
            version: None,
            generator: None,
            generator_version: None,
            uuid: None,
            properties: Vec::new(),
            unclaimed: Unclaimed::new(),
        }
    }

    pub fn descriptor(token: &str) -> NodeDescriptor {
        NodeDescriptor::new(token, |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let (flags, lists) = split_flags(args.raw()?);
            let (mut buckets, extensions) = args.classify_extensible(&lists)?;
            Ok(Box::new(Document {
                token: args.token.clone(),
                flags,
                version: buckets.take_one("version")?,
                generator: buckets.take_one("generator")?,
                generator_version: buckets.take_one("generator_version")?,
                uuid: buckets.take_one("uuid")?,
                properties: buckets.take_many("property")?,
                unclaimed: buckets.into_unclaimed(extensions),
            }))
        })
        .raw_args()
    }

    /// File format version, a date such as `20231120`.
    pub fn version(&self) -> Option<f64> {
        self.version.as_ref().and_then(|v| v.as_number())
    }

    pub fn generator(&self) -> Option<&str> {
        self.generator.as_ref().and_then(|g| g.as_text())
    }

    pub fn generator_version(&self) -> Option<&str> {
        self.generator_version.as_ref().and_then(|g| g.as_text())
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_ref().and_then(|u| u.as_text())
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key() == key)
    }

    /// Modeled children other than the header fields and properties.
    pub fn children(&self) -> &[Box<dyn Node>] {
        self.unclaimed.nodes()
    }

    /// Children of a given concrete type, e.g. every [`Footprint`] on a board.
    pub fn children_of<T: Node>(&self) -> impl Iterator<Item = &T> {
        self.unclaimed.nodes().iter().filter_map(|c| c.downcast_ref::<T>())
    }

    /// Children kept verbatim.
    pub fn extensions(&self) -> &[SExp] {
        self.unclaimed.raw()
    }

    pub fn with_version(self, version: f64) -> Self {
        Self {
            version: Some(Leaf::new("version", LeafValue::Number(version))),
            ..self
        }
    }

    pub fn with_generator(self, generator: impl Into<String>) -> Self {
        Self {
            generator: Some(Leaf::new("generator", LeafValue::Text(generator.into()))),
            ..self
        }
    }

    /// Assign a fresh random uuid.
    pub fn with_new_uuid(self) -> Self {
        Self {
            uuid: Some(Leaf::new_uuid()),
            ..self
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_child(mut self, child: Box<dyn Node>) -> Self {
        self.unclaimed.push_node(child);
        self
    }
}

impl Node for Document {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        let fields = [
            self.version.as_ref().map(|n| n.render()),
            self.generator.as_ref().map(|n| n.render()),
            self.generator_version.as_ref().map(|n| n.render()),
            self.uuid.as_ref().map(|n| n.render()),
        ]
        .into_iter()
        .chain(self.properties.iter().map(|p| Some(p.render())));
        render_container(
            &self.token,
            &self.flags,
            &render_children(fields, &self.unclaimed),
        )
    }
}

/// `(footprint "Lib:Name" locked (layer F.Cu) (at ..) ...)`, also accepted
/// under the pre-6.0 token `module`.
#[derive(Debug)]
pub struct Footprint {
    token: String,
    name: String,
    flags: Vec<SExp>,
    layer: Layer,
    version: Option<Leaf>,
    generator: Option<Leaf>,
    uuid: Option<Leaf>,
    at: Option<At>,
    descr: Option<Leaf>,
    tags: Option<Leaf>,
    properties: Vec<Property>,
    unclaimed: Unclaimed,
}

impl Footprint {
    pub fn new(name: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            token: "footprint".to_string(),
            name: name.into(),
            flags: Vec::new(),
            layer: Layer::new("layer", vec![layer.into()]),
            version: None,
            generator: None,
            uuid: None,
            at: None,
            descr: None,
            tags: None,
            properties: Vec::new(),
            unclaimed: Unclaimed::new(),
        }
    }

    pub fn descriptor(token: &str) -> NodeDescriptor {
        NodeDescriptor::new(token, |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            Ok(Box::new(Footprint::from_args(args)?))
        })
        .raw_args()
    }

    fn from_args(args: NodeArgs<'_>) -> Result<Self> {
        let raw = args.raw()?;
        let name = string_arg(&args.token, raw, 0, "name")?;
        let (flags, lists) = split_flags(&raw[1..]);
        if let Some(bad) = flags.iter().find(|f| f.as_atom().is_none()) {
            return Err(KicadSexpError::structural(
                &args.token,
                format!("unexpected value {}", bad),
            ));
        }

        let (mut buckets, extensions) = args.classify_extensible(&lists)?;
        let uuid = match buckets.take_one::<Leaf>("uuid")? {
            Some(uuid) => Some(uuid),
            None => buckets.take_one("tstamp")?,
        };

        Ok(Self {
            token: args.token.clone(),
            name,
            flags,
            layer: buckets.take_required("layer")?,
            version: buckets.take_one("version")?,
            generator: buckets.take_one("generator")?,
            uuid,
            at: buckets.take_one("at")?,
            descr: buckets.take_one("descr")?,
            tags: buckets.take_one("tags")?,
            properties: buckets.take_many("property")?,
            unclaimed: buckets.into_unclaimed(extensions),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn at(&self) -> Option<&At> {
        self.at.as_ref()
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_ref().and_then(|u| u.as_text())
    }

    pub fn description(&self) -> Option<&str> {
        self.descr.as_ref().and_then(|d| d.as_text())
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.as_atom() == Some(flag))
    }

    pub fn is_locked(&self) -> bool {
        self.has_flag("locked")
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key() == key)
    }

    /// Reference designator, from the `Reference` property.
    pub fn reference(&self) -> Option<&str> {
        self.property("Reference").map(|p| p.value())
    }

    pub fn children(&self) -> &[Box<dyn Node>] {
        self.unclaimed.nodes()
    }

    pub fn extensions(&self) -> &[SExp] {
        self.unclaimed.raw()
    }

    pub fn with_at(self, at: At) -> Self {
        Self { at: Some(at), ..self }
    }

    pub fn with_layer(self, layer: impl Into<String>) -> Self {
        Self {
            layer: self.layer.clone().with_names(vec![layer.into()]),
            ..self
        }
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if !self.has_flag(&flag) {
            self.flags.push(SExp::Atom(flag));
        }
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }
}

impl Node for Footprint {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        let mut args = vec![SExp::atom(self.name.as_str())];
        args.extend(self.flags.iter().cloned());

        let fields = [
            self.version.as_ref().map(|n| n.render()),
            self.generator.as_ref().map(|n| n.render()),
            Some(self.layer.render()),
            self.uuid.as_ref().map(|n| n.render()),
            self.at.as_ref().map(|n| n.render()),
            self.descr.as_ref().map(|n| n.render()),
            self.tags.as_ref().map(|n| n.render()),
        ]
        .into_iter()
        .chain(self.properties.iter().map(|p| Some(p.render())));
        render_container(
            &self.token,
            &args,
            &render_children(fields, &self.unclaimed),
        )
    }
}

/// A known block this crate does not model, written back exactly as read.
#[derive(Debug, Clone, PartialEq)]
pub struct Verbatim {
    token: String,
    args: Vec<SExp>,
}

impl Verbatim {
    pub fn descriptor(token: &str) -> NodeDescriptor {
        NodeDescriptor::new(token, |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            Ok(Box::new(Verbatim {
                args: args.raw()?.to_vec(),
                token: args.token,
            }))
        })
        .raw_args()
    }

    pub fn args(&self) -> &[SExp] {
        &self.args
    }

    /// The block as a primitive tree.
    pub fn to_sexp(&self) -> SExp {
        let mut items = vec![SExp::atom(self.token.as_str())];
        items.extend(self.args.iter().cloned());
        SExp::List(items)
    }
}

impl Node for Verbatim {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        self.to_sexp().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{equivalent, CanonicalOptions};
    use crate::node::downcast;
    use crate::parser::parse_forms;
    use crate::registry::Registry;

    fn parse<T: Node>(text: &str) -> Result<T> {
        let registry = Registry::kicad();
        let node = registry.parse_str(text)?.remove(0).into_node().expect("node");
        downcast(node)
    }

    fn assert_equivalent(original: &str, rendered: &str) {
        equivalent(
            &parse_forms(original).unwrap().remove(0),
            &parse_forms(rendered).unwrap().remove(0),
            &CanonicalOptions::default(),
        )
        .unwrap();
    }

    #[test]
    fn test_footprint_flag_field_and_future_child() {
        let text = "(footprint \"R_0603\" locked (layer \"F.Cu\") (future_thing 1 (nested x)))";
        let fp: Footprint = parse(text).unwrap();
        assert!(fp.is_locked());
        assert_eq!(fp.layer().name(), "F.Cu");
        assert_eq!(fp.extensions(), &parse_forms("(future_thing 1 (nested x))").unwrap()[..]);

        let rendered = fp.render();
        assert_eq!(
            rendered,
            "(footprint R_0603 locked\n  (layer F.Cu)\n  (future_thing 1 (nested x))\n)"
        );
        assert_equivalent(text, &rendered);
    }

    #[test]
    fn test_footprint_requires_layer() {
        let err = parse::<Footprint>("(footprint \"X\" (at 0 0))").unwrap_err();
        assert!(err.to_string().contains("missing required 'layer'"), "{}", err);
    }

    #[test]
    fn test_footprint_single_at() {
        let err = parse::<Footprint>("(footprint \"X\" (layer F.Cu) (at 0 0) (at 1 1))").unwrap_err();
        assert!(matches!(err, KicadSexpError::Structural { .. }));
    }

    #[test]
    fn test_footprint_properties_in_order() {
        let fp: Footprint = parse(
            "(footprint \"X\" (layer F.Cu) (property \"Reference\" \"R1\") (property \"Value\" \"10k\") (tstamp abc))",
        )
        .unwrap();
        assert_eq!(fp.reference(), Some("R1"));
        let keys: Vec<&str> = fp.properties().iter().map(|p| p.key()).collect();
        assert_eq!(keys, ["Reference", "Value"]);
        assert_eq!(fp.uuid(), Some("abc"));
    }

    #[test]
    fn test_module_alias() {
        let fp: Footprint = parse("(module R_0603 (layer F.Cu) (at 1 2))").unwrap();
        assert_eq!(fp.token(), "module");
        assert!(fp.render().starts_with("(module R_0603\n"));
    }

    #[test]
    fn test_footprint_builders() {
        let fp = Footprint::new("R_0603", "F.Cu")
            .with_flag("locked")
            .with_flag("locked")
            .with_at(At::new(10.0, 5.0))
            .with_layer("B.Cu")
            .with_property(Property::new("Reference", "R7"));
        assert_eq!(
            fp.render(),
            "(footprint R_0603 locked\n  (layer B.Cu)\n  (at 10 5)\n  (property Reference R7)\n)"
        );
    }

    #[test]
    fn test_document_fields_and_children() {
        let text = "(kicad_pcb (version 20240108) (generator \"pcbnew\") (generator_version \"8.0\")
            (general (thickness 1.6))
            (footprint \"A\" (layer F.Cu))
            (footprint \"B\" (layer B.Cu))
            (gr_line (start 0 0) (end 1 1)))";
        let doc: Document = parse(text).unwrap();
        assert_eq!(doc.version(), Some(20240108.0));
        assert_eq!(doc.generator(), Some("pcbnew"));
        assert_eq!(doc.generator_version(), Some("8.0"));
        let names: Vec<&str> = doc.children_of::<Footprint>().map(|f| f.name()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(doc.children_of::<Verbatim>().count(), 1);
        assert_eq!(doc.extensions().len(), 1);
        assert_equivalent(text, &doc.render());
    }

    #[test]
    fn test_document_rejects_duplicate_version() {
        let err = parse::<Document>("(kicad_sch (version 1) (version 2))").unwrap_err();
        assert!(matches!(err, KicadSexpError::Structural { .. }));
    }

    #[test]
    fn test_document_demotes_broken_footprint() {
        let doc: Document = parse("(kicad_pcb (footprint \"A\" (at 0 0)))").unwrap();
        assert_eq!(doc.children_of::<Footprint>().count(), 0);
        assert_eq!(doc.extensions()[0].tag(), Some("footprint"));
    }

    #[test]
    fn test_document_builders() {
        let doc = Document::new("kicad_sch")
            .with_version(20231120.0)
            .with_generator("eeschema")
            .with_new_uuid();
        let rendered = doc.render();
        assert!(rendered.starts_with("(kicad_sch\n  (version 20231120)\n  (generator eeschema)\n  (uuid "));
        assert!(doc.uuid().is_some());
    }

    #[test]
    fn test_verbatim_preserves_order() {
        let v: Verbatim = parse("(title_block (title \"Board\") (rev 2) (comment 1 \"a\"))").unwrap();
        assert_eq!(v.render(), "(title_block (title Board) (rev 2) (comment 1 a))");
        assert_eq!(v.args().len(), 3);
    }
}
