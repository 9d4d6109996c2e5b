//! Properties and text effects.
//!
//! These containers are format-extensible: a child this crate does not
//! model (or cannot parse) is kept verbatim and written back unchanged.

use crate::classify::{split_flags, Unclaimed};
use crate::core::{KicadSexpError, Result};
use crate::node::{render_children, render_container, render_inline, string_arg, Node};
use crate::parser::sexp::SExp;
use crate::registry::{NodeArgs, NodeDescriptor};

use super::geometry::{At, FontSize};
use super::leaf::Leaf;

/// `(property "Key" "Value" (at ..) (effects ..) ...)`
#[derive(Debug)]
pub struct Property {
    key: String,
    value: String,
    flags: Vec<SExp>,
    id: Option<Leaf>,
    at: Option<At>,
    effects: Option<Effects>,
    hide: Option<Leaf>,
    unclaimed: Unclaimed,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            flags: Vec::new(),
            id: None,
            at: None,
            effects: None,
            hide: None,
            unclaimed: Unclaimed::new(),
        }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("property", |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            Ok(Box::new(Property::from_args(args)?))
        })
        .raw_args()
    }

    fn from_args(args: NodeArgs<'_>) -> Result<Self> {
        let raw = args.raw()?;
        let key = string_arg(&args.token, raw, 0, "key")?;
        let value = string_arg(&args.token, raw, 1, "value")?;

        let (flags, lists) = split_flags(&raw[2..]);
        let (mut buckets, extensions) = args.classify_extensible(&lists)?;

        Ok(Self {
            key,
            value,
            flags,
            id: buckets.take_one("id")?,
            at: buckets.take_one("at")?,
            effects: buckets.take_one("effects")?,
            hide: buckets.take_one("hide")?,
            unclaimed: buckets.into_unclaimed(extensions),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn at(&self) -> Option<&At> {
        self.at.as_ref()
    }

    pub fn effects(&self) -> Option<&Effects> {
        self.effects.as_ref()
    }

    pub fn id(&self) -> Option<f64> {
        self.id.as_ref().and_then(|l| l.as_number())
    }

    /// Hidden through `(hide yes)` on the property or a bare `hide` in its effects.
    pub fn is_hidden(&self) -> bool {
        self.hide.as_ref().and_then(|h| h.as_bool()).unwrap_or(false)
            || self.effects.as_ref().map(|e| e.is_hidden()).unwrap_or(false)
    }

    /// Children kept verbatim.
    pub fn extensions(&self) -> &[SExp] {
        self.unclaimed.raw()
    }

    pub fn with_value(self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self
        }
    }

    pub fn with_at(self, at: At) -> Self {
        Self { at: Some(at), ..self }
    }

    pub fn with_effects(self, effects: Effects) -> Self {
        Self {
            effects: Some(effects),
            ..self
        }
    }
}

impl Node for Property {
    fn token(&self) -> &str {
        "property"
    }

    fn render(&self) -> String {
        let mut args = vec![SExp::atom(self.key.as_str()), SExp::atom(self.value.as_str())];
        args.extend(self.flags.iter().cloned());

        let fields = [
            self.id.as_ref().map(|n| n.render()),
            self.at.as_ref().map(|n| n.render()),
            self.hide.as_ref().map(|n| n.render()),
            self.effects.as_ref().map(|n| n.render()),
        ];
        render_container("property", &args, &render_children(fields, &self.unclaimed))
    }
}

/// `(effects (font ..) (justify ..) hide)`
#[derive(Debug, Default)]
pub struct Effects {
    flags: Vec<SExp>,
    font: Option<Font>,
    justify: Option<Justify>,
    hide: Option<Leaf>,
    unclaimed: Unclaimed,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("effects", |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let (flags, lists) = split_flags(args.raw()?);
            let (mut buckets, extensions) = args.classify_extensible(&lists)?;
            Ok(Box::new(Effects {
                flags,
                font: buckets.take_one("font")?,
                justify: buckets.take_one("justify")?,
                hide: buckets.take_one("hide")?,
                unclaimed: buckets.into_unclaimed(extensions),
            }))
        })
        .raw_args()
    }

    pub fn font(&self) -> Option<&Font> {
        self.font.as_ref()
    }

    pub fn justify(&self) -> Option<&Justify> {
        self.justify.as_ref()
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.iter().any(|f| f.as_atom() == Some("hide"))
            || self.hide.as_ref().and_then(|h| h.as_bool()).unwrap_or(false)
    }

    pub fn with_font(self, font: Font) -> Self {
        Self {
            font: Some(font),
            ..self
        }
    }

    pub fn with_justify(self, justify: Justify) -> Self {
        Self {
            justify: Some(justify),
            ..self
        }
    }
}

impl Node for Effects {
    fn token(&self) -> &str {
        "effects"
    }

    fn render(&self) -> String {
        let fields = [
            self.font.as_ref().map(|n| n.render()),
            self.justify.as_ref().map(|n| n.render()),
            self.hide.as_ref().map(|n| n.render()),
        ];
        render_container("effects", &self.flags, &render_children(fields, &self.unclaimed))
    }
}

/// `(font (size h w) (thickness t) bold italic)`
#[derive(Debug, Default)]
pub struct Font {
    flags: Vec<SExp>,
    size: Option<FontSize>,
    thickness: Option<Leaf>,
    bold: Option<Leaf>,
    italic: Option<Leaf>,
    unclaimed: Unclaimed,
}

impl Font {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("font", |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let (flags, lists) = split_flags(args.raw()?);
            let (mut buckets, extensions) = args.classify_extensible(&lists)?;
            Ok(Box::new(Font {
                flags,
                size: buckets.take_one("size")?,
                thickness: buckets.take_one("thickness")?,
                bold: buckets.take_one("bold")?,
                italic: buckets.take_one("italic")?,
                unclaimed: buckets.into_unclaimed(extensions),
            }))
        })
        .raw_args()
    }

    pub fn size(&self) -> Option<&FontSize> {
        self.size.as_ref()
    }

    pub fn thickness(&self) -> Option<f64> {
        self.thickness.as_ref().and_then(|t| t.as_number())
    }

    fn flag_or_leaf(&self, name: &str, leaf: &Option<Leaf>) -> bool {
        self.flags.iter().any(|f| f.as_atom() == Some(name))
            || leaf.as_ref().and_then(|l| l.as_bool()).unwrap_or(false)
    }

    pub fn is_bold(&self) -> bool {
        self.flag_or_leaf("bold", &self.bold)
    }

    pub fn is_italic(&self) -> bool {
        self.flag_or_leaf("italic", &self.italic)
    }

    pub fn with_size(self, height: f64, width: f64) -> Self {
        Self {
            size: Some(FontSize::new(height, width)),
            ..self
        }
    }
}

impl Node for Font {
    fn token(&self) -> &str {
        "font"
    }

    fn render(&self) -> String {
        let fields = [
            self.size.as_ref().map(|n| n.render()),
            self.thickness.as_ref().map(|n| n.render()),
            self.bold.as_ref().map(|n| n.render()),
            self.italic.as_ref().map(|n| n.render()),
        ];
        render_container("font", &self.flags, &render_children(fields, &self.unclaimed))
    }
}

/// `(justify left bottom mirror)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Justify {
    flags: Vec<String>,
}

impl Justify {
    pub fn new(flags: Vec<String>) -> Self {
        Self { flags }
    }

    pub fn descriptor() -> NodeDescriptor {
        NodeDescriptor::new("justify", |mut args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            let flags = args
                .atoms()?
                .into_iter()
                .map(|atom| match atom {
                    SExp::Atom(flag) => Ok(flag),
                    other => Err(KicadSexpError::structural(
                        &args.token,
                        format!("unexpected justification {}", other),
                    )),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Justify { flags }))
        })
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn has(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

impl Node for Justify {
    fn token(&self) -> &str {
        "justify"
    }

    fn render(&self) -> String {
        let args: Vec<SExp> = self.flags.iter().map(|f| SExp::atom(f.as_str())).collect();
        render_inline("justify", &args)
    }
}
