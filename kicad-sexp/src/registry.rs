//! Token-to-constructor dispatch
//!
//! A [`Registry`] maps a token name, optionally scoped to the token of the
//! enclosing node, onto a constructor. Scoped entries win over wildcard
//! ones, which is how `(size ...)` under `font` and `(size ...)` anywhere
//! else become different node types.
//!
//! The registry is built up front and then shared read-only across parses.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::classify::{self, ChildBuckets};
use crate::core::{KicadSexpError, Result};
use crate::node::{Node, Parsed};
use crate::parser::sexp::{parse_forms, SExp};

/// Children as handed to a constructor.
#[derive(Debug)]
pub enum Args {
    /// Descriptor set `raw_args`: children exactly as parsed.
    Raw(Vec<SExp>),
    /// Every child already dispatched through the registry.
    Resolved(Vec<Parsed>),
}

/// Everything a constructor gets to build one node.
pub struct NodeArgs<'r> {
    pub token: String,
    pub args: Args,
    pub registry: &'r Registry,
}

impl NodeArgs<'_> {
    /// Children exactly as parsed, for descriptors registered with `raw_args`.
    pub fn raw(&self) -> Result<&[SExp]> {
        match &self.args {
            Args::Raw(items) => Ok(items),
            Args::Resolved(_) => Err(KicadSexpError::structural(
                &self.token,
                "constructor expects unparsed children",
            )),
        }
    }

    pub fn take_resolved(&mut self) -> Result<Vec<Parsed>> {
        match &mut self.args {
            Args::Resolved(items) => Ok(std::mem::take(items)),
            Args::Raw(_) => Err(KicadSexpError::structural(
                &self.token,
                "constructor expects resolved children",
            )),
        }
    }

    /// Resolved children that must all be atoms.
    pub fn atoms(&mut self) -> Result<Vec<SExp>> {
        let token = self.token.clone();
        self.take_resolved()?
            .into_iter()
            .map(|p| match p {
                Parsed::Atom(atom) => Ok(atom),
                other => Err(KicadSexpError::structural(
                    &token,
                    format!("unexpected child {}", other.render()),
                )),
            })
            .collect()
    }

    /// Classify the raw children with this node as the parent.
    pub fn classify(&self, children: &[SExp]) -> Result<ChildBuckets> {
        self.registry.classify(children, &self.token)
    }

    /// Like [`NodeArgs::classify`], demoting unresolvable children to raw.
    pub fn classify_extensible(&self, children: &[SExp]) -> Result<(ChildBuckets, Vec<SExp>)> {
        self.registry.classify_extensible(children, &self.token)
    }
}

pub type Constructor = Arc<dyn Fn(NodeArgs<'_>) -> Result<Box<dyn Node>> + Send + Sync>;

/// Static description of one node type.
#[derive(Clone)]
pub struct NodeDescriptor {
    pub token: String,
    pub parent_token: Option<String>,
    pub raw_args: bool,
    construct: Constructor,
}

impl NodeDescriptor {
    pub fn new<F>(token: impl Into<String>, construct: F) -> Self
    where
        F: Fn(NodeArgs<'_>) -> Result<Box<dyn Node>> + Send + Sync + 'static,
    {
        Self {
            token: token.into(),
            parent_token: None,
            raw_args: false,
            construct: Arc::new(construct),
        }
    }

    /// Only match under an enclosing node with this token.
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent_token = Some(parent.into());
        self
    }

    /// Pass children to the constructor unparsed.
    pub fn raw_args(mut self) -> Self {
        self.raw_args = true;
        self
    }
}

impl fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("token", &self.token)
            .field("parent_token", &self.parent_token)
            .field("raw_args", &self.raw_args)
            .finish()
    }
}

/// Descriptors sharing one token name.
#[derive(Debug, Default)]
struct TokenEntry {
    any: Option<NodeDescriptor>,
    scoped: HashMap<String, NodeDescriptor>,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, TokenEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every node type shipped with this crate.
    pub fn try_kicad() -> Result<Self> {
        let mut registry = Self::new();
        crate::nodes::register_kicad_nodes(&mut registry)?;
        tracing::debug!("Registered {} KiCad node types", registry.len());
        Ok(registry)
    }

    /// Same as [`Registry::try_kicad`] for callers that cannot handle an
    /// error. The bundled table has distinct keys and non-empty tokens, so
    /// registration only fails if that table is edited incorrectly; the
    /// error is then logged and an empty registry returned.
    pub fn kicad() -> Self {
        Self::try_kicad().unwrap_or_else(|e| {
            tracing::error!("Bundled node registration failed: {}", e);
            Self::new()
        })
    }

    pub fn register(&mut self, descriptor: NodeDescriptor) -> Result<()> {
        if descriptor.token.is_empty() {
            return Err(KicadSexpError::Registration(
                "node descriptor has no token name".to_string(),
            ));
        }

        let entry = self.entries.entry(descriptor.token.clone()).or_default();
        let slot = match &descriptor.parent_token {
            Some(parent) => entry.scoped.get(parent),
            None => entry.any.as_ref(),
        };
        if slot.is_some() {
            return Err(KicadSexpError::Registration(format!(
                "token '{}' is already registered{}",
                descriptor.token,
                descriptor
                    .parent_token
                    .as_ref()
                    .map(|p| format!(" under '{}'", p))
                    .unwrap_or_default()
            )));
        }

        match descriptor.parent_token.clone() {
            Some(parent) => {
                entry.scoped.insert(parent, descriptor);
            }
            None => entry.any = Some(descriptor),
        }
        Ok(())
    }

    pub fn register_all(&mut self, descriptors: impl IntoIterator<Item = NodeDescriptor>) -> Result<()> {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .map(|e| e.scoped.len() + usize::from(e.any.is_some()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor for `token`, preferring one scoped to `parent`.
    pub fn lookup(&self, token: &str, parent: Option<&str>) -> Option<&NodeDescriptor> {
        let entry = self.entries.get(token)?;
        parent
            .and_then(|p| entry.scoped.get(p))
            .or(entry.any.as_ref())
    }

    /// Dispatch one primitive form.
    pub fn parse_primitive(&self, form: &SExp, parent: Option<&str>) -> Result<Parsed> {
        let items = match form {
            SExp::List(items) => items,
            atom => return Ok(Parsed::Atom(atom.clone())),
        };

        let token = match items.first() {
            Some(SExp::Atom(token)) => token,
            _ => {
                let resolved = items
                    .iter()
                    .map(|item| self.parse_primitive(item, parent))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(Parsed::List(resolved));
            }
        };

        let descriptor = self.lookup(token, parent).ok_or_else(|| {
            KicadSexpError::UnregisteredToken {
                token: token.clone(),
                parent: parent.map(str::to_string),
            }
        })?;

        let rest = &items[1..];
        let args = if descriptor.raw_args {
            Args::Raw(rest.to_vec())
        } else {
            Args::Resolved(
                rest.iter()
                    .map(|item| self.parse_primitive(item, Some(token.as_str())))
                    .collect::<Result<Vec<_>>>()?,
            )
        };

        let node = (descriptor.construct)(NodeArgs {
            token: token.clone(),
            args,
            registry: self,
        })?;
        Ok(Parsed::Node(node))
    }

    /// Tokenize, parse and dispatch every top-level form of `text`.
    pub fn parse_str(&self, text: &str) -> Result<Vec<Parsed>> {
        parse_forms(text)?
            .iter()
            .map(|form| self.parse_primitive(form, None))
            .collect()
    }

    pub fn classify(&self, children: &[SExp], context: &str) -> Result<ChildBuckets> {
        classify::classify(self, children, context)
    }

    pub fn classify_extensible(
        &self,
        children: &[SExp],
        context: &str,
    ) -> Result<(ChildBuckets, Vec<SExp>)> {
        classify::classify_extensible(self, children, context)
    }
}
