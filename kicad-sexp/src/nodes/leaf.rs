use crate::core::{KicadSexpError, Result};
use crate::node::{render_leaf, LeafValue, Node};
use crate::parser::sexp::SExp;
use crate::registry::{NodeArgs, NodeDescriptor};

/// What a primitive leaf holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Number,
    Text,
    /// `yes` / `no`
    Bool,
}

/// `(token value)` with a single number, string or yes/no value.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    token: String,
    value: LeafValue,
}

impl Leaf {
    pub fn new(token: impl Into<String>, value: LeafValue) -> Self {
        Self {
            token: token.into(),
            value,
        }
    }

    /// A `(uuid ...)` leaf with a fresh random v4 uuid.
    pub fn new_uuid() -> Self {
        Self::new("uuid", LeafValue::Text(uuid::Uuid::new_v4().to_string()))
    }

    pub fn descriptor(token: &str, kind: LeafKind) -> NodeDescriptor {
        NodeDescriptor::new(token, move |args: NodeArgs<'_>| -> Result<Box<dyn Node>> {
            Ok(Box::new(Self::from_args(args, kind)?))
        })
    }

    fn from_args(mut args: NodeArgs<'_>, kind: LeafKind) -> Result<Self> {
        let atoms = args.atoms()?;
        if atoms.len() != 1 {
            return Err(KicadSexpError::structural(
                &args.token,
                format!("expected exactly one value, found {}", atoms.len()),
            ));
        }

        let value = match (kind, &atoms[0]) {
            (LeafKind::Number, SExp::Number(n)) => LeafValue::Number(*n),
            (LeafKind::Text, SExp::Atom(s)) => LeafValue::Text(s.clone()),
            (LeafKind::Bool, SExp::Atom(s)) if s == "yes" => LeafValue::Bool(true),
            (LeafKind::Bool, SExp::Atom(s)) if s == "no" => LeafValue::Bool(false),
            (kind, other) => {
                return Err(KicadSexpError::structural(
                    &args.token,
                    format!("expected a {:?} value, found {}", kind, other),
                ))
            }
        };

        Ok(Self {
            token: args.token,
            value,
        })
    }

    pub fn value(&self) -> &LeafValue {
        &self.value
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            LeafValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            LeafValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            LeafValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn with_value(self, value: LeafValue) -> Self {
        Self { value, ..self }
    }
}

impl Node for Leaf {
    fn token(&self) -> &str {
        &self.token
    }

    fn render(&self) -> String {
        render_leaf(&self.token, &self.value)
    }
}
