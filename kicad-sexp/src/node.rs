//! Node model and serialization contract
//!
//! Every typed node renders itself back to S-expression text. Containers
//! put positional atoms on the head line and each child on its own line,
//! indented two spaces per nesting level; leaves stay on one line:
//!
//! ```text
//! (footprint "R_0603" locked
//!   (layer F.Cu)
//!   (at 10 20)
//! )
//! ```

use std::any::Any;
use std::fmt;

use crate::classify::Unclaimed;
use crate::core::{KicadSexpError, Result};
use crate::parser::sexp::{format_number, quote_if_needed, SExp};

/// Lets `dyn Node` be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub trait Node: AsAny + fmt::Debug + Send + Sync {
    /// Token this instance was parsed from (or will be written as).
    fn token(&self) -> &str;

    /// S-expression text for this node, without a trailing newline.
    fn render(&self) -> String;
}

impl dyn Node {
    pub fn is<T: Node>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Node>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Take ownership of a boxed node as its concrete type.
pub fn downcast<T: Node>(node: Box<dyn Node>) -> Result<T> {
    if !node.is::<T>() {
        return Err(KicadSexpError::structural(
            node.token(),
            format!("expected a {}", short_type_name::<T>()),
        ));
    }
    node.into_any()
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| KicadSexpError::structural("", "node type changed during downcast"))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// A resolved form: a typed node, an atom passed through, or a list whose
/// head is not a token.
#[derive(Debug)]
pub enum Parsed {
    Node(Box<dyn Node>),
    Atom(SExp),
    List(Vec<Parsed>),
}

impl Parsed {
    pub fn token(&self) -> Option<&str> {
        match self {
            Parsed::Node(node) => Some(node.token()),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&dyn Node> {
        match self {
            Parsed::Node(node) => Some(&**node),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<Box<dyn Node>> {
        match self {
            Parsed::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&SExp> {
        match self {
            Parsed::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Parsed::Node(node) => node.render(),
            Parsed::Atom(atom) => atom.to_string(),
            Parsed::List(items) => {
                let inner: Vec<String> = items.iter().map(|p| p.render()).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

/// Prefix every line of `text` with two spaces.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a container: positional atoms on the head line, then one
/// indented line per child.
pub fn render_container(token: &str, args: &[SExp], children: &[String]) -> String {
    let mut out = format!("({}", quote_if_needed(token));
    for arg in args {
        out.push(' ');
        out.push_str(&arg.to_string());
    }
    if children.is_empty() {
        out.push(')');
        return out;
    }
    for child in children {
        out.push('\n');
        out.push_str(&indent(child));
    }
    out.push_str("\n)");
    out
}

/// Render `(token a b c)` on one line.
pub fn render_inline(token: &str, args: &[SExp]) -> String {
    render_container(token, args, &[])
}

/// Value of a primitive-leaf node.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl LeafValue {
    /// Leaf text: numbers as decimals, booleans as `yes`/`no`.
    pub fn render(&self) -> String {
        match self {
            LeafValue::Number(n) => format_number(*n),
            LeafValue::Text(s) => quote_if_needed(s),
            LeafValue::Bool(true) => "yes".to_string(),
            LeafValue::Bool(false) => "no".to_string(),
        }
    }
}

pub fn render_leaf(token: &str, value: &LeafValue) -> String {
    format!("({} {})", quote_if_needed(token), value.render())
}

/// Child lines of a container: present typed fields in declaration order,
/// then unclaimed children in input order.
pub fn render_children(
    fields: impl IntoIterator<Item = Option<String>>,
    unclaimed: &Unclaimed,
) -> Vec<String> {
    fields
        .into_iter()
        .flatten()
        .chain(unclaimed.render())
        .collect()
}

/// Expect a number atom at `index` of a node's arguments.
pub fn number_arg(token: &str, args: &[SExp], index: usize, name: &str) -> Result<f64> {
    match args.get(index) {
        Some(SExp::Number(n)) => Ok(*n),
        Some(other) => Err(KicadSexpError::structural(
            token,
            format!("{} must be a number, found {}", name, other.type_name()),
        )),
        None => Err(KicadSexpError::structural(token, format!("missing {}", name))),
    }
}

/// Expect a string atom at `index` of a node's arguments.
pub fn string_arg(token: &str, args: &[SExp], index: usize, name: &str) -> Result<String> {
    match args.get(index) {
        Some(SExp::Atom(s)) => Ok(s.clone()),
        Some(other) => Err(KicadSexpError::structural(
            token,
            format!("{} must be a string, found {}", name, other.type_name()),
        )),
        None => Err(KicadSexpError::structural(token, format!("missing {}", name))),
    }
}

/// Reject arguments past `max`.
pub fn max_args(token: &str, args: &[SExp], max: usize) -> Result<()> {
    if args.len() > max {
        return Err(KicadSexpError::structural(
            token,
            format!("expected at most {} arguments, found {}", max, args.len()),
        ));
    }
    Ok(())
}
