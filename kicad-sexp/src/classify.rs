//! Child classification
//!
//! Resolves a container's children through the registry and groups them by
//! resolved token. The classifier never enforces cardinality; the container
//! asks for what it expects (`take_one`, `take_required`, `take_many`) and
//! gets a structural error when the input disagrees.

use std::collections::HashMap;

use crate::core::{KicadSexpError, Result};
use crate::node::{downcast, Node, Parsed};
use crate::parser::sexp::SExp;
use crate::registry::Registry;

#[derive(Debug, Default)]
pub struct ChildBuckets {
    context: String,
    /// Tokens in order of first appearance.
    order: Vec<String>,
    /// Every node per token, in input order.
    repeats: HashMap<String, Vec<Box<dyn Node>>>,
    /// Input position of each node in `repeats`, parallel per token.
    positions: HashMap<String, Vec<usize>>,
    /// Input positions of children demoted to raw storage.
    demoted: Vec<usize>,
    next_position: usize,
}

impl ChildBuckets {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn push(&mut self, node: Box<dyn Node>) {
        let token = node.token().to_string();
        let position = self.next_position;
        self.next_position += 1;
        if !self.repeats.contains_key(&token) {
            self.order.push(token.clone());
        }
        self.positions.entry(token.clone()).or_default().push(position);
        self.repeats.entry(token).or_default().push(node);
    }

    /// Record that the next child in input order went to raw storage.
    fn push_demoted(&mut self) {
        self.demoted.push(self.next_position);
        self.next_position += 1;
    }

    /// First occurrence of `token`.
    pub fn single(&self, token: &str) -> Option<&dyn Node> {
        self.repeats
            .get(token)
            .and_then(|nodes| nodes.first())
            .map(|n| &**n)
    }

    /// Every occurrence of `token`, in input order.
    pub fn repeats(&self, token: &str) -> &[Box<dyn Node>] {
        self.repeats.get(token).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// First occurrence of each token, in order of first appearance.
    pub fn singles(&self) -> impl Iterator<Item = (&str, &dyn Node)> {
        self.order.iter().filter_map(|token| {
            self.single(token).map(|node| (token.as_str(), node))
        })
    }

    pub fn count(&self, token: &str) -> usize {
        self.repeats(token).len()
    }

    pub fn is_empty(&self) -> bool {
        self.repeats.values().all(|v| v.is_empty())
    }

    fn take_all(&mut self, token: &str) -> Vec<Box<dyn Node>> {
        self.order.retain(|t| t != token);
        self.positions.remove(token);
        self.repeats.remove(token).unwrap_or_default()
    }

    /// At most one `token`; more is a structural error.
    pub fn take_one<T: Node>(&mut self, token: &str) -> Result<Option<T>> {
        if self.count(token) > 1 {
            return Err(KicadSexpError::structural(
                &self.context,
                format!("expected at most one '{}', found {}", token, self.count(token)),
            ));
        }
        match self.take_all(token).pop() {
            Some(node) => downcast::<T>(node).map(Some),
            None => Ok(None),
        }
    }

    /// Exactly one `token`.
    pub fn take_required<T: Node>(&mut self, token: &str) -> Result<T> {
        self.take_one(token)?.ok_or_else(|| {
            KicadSexpError::structural(&self.context, format!("missing required '{}'", token))
        })
    }

    /// Zero or more `token`, in input order.
    pub fn take_many<T: Node>(&mut self, token: &str) -> Result<Vec<T>> {
        self.take_all(token).into_iter().map(downcast::<T>).collect()
    }

    /// At most one child among several alternative tokens, for fields whose
    /// type is a closed set of variants.
    pub fn take_one_of(&mut self, tokens: &[&str]) -> Result<Option<Box<dyn Node>>> {
        let present: Vec<&str> = tokens.iter().copied().filter(|t| self.count(t) > 0).collect();
        let total: usize = present.iter().map(|t| self.count(t)).sum();
        if total > 1 {
            return Err(KicadSexpError::structural(
                &self.context,
                format!("expected at most one of {}, found {}", tokens.join("/"), total),
            ));
        }
        Ok(present.first().and_then(|t| self.take_all(t).pop()))
    }

    fn drain_positioned(&mut self) -> Vec<(usize, Box<dyn Node>)> {
        let mut nodes: Vec<(usize, Box<dyn Node>)> = Vec::new();
        for token in std::mem::take(&mut self.order) {
            let positions = self.positions.remove(&token).unwrap_or_default();
            let repeats = self.repeats.remove(&token).unwrap_or_default();
            nodes.extend(positions.into_iter().zip(repeats));
        }
        nodes.sort_by_key(|(position, _)| *position);
        nodes
    }

    /// Unclaimed children, in input order.
    pub fn into_remaining(mut self) -> Vec<Box<dyn Node>> {
        self.drain_positioned().into_iter().map(|(_, node)| node).collect()
    }

    /// Unclaimed children interleaved with the `raw` list returned by
    /// [`classify_extensible`], both in input order.
    pub fn into_unclaimed(mut self, raw: Vec<SExp>) -> Unclaimed {
        let mut nodes = self.drain_positioned().into_iter().peekable();
        let mut raw = self.demoted.iter().copied().zip(raw).peekable();
        let mut unclaimed = Unclaimed::new();
        loop {
            let node_first = match (nodes.peek(), raw.peek()) {
                (Some((n, _)), Some((r, _))) => n < r,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if node_first {
                if let Some((_, node)) = nodes.next() {
                    unclaimed.push_node(node);
                }
            } else if let Some((_, sexp)) = raw.next() {
                unclaimed.push_raw(sexp);
            }
        }
        unclaimed
    }

    /// Fail if any child was left unclaimed.
    pub fn finish_strict(self) -> Result<()> {
        match self.order.first() {
            Some(token) => Err(KicadSexpError::structural(
                &self.context,
                format!("unsupported child '{}'", token),
            )),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node,
    Raw,
}

/// Children of an extensible container that no typed field claimed:
/// resolved nodes and verbatim lists, interleaved as they were read.
#[derive(Debug, Default)]
pub struct Unclaimed {
    nodes: Vec<Box<dyn Node>>,
    raw: Vec<SExp>,
    slots: Vec<Slot>,
}

impl Unclaimed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: Vec<SExp>) -> Self {
        Self {
            slots: vec![Slot::Raw; raw.len()],
            nodes: Vec::new(),
            raw,
        }
    }

    pub fn nodes(&self) -> &[Box<dyn Node>] {
        &self.nodes
    }

    pub fn raw(&self) -> &[SExp] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn push_node(&mut self, node: Box<dyn Node>) {
        self.nodes.push(node);
        self.slots.push(Slot::Node);
    }

    pub fn push_raw(&mut self, sexp: SExp) {
        self.raw.push(sexp);
        self.slots.push(Slot::Raw);
    }

    /// One rendered child per entry, in input order.
    pub fn render(&self) -> Vec<String> {
        let mut nodes = self.nodes.iter();
        let mut raw = self.raw.iter();
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Node => nodes.next().map(|n| n.render()),
                Slot::Raw => raw.next().map(|r| r.to_string()),
            })
            .collect()
    }
}

fn resolve_child(registry: &Registry, child: &SExp, context: &str) -> Result<Box<dyn Node>> {
    match child {
        SExp::List(items) if matches!(items.first(), Some(SExp::Atom(_))) => {
            match registry.parse_primitive(child, Some(context))? {
                Parsed::Node(node) => Ok(node),
                other => Err(KicadSexpError::structural(
                    context,
                    format!("child did not resolve to a node: {}", other.render()),
                )),
            }
        }
        other => Err(KicadSexpError::structural(
            context,
            format!("unexpected bare child {}", other),
        )),
    }
}

/// Resolve and bucket `children` with `context` as their parent token.
pub fn classify(registry: &Registry, children: &[SExp], context: &str) -> Result<ChildBuckets> {
    let mut buckets = ChildBuckets::new(context);
    for child in children {
        buckets.push(resolve_child(registry, child, context)?);
    }
    Ok(buckets)
}

/// Classification for format-extensible containers: children that fail
/// with an unregistered-token or structural error are returned verbatim,
/// in input order, instead of failing the container.
pub fn classify_extensible(
    registry: &Registry,
    children: &[SExp],
    context: &str,
) -> Result<(ChildBuckets, Vec<SExp>)> {
    let mut buckets = ChildBuckets::new(context);
    let mut raw = Vec::new();
    for child in children {
        match resolve_child(registry, child, context) {
            Ok(node) => buckets.push(node),
            Err(e) if e.is_demotable() => {
                tracing::debug!("Keeping child of '{}' verbatim: {}", context, e);
                buckets.push_demoted();
                raw.push(child.clone());
            }
            Err(e) => return Err(e),
        }
    }
    Ok((buckets, raw))
}

/// Split leading bare atoms (flags like `locked`) from the child lists.
pub fn split_flags(children: &[SExp]) -> (Vec<SExp>, Vec<SExp>) {
    children.iter().cloned().partition(|c| !c.is_list())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{At, Leaf, Property};
    use crate::parser::parse_forms;

    fn children(text: &str) -> Vec<SExp> {
        parse_forms(text).unwrap()
    }

    #[test]
    fn test_single_at_rejects_duplicates() {
        let registry = Registry::kicad();
        let mut buckets = classify(&registry, &children("(at 0 0) (at 1 1)"), "footprint").unwrap();
        assert_eq!(buckets.count("at"), 2);
        let err = buckets.take_one::<At>("at").unwrap_err();
        assert!(matches!(err, KicadSexpError::Structural { .. }));
    }

    #[test]
    fn test_repeats_preserve_input_order() {
        let registry = Registry::kicad();
        let mut buckets = classify(
            &registry,
            &children("(property \"A\" \"1\") (at 0 0) (property \"B\" \"2\") (property \"C\" \"3\")"),
            "symbol",
        )
        .unwrap();

        assert_eq!(buckets.single("property").map(|n| n.token()), Some("property"));
        let keys: Vec<String> = buckets
            .take_many::<Property>("property")
            .unwrap()
            .into_iter()
            .map(|p| p.key().to_string())
            .collect();
        assert_eq!(keys, ["A", "B", "C"]);
        assert!(buckets.take_one::<At>("at").unwrap().is_some());
        assert!(buckets.finish_strict().is_ok());
    }

    #[test]
    fn test_singles_follow_first_appearance() {
        let registry = Registry::kicad();
        let buckets = classify(&registry, &children("(uuid a) (at 1 2) (uuid b)"), "x").unwrap();
        let tokens: Vec<&str> = buckets.singles().map(|(t, _)| t).collect();
        assert_eq!(tokens, ["uuid", "at"]);
    }

    #[test]
    fn test_remaining_keeps_input_order() {
        let registry = Registry::kicad();
        let buckets = classify(
            &registry,
            &children("(net 0 a) (footprint A (layer F.Cu)) (net 1 b)"),
            "kicad_pcb",
        )
        .unwrap();
        let tokens: Vec<String> = buckets
            .into_remaining()
            .iter()
            .map(|n| n.token().to_string())
            .collect();
        assert_eq!(tokens, ["net", "footprint", "net"]);
    }

    #[test]
    fn test_unclaimed_interleaves_nodes_and_raw() {
        let registry = Registry::kicad();
        let (mut buckets, raw) = classify_extensible(
            &registry,
            &children("(future 1) (net 0 a) (uuid x) (later 2) (net 1 b)"),
            "kicad_pcb",
        )
        .unwrap();
        assert!(buckets.take_one::<Leaf>("uuid").unwrap().is_some());

        let unclaimed = buckets.into_unclaimed(raw);
        assert_eq!(unclaimed.nodes().len(), 2);
        assert_eq!(unclaimed.raw().len(), 2);
        assert_eq!(
            unclaimed.render(),
            ["(future 1)", "(net 0 a)", "(later 2)", "(net 1 b)"]
        );
    }

    #[test]
    fn test_bare_children_rejected() {
        let registry = Registry::kicad();
        let err = classify(&registry, &children("locked (at 0 0)"), "footprint").unwrap_err();
        assert!(matches!(err, KicadSexpError::Structural { .. }));
    }

    #[test]
    fn test_strict_propagates_unknown_tokens() {
        let registry = Registry::kicad();
        let err = classify(&registry, &children("(future 1)"), "footprint").unwrap_err();
        assert!(matches!(err, KicadSexpError::UnregisteredToken { .. }));
    }

    #[test]
    fn test_extensible_demotes_to_raw() {
        let registry = Registry::kicad();
        let (mut buckets, raw) = classify_extensible(
            &registry,
            &children("(future 1) (at 1 2) (at oops) (later (x))"),
            "footprint",
        )
        .unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0].tag(), Some("future"));
        assert_eq!(raw[1].tag(), Some("at"));
        assert_eq!(raw[2].tag(), Some("later"));
        assert!(buckets.take_one::<At>("at").unwrap().is_some());
    }

    #[test]
    fn test_required_and_unsupported() {
        let registry = Registry::kicad();
        let mut buckets = classify(&registry, &children("(uuid a)"), "pad").unwrap();
        assert!(buckets.take_required::<At>("at").is_err());
        assert!(buckets.finish_strict().is_err());
    }

    #[test]
    fn test_take_one_of() {
        let registry = Registry::kicad();
        let mut buckets = classify(&registry, &children("(xy 1 2)"), "x").unwrap();
        let node = buckets.take_one_of(&["at", "xy"]).unwrap().unwrap();
        assert_eq!(node.token(), "xy");

        let mut both = classify(&registry, &children("(xy 1 2) (at 0 0)"), "x").unwrap();
        assert!(both.take_one_of(&["at", "xy"]).is_err());
    }

    #[test]
    fn test_split_flags() {
        let (flags, lists) = split_flags(&children("locked (layer F.Cu) placed"));
        assert_eq!(flags, vec![SExp::atom("locked"), SExp::atom("placed")]);
        assert_eq!(lists.len(), 1);
    }
}
