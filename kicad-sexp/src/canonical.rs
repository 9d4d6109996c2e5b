//! Canonical comparison of primitive trees
//!
//! Rendering moves typed fields ahead of other children, so round trips are judged on
//! canonical forms rather than on text. Canonicalization keeps positional
//! children in place and sorts tagged children by tag and serialized value,
//! except for order-sensitive tags such as `xy` whose sequence is geometry.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::parser::sexp::SExp;

#[derive(Clone, Debug)]
pub struct CanonicalOptions {
    /// Tags whose relative order is significant.
    pub ordered_tags: BTreeSet<String>,
}

impl Default for CanonicalOptions {
    fn default() -> Self {
        Self {
            ordered_tags: ["xy".to_string()].into_iter().collect(),
        }
    }
}

impl CanonicalOptions {
    pub fn with_ordered_tag(mut self, tag: impl Into<String>) -> Self {
        self.ordered_tags.insert(tag.into());
        self
    }
}

pub fn canonicalize(tree: &SExp, options: &CanonicalOptions) -> SExp {
    let items = match tree {
        SExp::List(items) => items,
        atom => return atom.clone(),
    };

    let children: Vec<SExp> = items.iter().map(|c| canonicalize(c, options)).collect();

    match children.first() {
        Some(SExp::Atom(_)) => {
            let mut iter = children.into_iter();
            let mut out: Vec<SExp> = iter.next().into_iter().collect();
            let mut grouped = Vec::new();
            for child in iter {
                match child.tag() {
                    Some(tag) if !options.ordered_tags.contains(tag) => {
                        grouped.push((tag.to_string(), child.to_string(), child))
                    }
                    _ => out.push(child),
                }
            }
            grouped.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
            out.extend(grouped.into_iter().map(|(_, _, child)| child));
            SExp::List(out)
        }
        Some(SExp::List(_)) => {
            let mut keyed: Vec<(String, SExp)> =
                children.into_iter().map(|c| (c.to_string(), c)).collect();
            // lists sort before atoms so the head stays a list
            keyed.sort_by(|a, b| multiset_order(a, b));
            SExp::List(keyed.into_iter().map(|(_, c)| c).collect())
        }
        _ => SExp::List(children),
    }
}

fn multiset_order(a: &(String, SExp), b: &(String, SExp)) -> Ordering {
    (!a.1.is_list(), &a.0).cmp(&(!b.1.is_list(), &b.0))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DivergenceKind {
    Type { expected: String, actual: String },
    Length { expected: usize, actual: usize },
    Value { expected: String, actual: String },
}

/// First point where two canonical trees differ.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct Divergence {
    pub path: String,
    pub kind: DivergenceKind,
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceKind::Type { expected, actual } => {
                write!(f, "expected {}, found {}", expected, actual)
            }
            DivergenceKind::Length { expected, actual } => {
                write!(f, "expected {} elements, found {}", expected, actual)
            }
            DivergenceKind::Value { expected, actual } => {
                write!(f, "expected {}, found {}", expected, actual)
            }
        }
    }
}

/// Compare two already canonical trees.
pub fn compare(expected: &SExp, actual: &SExp) -> Result<(), Divergence> {
    compare_at("$", expected, actual)
}

/// Canonicalize both trees, then compare.
pub fn equivalent(expected: &SExp, actual: &SExp, options: &CanonicalOptions) -> Result<(), Divergence> {
    compare(&canonicalize(expected, options), &canonicalize(actual, options))
}

fn compare_at(path: &str, expected: &SExp, actual: &SExp) -> Result<(), Divergence> {
    match (expected, actual) {
        (SExp::List(e), SExp::List(a)) => {
            if e.len() != a.len() {
                return Err(Divergence {
                    path: path.to_string(),
                    kind: DivergenceKind::Length {
                        expected: e.len(),
                        actual: a.len(),
                    },
                });
            }
            let label = expected.tag().unwrap_or("");
            for (i, (ec, ac)) in e.iter().zip(a.iter()).enumerate() {
                compare_at(&format!("{}/{}[{}]", path, label, i), ec, ac)?;
            }
            Ok(())
        }
        _ if std::mem::discriminant(expected) != std::mem::discriminant(actual) => Err(Divergence {
            path: path.to_string(),
            kind: DivergenceKind::Type {
                expected: expected.type_name().to_string(),
                actual: actual.type_name().to_string(),
            },
        }),
        // compare the printed form so nan matches nan
        _ if expected.to_string() != actual.to_string() => Err(Divergence {
            path: path.to_string(),
            kind: DivergenceKind::Value {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        }),
        _ => Ok(()),
    }
}
