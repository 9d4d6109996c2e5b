//! Error taxonomy, round-trip checking and file discovery shared by the
//! library entry points and the CLI.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::canonical::{canonicalize, compare, CanonicalOptions, Divergence};
use crate::document::{self, KicadDocument};
use crate::node::Parsed;
use crate::parser::{parse_forms, SExp};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnmatchedOpen,
    UnmatchedClose,
    /// Lists nested deeper than [`crate::parser::MAX_DEPTH`]
    TooDeep,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnmatchedOpen => write!(f, "unmatched '('"),
            SyntaxErrorKind::UnmatchedClose => write!(f, "unmatched ')'"),
            SyntaxErrorKind::TooDeep => write!(f, "lists nested deeper than {}", crate::parser::MAX_DEPTH),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KicadSexpError {
    #[error("Lex error at {line}:{column}: {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("Syntax error at {line}:{column}: {kind}")]
    Syntax {
        line: usize,
        column: usize,
        kind: SyntaxErrorKind,
    },
    #[error("No node type registered for token '{token}'{}", parent_suffix(.parent))]
    UnregisteredToken {
        token: String,
        parent: Option<String>,
    },
    #[error("Invalid '{token}': {message}")]
    Structural { token: String, message: String },
    #[error("Expected a {expected} document, found {found}")]
    RootTypeMismatch { expected: String, found: String },
    #[error("Registration error: {0}")]
    Registration(String),
    #[error("Round trip mismatch: {0}")]
    RoundTrip(#[from] Divergence),
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFile(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn parent_suffix(parent: &Option<String>) -> String {
    match parent {
        Some(p) => format!(" under '{}'", p),
        None => String::new(),
    }
}

impl KicadSexpError {
    pub fn structural(token: impl Into<String>, message: impl Into<String>) -> Self {
        KicadSexpError::Structural {
            token: token.into(),
            message: message.into(),
        }
    }

    /// True for the errors an extensible container may demote to raw storage.
    pub fn is_demotable(&self) -> bool {
        matches!(
            self,
            KicadSexpError::UnregisteredToken { .. } | KicadSexpError::Structural { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, KicadSexpError>;

/// Options for round-trip checks (CLI or tests).
#[derive(Clone, Debug, Default)]
pub struct RoundTripOptions {
    pub canonical: CanonicalOptions,
}

/// Outcome of checking one file.
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripReport {
    pub file: Option<PathBuf>,
    pub root: String,
    pub equivalent: bool,
    pub divergence: Option<String>,
    pub rendered_bytes: usize,
}

/// Parse `text`, render the node tree and verify the rendering is
/// canonically equivalent to the input.
pub fn check_round_trip(
    registry: &Registry,
    text: &str,
    options: &RoundTripOptions,
) -> Result<RoundTripReport> {
    let original = parse_forms(text)?;
    let parsed = original
        .iter()
        .map(|form| registry.parse_primitive(form, None))
        .collect::<Result<Vec<_>>>()?;
    round_trip_report(&original, &parsed, options)
}

fn round_trip_report(
    original: &[SExp],
    parsed: &[Parsed],
    options: &RoundTripOptions,
) -> Result<RoundTripReport> {
    let rendered = parsed
        .iter()
        .map(|p| p.render())
        .collect::<Vec<_>>()
        .join("\n");
    let reparsed = parse_forms(&rendered)?;

    let root = parsed
        .first()
        .and_then(|p| p.token())
        .unwrap_or("")
        .to_string();

    let divergence = compare_forms(original, &reparsed, &options.canonical).err();
    if let Some(ref d) = divergence {
        tracing::warn!("Round trip of '{}' diverged: {}", root, d);
    }

    Ok(RoundTripReport {
        file: None,
        root,
        equivalent: divergence.is_none(),
        divergence: divergence.map(|d| d.to_string()),
        rendered_bytes: rendered.len(),
    })
}

fn compare_forms(
    expected: &[SExp],
    actual: &[SExp],
    options: &CanonicalOptions,
) -> std::result::Result<(), Divergence> {
    let expected = SExp::List(expected.to_vec());
    let actual = SExp::List(actual.to_vec());
    compare(
        &canonicalize(&expected, options),
        &canonicalize(&actual, options),
    )
}

/// Check a single file: the root must match its extension, then the text
/// must survive a round trip.
pub fn check_file(
    registry: &Registry,
    path: &Path,
    options: &RoundTripOptions,
) -> Result<RoundTripReport> {
    tracing::debug!("Checking {}", path.display());
    let kind = document::kind_for_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let original = parse_forms(&text)?;
    let root = document::root_of_forms(registry, kind, &original)?;

    let mut report = round_trip_report(&original, &[Parsed::Node(root)], options)?;
    report.file = Some(path.to_path_buf());
    Ok(report)
}

/// Parse a file into its typed document.
pub fn load_file(registry: &Registry, path: &Path) -> Result<KicadDocument> {
    document::parse_file(registry, path)
}

/// Recursively discover KiCad S-expression files in a directory.
pub fn discover_kicad_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(dir, &mut files, 0)?;
    files.sort();
    tracing::info!("Found {} KiCad files under {}", files.len(), dir.display());
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>, depth: usize) -> Result<()> {
    if depth > 20 {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with('.') || name == "node_modules" || name == "target" || name == "build" {
                continue;
            }
            walk_dir(&path, files, depth + 1)?;
        } else if path.is_file() && document::kind_for_path(&path).is_ok() {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_reports_equivalence() {
        let registry = Registry::kicad();
        let text = "(kicad_sch (version 20231120) (generator eeschema) (paper \"A4\"))";
        let report = check_round_trip(&registry, text, &RoundTripOptions::default()).unwrap();
        assert!(report.equivalent, "{:?}", report.divergence);
        assert_eq!(report.root, "kicad_sch");
    }

    #[test]
    fn test_round_trip_propagates_lex_errors() {
        let registry = Registry::kicad();
        let result = check_round_trip(&registry, "(kicad_sch \"open", &RoundTripOptions::default());
        assert!(matches!(result, Err(KicadSexpError::Lex { .. })));
    }

    #[test]
    fn test_check_file_reports_root_and_path() {
        let registry = Registry::kicad();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.kicad_mod");
        std::fs::write(&path, "(module R (layer F.Cu) (future 1) (at 1 2))").unwrap();

        let report = check_file(&registry, &path, &RoundTripOptions::default()).unwrap();
        assert!(report.equivalent, "{:?}", report.divergence);
        assert_eq!(report.root, "module");
        assert_eq!(report.file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_check_file_rejects_wrong_root() {
        let registry = Registry::kicad();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.kicad_sch");
        std::fs::write(&path, "(kicad_pcb (version 1))").unwrap();

        let result = check_file(&registry, &path, &RoundTripOptions::default());
        assert!(matches!(
            result,
            Err(KicadSexpError::RootTypeMismatch { ref found, .. }) if found == "kicad_pcb"
        ));

        std::fs::write(&path, "(kicad_sch) (kicad_sch)").unwrap();
        let result = check_file(&registry, &path, &RoundTripOptions::default());
        assert!(matches!(result, Err(KicadSexpError::RootTypeMismatch { .. })));
    }

    #[test]
    fn test_unregistered_error_names_parent() {
        let err = KicadSexpError::UnregisteredToken {
            token: "foo".to_string(),
            parent: Some("bar".to_string()),
        };
        assert_eq!(err.to_string(), "No node type registered for token 'foo' under 'bar'");
        assert!(err.is_demotable());
    }

    #[test]
    fn test_discover_skips_hidden_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.kicad_sch"), "(kicad_sch)").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git").join("b.kicad_pcb"), "(kicad_pcb)").unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib").join("r.kicad_mod"), "(footprint r)").unwrap();

        let files = discover_kicad_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }
}
