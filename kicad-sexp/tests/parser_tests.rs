//! Tests for typed parsing of KiCad fixture files

use kicad_sexp::{
    parse_file, parse_kicad_mod, parse_kicad_pcb, parse_kicad_sch, DocumentKind, Footprint,
    KicadDocument, KicadSexpError, Registry, SyntaxErrorKind, Verbatim,
};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_text(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).expect("Fixture should exist")
}

#[test]
fn test_parse_schematic_header() {
    let registry = Registry::kicad();
    let sch = parse_kicad_sch(&registry, &fixture_text("sensor_board.kicad_sch")).expect("Should parse");

    assert_eq!(sch.version(), Some(20231120.0));
    assert_eq!(sch.generator(), Some("eeschema"));
    assert_eq!(sch.generator_version(), Some("8.0"));
    assert_eq!(sch.uuid(), Some("7b4a1c2e-5f3d-4e8a-9b6c-1d2e3f4a5b6c"));

    // paper, title_block and lib_symbols are known but unmodeled
    let verbatim: Vec<&str> = sch
        .children_of::<Verbatim>()
        .map(|v| kicad_sexp::Node::token(v))
        .collect();
    assert_eq!(verbatim, ["paper", "title_block", "lib_symbols"]);
}

#[test]
fn test_schematic_keeps_unmodeled_items() {
    let registry = Registry::kicad();
    let sch = parse_kicad_sch(&registry, &fixture_text("sensor_board.kicad_sch")).expect("Should parse");

    let tags: Vec<&str> = sch.extensions().iter().filter_map(|e| e.tag()).collect();
    assert_eq!(tags, ["junction", "wire", "label", "text", "symbol", "sheet_instances"]);
}

#[test]
fn test_parse_board_footprints() {
    let registry = Registry::kicad();
    let pcb = parse_kicad_pcb(&registry, &fixture_text("sensor_board.kicad_pcb")).expect("Should parse");

    let footprints: Vec<&Footprint> = pcb.children_of::<Footprint>().collect();
    assert_eq!(footprints.len(), 1);

    let r1 = footprints[0];
    assert_eq!(r1.name(), "Resistor_SMD:R_0603_1608Metric");
    assert_eq!(r1.reference(), Some("R1"));
    assert_eq!(r1.property("Value").map(|p| p.value()), Some("4.7k"));
    assert_eq!(r1.layer().name(), "F.Cu");
    assert!(!r1.is_locked());

    let at = r1.at().expect("Footprint should be placed");
    assert_eq!((at.x(), at.y(), at.angle()), (120.0, 80.0, Some(90.0)));
}

#[test]
fn test_board_layer_table_is_kept_verbatim() {
    let registry = Registry::kicad();
    let pcb = parse_kicad_pcb(&registry, &fixture_text("sensor_board.kicad_pcb")).expect("Should parse");

    // The board-level layer table has list children, which `layers` does not model
    assert!(pcb.extensions().iter().any(|e| e.tag() == Some("layers")));
    assert_eq!(pcb.children_of::<Verbatim>().count(), 6);
}

#[test]
fn test_parse_footprint_library_file() {
    let registry = Registry::kicad();
    let fp = parse_kicad_mod(&registry, &fixture_text("R_0603_1608Metric.kicad_mod")).expect("Should parse");

    assert_eq!(fp.name(), "R_0603_1608Metric");
    assert_eq!(fp.reference(), Some("REF**"));
    assert!(fp.description().is_some_and(|d| d.starts_with("Resistor SMD 0603")));

    let datasheet = fp.property("Datasheet").expect("Should have a datasheet property");
    assert_eq!(datasheet.value(), "");
    assert!(datasheet.is_hidden());
    assert_eq!(datasheet.extensions().len(), 1);

    let font = fp
        .property("Reference")
        .and_then(|p| p.effects())
        .and_then(|e| e.font())
        .expect("Reference should have a font");
    assert_eq!(font.size().map(|s| (s.height(), s.width())), Some((1.0, 1.0)));
    assert_eq!(font.thickness(), Some(0.15));
}

#[test]
fn test_parse_file_dispatches_on_extension() {
    let registry = Registry::kicad();

    let sym = parse_file(&registry, &fixture_path("passives.kicad_sym")).expect("Should parse");
    assert_eq!(sym.kind(), DocumentKind::SymbolLib);
    match sym {
        KicadDocument::SymbolLib(lib) => assert_eq!(lib.generator(), Some("kicad_symbol_editor")),
        other => panic!("Expected a symbol library, got {:?}", other.kind()),
    }

    let fp = parse_file(&registry, &fixture_path("R_0603_1608Metric.kicad_mod")).expect("Should parse");
    assert!(matches!(fp, KicadDocument::Footprint(_)));
}

#[test]
fn test_malformed_file_reports_position() {
    let registry = Registry::kicad();
    let err = parse_file(&registry, &fixture_path("malformed.kicad_sch")).unwrap_err();
    match err {
        KicadSexpError::Syntax { line, kind, .. } => {
            assert_eq!(kind, SyntaxErrorKind::UnmatchedOpen);
            assert!(line >= 1);
        }
        other => panic!("Expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_board_is_not_a_schematic() {
    let registry = Registry::kicad();
    let err = parse_kicad_sch(&registry, &fixture_text("sensor_board.kicad_pcb")).unwrap_err();
    assert!(matches!(
        err,
        KicadSexpError::RootTypeMismatch { ref expected, ref found }
            if expected == "kicad_sch" && found == "kicad_pcb"
    ));
}

#[test]
fn test_parse_nonexistent_file() {
    let registry = Registry::kicad();
    let result = parse_file(&registry, &PathBuf::from("not_a_real_file.kicad_sch"));
    assert!(matches!(result, Err(KicadSexpError::Io(_))), "Should fail on nonexistent file");
}
