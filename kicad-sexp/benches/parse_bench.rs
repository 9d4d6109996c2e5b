use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kicad_sexp::prelude::*;
use kicad_sexp::{check_round_trip, parse_forms, RoundTripOptions};
use std::path::PathBuf;

fn fixture_text(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("fixture")
}

fn bench_parse_primitive(c: &mut Criterion) {
    let text = fixture_text("sensor_board.kicad_pcb");

    c.bench_function("parse_primitive_pcb", |b| {
        b.iter(|| parse_forms(black_box(&text)));
    });
}

fn bench_parse_typed(c: &mut Criterion) {
    let registry = Registry::kicad();
    let text = fixture_text("sensor_board.kicad_pcb");

    c.bench_function("parse_typed_pcb", |b| {
        b.iter(|| kicad_sexp::parse_kicad_pcb(&registry, black_box(&text)));
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let registry = Registry::kicad();
    let options = RoundTripOptions::default();
    let text = fixture_text("sensor_board.kicad_sch");

    c.bench_function("round_trip_schematic", |b| {
        b.iter(|| check_round_trip(&registry, black_box(&text), black_box(&options)));
    });
}

criterion_group!(benches, bench_parse_primitive, bench_parse_typed, bench_round_trip);
criterion_main!(benches);
