//! kicad-sexp CLI - check, reformat and canonicalize KiCad S-expression files.

use clap::{Parser, Subcommand, ValueEnum};
use kicad_sexp::{
    canonical_forms, check_file, discover_kicad_files, load_file, CanonicalOptions, Registry,
    RoundTripOptions, RoundTripReport,
};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "kicad-sexp")]
#[command(about = "Round-trip checker and formatter for KiCad S-expression files", long_about = None)]
#[command(version)]
struct Cli {
    /// Log parser decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file, render it and check the result is equivalent
    Check {
        /// Path to a .kicad_sch, .kicad_pcb, .kicad_mod or .kicad_sym file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Treat children with this tag as order-sensitive (repeatable)
        #[arg(long = "ordered-tag", value_name = "TAG")]
        ordered_tags: Vec<String>,
    },

    /// Re-render a file with canonical indentation
    Fmt {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Overwrite the file instead of printing to stdout
        #[arg(short, long)]
        write: bool,
    },

    /// Print the canonical primitive tree of a file
    Canon {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "sexp")]
        format: CanonFormat,

        /// Treat children with this tag as order-sensitive (repeatable)
        #[arg(long = "ordered-tag", value_name = "TAG")]
        ordered_tags: Vec<String>,
    },

    /// Check every KiCad file in a directory
    Project {
        /// Path to project directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Treat children with this tag as order-sensitive (repeatable)
        #[arg(long = "ordered-tag", value_name = "TAG")]
        ordered_tags: Vec<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

#[derive(Clone, ValueEnum)]
enum CanonFormat {
    /// One canonical S-expression per line
    Sexp,
    /// The canonical tree as JSON arrays
    Json,
}

/// Outcome of one file in a check or project run.
enum FileOutcome {
    Checked(RoundTripReport),
    Failed { file: PathBuf, error: String },
}

impl FileOutcome {
    fn passed(&self) -> bool {
        matches!(self, FileOutcome::Checked(report) if report.equivalent)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = match Registry::try_kicad() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let exit_code = match cli.command {
        Commands::Check {
            file,
            format,
            ordered_tags,
        } => handle_check(&registry, &file, format, ordered_tags),
        Commands::Fmt { file, write } => handle_fmt(&registry, &file, write),
        Commands::Canon {
            file,
            format,
            ordered_tags,
        } => handle_canon(&file, format, ordered_tags),
        Commands::Project {
            dir,
            format,
            ordered_tags,
        } => handle_project(&registry, &dir, format, ordered_tags),
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn canonical_options(ordered_tags: Vec<String>) -> CanonicalOptions {
    ordered_tags
        .into_iter()
        .fold(CanonicalOptions::default(), |options, tag| options.with_ordered_tag(tag))
}

fn check_one(registry: &Registry, file: &Path, options: &RoundTripOptions) -> FileOutcome {
    match check_file(registry, file, options) {
        Ok(report) => FileOutcome::Checked(report),
        Err(e) => {
            eprintln!("Error: {}: {}", file.display(), e);
            FileOutcome::Failed {
                file: file.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

fn handle_check(
    registry: &Registry,
    file: &Path,
    format: OutputFormat,
    ordered_tags: Vec<String>,
) -> i32 {
    let options = RoundTripOptions {
        canonical: canonical_options(ordered_tags),
    };
    let outcome = check_one(registry, file, &options);
    let code = if outcome.passed() { 0 } else { 1 };
    output_results(&[outcome], &format);
    code
}

fn handle_project(
    registry: &Registry,
    dir: &Path,
    format: OutputFormat,
    ordered_tags: Vec<String>,
) -> i32 {
    let options = RoundTripOptions {
        canonical: canonical_options(ordered_tags),
    };

    let files = match discover_kicad_files(dir) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let outcomes: Vec<FileOutcome> = files.iter().map(|f| check_one(registry, f, &options)).collect();
    output_results(&outcomes, &format);
    if outcomes.iter().all(FileOutcome::passed) {
        0
    } else {
        1
    }
}

fn handle_fmt(registry: &Registry, file: &Path, write: bool) -> i32 {
    let document = match load_file(registry, file) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let text = document.render();
    if !write {
        print!("{}", text);
        return 0;
    }

    match std::fs::write(file, text) {
        Ok(()) => {
            tracing::info!("Rewrote {}", file.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {}: {}", file.display(), e);
            1
        }
    }
}

fn handle_canon(file: &Path, format: CanonFormat, ordered_tags: Vec<String>) -> i32 {
    let options = canonical_options(ordered_tags);
    let forms = match std::fs::read_to_string(file)
        .map_err(kicad_sexp::KicadSexpError::from)
        .and_then(|text| canonical_forms(&text, &options))
    {
        Ok(forms) => forms,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match format {
        CanonFormat::Sexp => {
            for form in &forms {
                println!("{}", form);
            }
            0
        }
        CanonFormat::Json => print_json(&forms),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn output_results(outcomes: &[FileOutcome], format: &OutputFormat) {
    match format {
        OutputFormat::Human => output_human(outcomes),
        OutputFormat::Json => output_json(outcomes),
    }
}

fn output_human(outcomes: &[FileOutcome]) {
    for outcome in outcomes {
        match outcome {
            FileOutcome::Checked(report) => {
                let file = report
                    .file
                    .as_ref()
                    .map(|f| f.display().to_string())
                    .unwrap_or_default();
                println!("\nFile: {}", file);
                println!("{}", "─".repeat(60));
                println!("  Root: {}", report.root);
                match &report.divergence {
                    None => println!("  Round trip: equivalent ({} bytes rendered)", report.rendered_bytes),
                    Some(divergence) => println!("  Round trip: DIVERGED at {}", divergence),
                }
            }
            FileOutcome::Failed { file, error } => {
                println!("\nFile: {}", file.display());
                println!("{}", "─".repeat(60));
                println!("  Error: {}", error);
            }
        }
    }

    let passed = outcomes.iter().filter(|o| o.passed()).count();
    println!("\n  Summary: {}/{} files round-trip", passed, outcomes.len());
}

fn output_json(outcomes: &[FileOutcome]) {
    let output = serde_json::json!({
        "results": outcomes.iter().map(|o| match o {
            FileOutcome::Checked(report) => serde_json::json!(report),
            FileOutcome::Failed { file, error } => serde_json::json!({
                "file": file.display().to_string(),
                "error": error,
            }),
        }).collect::<Vec<_>>(),
        "summary": {
            "total_files": outcomes.len(),
            "passed": outcomes.iter().filter(|o| o.passed()).count(),
        }
    });
    print_json(&output);
}
