//! Extract invoice line items and export a ship ticket
//!
//! Reads positioned-text dumps (one JSON file per document: a list of pages,
//! each a list of `{content, x, y, width, height}` fragments), extracts line
//! items from each and optionally fills a ship-ticket template with all of
//! them.
//!
//! Usage:
//!   cargo run --release --bin ship_ticket -- invoice1.json invoice2.json
//!   cargo run --release --bin ship_ticket -- invoice.json --template template.xlsx --output ticket.xlsx
//!   cargo run --release --bin ship_ticket -- invoice.json --config settings.json --json

use ship_ticket::batch::{DocumentQueue, JsonDocument};
use ship_ticket::{AppConfig, InvoiceExtractor, RowRecord};
use std::fs;
use std::path::PathBuf;
use std::process;

struct CliConfig {
    inputs: Vec<PathBuf>,
    template: Option<PathBuf>,
    output: PathBuf,
    config: Option<PathBuf>,
    json: bool,
    verbose: bool,
}

impl CliConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = Self {
            inputs: Vec::new(),
            template: None,
            output: PathBuf::from("ship-ticket.xlsx"),
            config: None,
            json: false,
            verbose: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--template" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        cli.template = Some(PathBuf::from(&args[i]));
                    }
                },
                "--output" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        cli.output = PathBuf::from(&args[i]);
                    }
                },
                "--config" | "-c" => {
                    i += 1;
                    if i < args.len() {
                        cli.config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--json" => {
                    cli.json = true;
                },
                "--verbose" | "-v" => {
                    cli.verbose = true;
                },
                "--help" | "-h" => {
                    print_usage();
                    process::exit(0);
                },
                other if other.starts_with('-') => {
                    eprintln!("Unknown option: {}", other);
                    print_usage();
                    process::exit(2);
                },
                input => cli.inputs.push(PathBuf::from(input)),
            }
            i += 1;
        }

        cli
    }
}

fn print_usage() {
    eprintln!(
        "Usage: ship_ticket <fragments.json>... [--template FILE] [--output FILE] [--config FILE] [--json] [--verbose]"
    );
}

fn load_config(cli: &CliConfig) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => Ok(AppConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AppConfig::default()),
    }
}

fn main() {
    let cli = CliConfig::from_args();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if cli.inputs.is_empty() {
        print_usage();
        process::exit(2);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        },
    };

    let mut queue = DocumentQueue::new(InvoiceExtractor::new(config.extraction.clone()));
    for input in &cli.inputs {
        queue.push(JsonDocument::new(input));
    }
    queue.process_all();

    let mut failures = 0;
    for result in queue.results() {
        match (&result.extraction, &result.error) {
            (Some(extraction), _) => {
                let path = match &extraction.outcome {
                    ship_ticket::ExtractionOutcome::Positional(_) => "positional",
                    ship_ticket::ExtractionOutcome::Lexical(_) => "lexical",
                    ship_ticket::ExtractionOutcome::RawText(_) => "raw text",
                };
                eprintln!(
                    "✓ {}: {} line items ({})",
                    result.source_id,
                    extraction.products().len(),
                    path
                );
                if let Some(no) = &extraction.metadata.estimate_no {
                    eprintln!("    Estimate no: {}", no);
                }
                if let Some(date) = &extraction.metadata.estimate_date {
                    eprintln!("    Estimate date: {}", date);
                }
            },
            (None, error) => {
                failures += 1;
                eprintln!(
                    "✗ {}: {}",
                    result.source_id,
                    error.as_deref().unwrap_or("unknown error")
                );
            },
        }
    }

    let items = queue.line_items();

    if cli.json {
        match serde_json::to_string_pretty(&items) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing line items: {}", e);
                process::exit(1);
            },
        }
    }

    if let Some(template_path) = &cli.template {
        let records: Vec<RowRecord> = items.into_iter().map(|item| item.record).collect();
        let template = match fs::read(template_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("Error reading {}: {}", template_path.display(), e);
                process::exit(1);
            },
        };

        match ship_ticket::export_selected_with_report(&template, &config.layout, &records) {
            Ok((bytes, report)) => {
                if let Err(e) = fs::write(&cli.output, bytes) {
                    eprintln!("Error writing {}: {}", cli.output.display(), e);
                    process::exit(1);
                }
                eprintln!(
                    "Exported {} rows to {} ({} rows inserted, signature at row {})",
                    report.rows_written,
                    cli.output.display(),
                    report.rows_inserted,
                    report.signature_row
                );
            },
            Err(e) => {
                eprintln!("Export failed: {}", e);
                process::exit(1);
            },
        }
    }

    if failures > 0 {
        process::exit(1);
    }
}
