//! Terminal front end for the extraction backend.

use clap::{Parser, Subcommand, ValueEnum};
use invoice_extractor_lib::config::AppConfig;
use invoice_extractor_lib::desk::{Desk, DocumentView, Fenced};
use invoice_extractor_lib::error::DeskError;
use invoice_extractor_lib::export;
use invoice_extractor_lib::listing::{BatchView, HistoryRow, EMPTY_HISTORY};
use invoice_extractor_lib::render::{render, DisplayRow, ViewModel, NO_ITEMS};
use invoice_extractor_lib::types::ExportFormat;
use invoice_extractor_lib::validation::ValidationPanel;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "extract_cli", version, about = "Upload, review and export receipts and invoices")]
struct Cli {
    /// Backend base URL (overrides EXTRACTOR_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Json => ExportFormat::Json,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Upload one PDF/PNG/JPG and show the extracted fields
    Upload { file: PathBuf },
    /// Show a previously processed document
    Open { id: i64 },
    /// Upload up to 20 files as one batch
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show the per-file outcome of a batch
    BatchResults { batch_id: String },
    /// List processed documents
    History,
    /// Show the validation report of a document
    Validation { id: i64 },
    /// Acknowledge every pending warning of a document
    AckWarnings { id: i64 },
    /// Download a document export
    Export {
        id: i64,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download a batch export
    ExportBatch {
        batch_id: String,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Save a document's fields to a local .xlsx workbook
    ExportXlsx {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Send corrected field values
    Correct {
        id: i64,
        /// field=value, repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Render a saved JSON export without contacting the backend
    Show { file: PathBuf },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected field=value, got {}", raw))
}

fn print_view_model(view: &ViewModel) {
    println!("[{}]", view.badge.label);
    for row in &view.rows {
        match row {
            DisplayRow::Field {
                label,
                value,
                confidence,
                ..
            } => match confidence {
                Some(c) => println!("{:<20} {} ({}, {})", label, value, c.percent, c.color),
                None => println!("{:<20} {}", label, value),
            },
            DisplayRow::Items { label, table } => {
                println!("{}", label);
                match table {
                    Some(t) => {
                        println!("  {}", t.columns.join(" | "));
                        for cells in &t.rows {
                            println!("  {}", cells.join(" | "));
                        }
                    }
                    None => println!("  {}", NO_ITEMS),
                }
            }
        }
    }
}

fn print_panel(panel: &ValidationPanel) {
    if panel.is_visible() {
        println!(
            "Validation ({}): {}",
            panel.state.css_class().unwrap_or(""),
            panel.summary_text
        );
    }
}

fn print_document(doc: &DocumentView) {
    println!("Document #{}", doc.id);
    print_view_model(&doc.view);
    if let Some(category) = &doc.category {
        println!("{:<20} {}", "Category", category);
    }
    print_panel(&doc.validation);
}

fn print_batch(batch: &BatchView) {
    println!("Batch {}", batch.batch_id);
    println!(
        "Files: {}  Processed: {}  Failed: {}",
        batch.total_files, batch.processed_files, batch.failed_files
    );
    for entry in &batch.entries {
        println!("{} [{}]", entry.filename, entry.status);
        for h in &entry.highlights {
            println!("  {}: {}", h.label, h.value);
        }
    }
}

fn print_history(rows: &[HistoryRow]) {
    if rows.is_empty() {
        println!("{}", EMPTY_HISTORY);
        return;
    }
    for row in rows {
        println!(
            "{} [{}] [{}]  {}  {}",
            row.heading, row.type_tag, row.status, row.filename, row.uploaded_at
        );
    }
}

fn applied<T>(fenced: Fenced<T>) -> Result<T, DeskError> {
    fenced.into_result()
}

fn open(desk: &Desk, id: i64) -> Result<DocumentView, DeskError> {
    applied(desk.open_document(id)?)
}

fn execute(cli: Cli) -> Result<ExitCode, DeskError> {
    if let Command::Show { file } = &cli.command {
        let doc = export::load_document_export(file)?;
        print_view_model(&render(&doc));
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = AppConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    let desk = Desk::from_config(&config)?;

    match cli.command {
        Command::Upload { file } => print_document(&applied(desk.upload_file(&file)?)?),
        Command::Open { id } => print_document(&open(&desk, id)?),
        Command::Batch { files } => print_batch(&applied(desk.upload_batch(&files)?)?),
        Command::BatchResults { batch_id } => print_batch(&applied(desk.load_batch(&batch_id)?)?),
        Command::History => print_history(&applied(desk.history()?)?),
        Command::Validation { id } => {
            let doc = open(&desk, id)?;
            for line in doc.validation.report_lines() {
                println!("{}", line);
            }
        }
        Command::AckWarnings { id } => {
            open(&desk, id)?;
            let report = desk.acknowledge_all_warnings()?;
            println!("{}", report.message());
            if !report.is_complete() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Export { id, format, out } => {
            open(&desk, id)?;
            let path = desk.export_document(format.into(), out.as_deref())?;
            println!("Saved {}", path.display());
        }
        Command::ExportBatch {
            batch_id,
            format,
            out,
        } => {
            applied(desk.load_batch(&batch_id)?)?;
            let path = desk.export_batch(format.into(), out.as_deref())?;
            println!("Saved {}", path.display());
        }
        Command::ExportXlsx { id, out } => {
            open(&desk, id)?;
            let path = desk.export_workbook(out.as_deref())?;
            println!("Saved {}", path.display());
        }
        Command::Correct { id, set, category } => {
            open(&desk, id)?;
            for (field, value) in set {
                desk.edit_field(&field, Value::String(value))?;
            }
            if category.is_some() {
                desk.set_category(category)?;
            }
            desk.save_corrections()?;
            println!("Corrections saved successfully!");
        }
        Command::Show { .. } => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    invoice_extractor_lib::init_logging();
    match execute(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
