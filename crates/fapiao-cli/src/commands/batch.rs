//! Batch processing command for multiple invoice files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use fapiao_core::pdf::PdfExtractor;
use fapiao_core::{process_documents_with, InvoiceRecord, SourceDocument};

use super::config::load_config;
use super::process::{
    build_pipeline, csv_row, format_csv, format_text, source_name, today, OutputFormat,
    CSV_HEADER,
};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory (default: records are printed to stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Keeper name recorded on every record
    #[arg(long)]
    keeper: Option<String>,

    /// Signer name recorded on every record
    #[arg(long)]
    signer: Option<String>,

    /// Issue counter ids instead of random UUIDs
    #[arg(long)]
    deterministic_ids: bool,

    /// Date used when an invoice shows none (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    record: Option<InvoiceRecord>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("pdf")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    // One slot per matched file, in glob order. Files that cannot be read
    // never reach the pipeline.
    let mut results: Vec<ProcessResult> = Vec::with_capacity(files.len());
    let mut documents = Vec::with_capacity(files.len());
    let mut slots = Vec::with_capacity(files.len());
    for path in files {
        match fs::read(&path) {
            Ok(data) => {
                documents.push(SourceDocument::new(source_name(&path), data));
                slots.push(results.len());
                results.push(ProcessResult {
                    path,
                    record: None,
                    error: None,
                });
            }
            Err(e) => {
                if !args.continue_on_error {
                    anyhow::bail!("Failed to read {}: {}", path.display(), e);
                }
                warn!("Failed to read {}: {}", path.display(), e);
                results.push(ProcessResult {
                    path,
                    record: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let pipeline = Arc::new(build_pipeline(config.clone(), args.deterministic_ids));
    let pdf_config = config.pdf.clone();
    let outcomes = process_documents_with(
        pipeline,
        documents,
        args.date.unwrap_or_else(today),
        move || PdfExtractor::with_config(pdf_config.clone()),
        |outcome| {
            if let Err(e) = &outcome.result {
                pb.println(format!("{} {}", style("✗").red(), e));
            }
            pb.inc(1);
        },
    )
    .await;

    pb.finish_and_clear();

    for (slot, outcome) in slots.into_iter().zip(outcomes) {
        let result = &mut results[slot];
        match outcome.result {
            Ok(mut record) => {
                if let Some(keeper) = &args.keeper {
                    record.keeper = keeper.clone();
                }
                if let Some(signer) = &args.signer {
                    record.signer = signer.clone();
                }
                result.record = Some(record);
            }
            Err(e) => result.error = Some(e.to_string()),
        }
    }

    if !args.continue_on_error {
        if let Some(failed) = results.iter().find(|r| r.error.is_some()) {
            anyhow::bail!(
                "Processing failed: {}",
                failed.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let successful: Vec<_> = results.iter().filter_map(|r| r.record.as_ref()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    match &args.output_dir {
        Some(output_dir) => {
            for result in &results {
                if let Some(record) = &result.record {
                    let output_name = result
                        .path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("invoice");
                    let output_path =
                        output_dir.join(format!("{}.{}", output_name, args.format.extension()));

                    let content = match args.format {
                        OutputFormat::Json => serde_json::to_string_pretty(record)?,
                        OutputFormat::Csv => format_csv(std::slice::from_ref(record))?,
                        OutputFormat::Text => format_text(record, &config),
                    };

                    fs::write(&output_path, content)?;
                    debug!("Wrote output to {}", output_path.display());
                }
            }
        }
        None => {
            let records: Vec<InvoiceRecord> = successful.iter().map(|r| (*r).clone()).collect();
            let content = match args.format {
                OutputFormat::Json => serde_json::to_string_pretty(&records)?,
                OutputFormat::Csv => format_csv(&records)?,
                OutputFormat::Text => records
                    .iter()
                    .map(|r| format_text(r, &config))
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            println!("{}", content);
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed, {} need review",
        style(successful.len()).green(),
        style(failed.len()).red(),
        style(successful.iter().filter(|r| r.is_degraded()).count()).yellow()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["filename", "status"];
    header.extend(CSV_HEADER);
    header.push("error");
    wtr.write_record(&header)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let mut row = vec![filename];
        match &result.record {
            Some(record) => {
                let status = if record.is_degraded() { "review" } else { "success" };
                row.push(status.to_string());
                row.extend(csv_row(record));
                row.push(String::new());
            }
            None => {
                row.push("failed".to_string());
                row.extend(CSV_HEADER.iter().map(|_| String::new()));
                row.push(result.error.clone().unwrap_or_default());
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
