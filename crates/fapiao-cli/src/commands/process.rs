//! Process command - extract data from a single invoice file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use fapiao_core::models::config::FapiaoConfig;
use fapiao_core::pdf::{PdfExtractor, PdfProcessor, PreparedRuns};
use fapiao_core::{DocumentPipeline, IdIssuer, InvoiceRecord, RandomIds, SequentialIds};

use super::config::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, or a JSON array of text runs)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Issue counter ids (rec-1, rec-2, ...) instead of random UUIDs
    #[arg(long)]
    deterministic_ids: bool,

    /// Date used when the invoice shows none (default: today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Validate extracted data
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);

    let mut processor: Box<dyn PdfProcessor> = match extension.as_str() {
        "pdf" => Box::new(PdfExtractor::with_config(config.pdf.clone())),
        "json" => Box::new(PreparedRuns::new()),
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    };

    pb.set_message("Reading document...");
    let data = fs::read(&args.input)?;
    let source_name = source_name(&args.input);

    let pipeline = build_pipeline(config, args.deterministic_ids);
    let fallback_date = args.date.unwrap_or_else(today);

    pb.set_message("Extracting invoice data...");
    let record = pipeline.process_with(processor.as_mut(), &source_name, &data, fallback_date)?;

    pb.finish_and_clear();

    if record.is_degraded() {
        let missing: Vec<&str> = record.gaps.iter().map(|f| f.as_str()).collect();
        eprintln!(
            "{} {} needs review, not extracted: {}",
            style("!").yellow(),
            source_name,
            missing.join(", ")
        );
    }

    // Validate if requested
    if args.validate {
        let issues = record.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_record(&record, pipeline.config(), args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn build_pipeline(config: FapiaoConfig, deterministic_ids: bool) -> DocumentPipeline {
    let ids: Arc<dyn IdIssuer> = if deterministic_ids {
        Arc::new(SequentialIds::new("rec"))
    } else {
        Arc::new(RandomIds)
    };
    DocumentPipeline::new(config).with_ids(ids)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

pub fn format_record(
    record: &InvoiceRecord,
    config: &FapiaoConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => format_csv(std::slice::from_ref(record)),
        OutputFormat::Text => Ok(format_text(record, config)),
    }
}

pub const CSV_HEADER: [&str; 13] = [
    "source",
    "id",
    "item_name",
    "model",
    "unit",
    "quantity",
    "unit_price",
    "total_price",
    "invoice_date",
    "batches",
    "keeper",
    "signer",
    "gaps",
];

pub fn csv_row(record: &InvoiceRecord) -> Vec<String> {
    let batches: Vec<String> = record
        .batches
        .iter()
        .map(|b| format!("{}:{}", b.out_date, b.quantity))
        .collect();
    let gaps: Vec<&str> = record.gaps.iter().map(|f| f.as_str()).collect();

    vec![
        record.source_name.clone(),
        record.id.clone(),
        record.item_name.clone(),
        record.model.clone(),
        record.unit.clone(),
        record.quantity.to_string(),
        record.unit_price.to_string(),
        record.total_price.to_string(),
        record.invoice_date.to_string(),
        batches.join(";"),
        record.keeper.clone(),
        record.signer.clone(),
        gaps.join(";"),
    ]
}

pub fn format_csv(records: &[InvoiceRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record(csv_row(record))?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_text(record: &InvoiceRecord, config: &FapiaoConfig) -> String {
    let mut output = String::new();

    output.push_str(&format!("Source:   {}\n", record.source_name));
    output.push_str(&format!(
        "Item:     {}\n",
        record.display_name(&config.extraction)
    ));
    if !record.model.is_empty() {
        output.push_str(&format!("Model:    {}\n", record.model));
    }
    output.push_str(&format!("Unit:     {}\n", record.unit));
    output.push_str(&format!("Quantity: {}\n", record.quantity));
    output.push_str(&format!("Price:    {}\n", record.unit_price));
    output.push_str(&format!("Total:    {}\n", record.total_price));
    output.push_str(&format!("Date:     {}\n", record.invoice_date));

    output.push_str("\nBatches:\n");
    for batch in &record.batches {
        output.push_str(&format!("  {}  {}\n", batch.out_date, batch.quantity));
    }

    if !record.keeper.is_empty() || !record.signer.is_empty() {
        output.push_str(&format!(
            "\nKeeper: {}  Signer: {}\n",
            record.keeper, record.signer
        ));
    }

    if !record.gaps.is_empty() {
        let missing: Vec<&str> = record.gaps.iter().map(|f| f.as_str()).collect();
        output.push_str(&format!("\nNot extracted: {}\n", missing.join(", ")));
    }

    output
}
