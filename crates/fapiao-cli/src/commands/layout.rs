//! Layout command - show the reconstructed text of a page.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;

use fapiao_core::pdf::{PdfExtractor, PdfProcessor, PreparedRuns};
use fapiao_core::{DocumentPipeline, InvoiceExtractor, InvoiceFieldExtractor};

use super::config::load_config;

/// Arguments for the layout command.
#[derive(Args)]
pub struct LayoutArgs {
    /// Input PDF
    #[arg(required_unless_present = "runs", conflicts_with = "runs")]
    input: Option<PathBuf>,

    /// Read text runs from a JSON file instead of a PDF
    #[arg(long, value_name = "RUNS.json")]
    runs: Option<PathBuf>,

    /// Print the runs in reading order as JSON
    #[arg(long)]
    show_runs: bool,

    /// Write the page's runs, as read, to a JSON file
    #[arg(long, value_name = "FILE")]
    dump_runs: Option<PathBuf>,

    /// Also print the fields the extractor finds
    #[arg(long)]
    fields: bool,
}

pub async fn run(args: LayoutArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let (path, mut processor): (PathBuf, Box<dyn PdfProcessor>) = match (&args.input, &args.runs) {
        (_, Some(runs)) => (runs.clone(), Box::new(PreparedRuns::new())),
        (Some(input), None) => (
            input.clone(),
            Box::new(PdfExtractor::with_config(config.pdf.clone())),
        ),
        (None, None) => anyhow::bail!("Either an input PDF or --runs is required"),
    };

    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let data = fs::read(&path)?;
    let pipeline = DocumentPipeline::new(config.clone());
    let runs = pipeline.read_runs(processor.as_mut(), &data)?;

    if let Some(dump_path) = &args.dump_runs {
        fs::write(dump_path, serde_json::to_string_pretty(&runs)?)?;
        eprintln!(
            "{} Wrote {} runs to {}",
            style("✓").green(),
            runs.len(),
            dump_path.display()
        );
    }

    let page = pipeline.layout(&runs);
    println!("{}", page.text);

    if args.show_runs {
        println!();
        println!("{}", serde_json::to_string_pretty(&page.runs)?);
    }

    if args.fields {
        let extractor = InvoiceFieldExtractor::new(config.extraction.clone(), &config.layout);
        let fields = extractor.extract(&page);
        let show = |value: Option<String>| value.unwrap_or_else(|| style("-").dim().to_string());

        println!();
        println!("item_name:    {}", show(fields.item.name));
        println!("model:        {}", show(fields.item.model));
        println!("unit:         {}", show(fields.item.unit));
        println!("quantity:     {}", show(fields.item.quantity.map(|q| q.to_string())));
        println!("unit_price:   {}", show(fields.item.unit_price.map(|p| p.to_string())));
        println!("total_price:  {}", show(fields.total_price.map(|t| t.to_string())));
        println!("invoice_date: {}", show(fields.invoice_date.map(|d| d.to_string())));
    }

    Ok(())
}
