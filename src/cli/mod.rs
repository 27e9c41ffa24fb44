//! CLI commands implementation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use docmeta::config::ExtractionConfig;
use docmeta::extraction::{
    check_tools, supported_file_types, DocumentExtractor, ExtractionProgress, ExtractionResult,
};

#[derive(Parser)]
#[command(name = "docmeta")]
#[command(about = "Document metadata extraction for primary-source archives")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metadata from one or more document files
    Extract {
        /// Files to process (PDF, image, or text)
        files: Vec<PathBuf>,
        /// Output results as JSON
        #[arg(short, long)]
        json: bool,
        /// Hide the per-file progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check if required extraction tools are installed
    Tools,

    /// List supported file types
    Types,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => ExtractionConfig::load(&path)?,
        None => ExtractionConfig::default(),
    };

    match cli.command {
        Commands::Extract {
            files,
            json,
            no_progress,
        } => cmd_extract(config, &files, json, no_progress).await,
        Commands::Tools => cmd_tools(),
        Commands::Types => cmd_types(),
    }
}

async fn cmd_extract(
    config: ExtractionConfig,
    files: &[PathBuf],
    json: bool,
    no_progress: bool,
) -> anyhow::Result<()> {
    if files.is_empty() {
        println!("{} No files specified", style("✗").red());
        return Ok(());
    }

    let extractor = DocumentExtractor::new(config);

    if files.len() == 1 {
        let file = &files[0];
        let pb = if no_progress || json {
            None
        } else {
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:30.cyan/blue}] {percent}% {msg}")?
                    .progress_chars("=>-"),
            );
            Some(pb)
        };

        let result = match pb.clone() {
            Some(bar) => {
                let callback = move |p: ExtractionProgress| {
                    bar.set_position(p.progress as u64);
                    bar.set_message(p.message);
                };
                extractor.extract(file, Some(&callback)).await
            }
            None => extractor.extract(file, None).await,
        };

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(file, &result);
        }
        extractor.ocr_adapter().terminate().await;
        return Ok(());
    }

    // Batch mode
    let pb = if no_progress || json {
        None
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    };

    let results = match pb.clone() {
        Some(bar) => {
            let callback = move |done: usize, _total: usize, result: &ExtractionResult| {
                bar.set_position(done as u64);
                let mark = if result.success { "✓" } else { "✗" };
                bar.set_message(format!("{} {}", mark, result.extraction_method.as_str()));
            };
            extractor.extract_batch(files, Some(&callback)).await
        }
        None => extractor.extract_batch(files, None).await,
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (file, result) in files.iter().zip(results.iter()) {
            print_result(file, result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        println!(
            "\n{} Processed {} files ({} succeeded, {} failed)",
            style("✓").green(),
            results.len(),
            succeeded,
            results.len() - succeeded
        );
    }

    Ok(())
}

fn print_result(file: &std::path::Path, result: &ExtractionResult) {
    let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);

    println!(
        "\n{} ({})",
        style(file.display()).bold(),
        format_size(size)
    );
    println!("{}", "-".repeat(60));

    if !result.success {
        println!("{} Extraction failed", style("✗").red());
        for warning in &result.warnings {
            println!("  {} {}", style("!").yellow(), warning);
        }
        return;
    }

    println!(
        "{:<18} {}",
        "Method:",
        result.extraction_method.as_str()
    );
    println!(
        "{:<18} {} {}",
        "Overall:",
        result.overall_confidence,
        confidence_badge(result.overall_confidence)
    );

    print_field("Title:", &result.metadata.title.value, result.metadata.title.confidence);
    print_field("Date:", &result.metadata.date.value, result.metadata.date.confidence);
    print_field(
        "Agency:",
        &result.metadata.agency.value.map(|a| a.display_name().to_string()),
        result.metadata.agency.confidence,
    );
    print_field(
        "Document #:",
        &result.metadata.document_number.value,
        result.metadata.document_number.confidence,
    );

    println!(
        "{:<18} {}ms",
        "Processing time:", result.processing_time_ms
    );

    for warning in &result.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }
}

fn print_field<T: std::fmt::Display>(label: &str, value: &Option<T>, confidence: u8) {
    match value {
        Some(v) => println!(
            "{:<18} {} {}",
            label,
            v,
            confidence_badge(confidence)
        ),
        None => println!("{:<18} {}", label, style("(not found)").dim()),
    }
}

/// Render an input file size for display next to its extraction result.
///
/// Uploads in this domain are scanned PDFs and page images, so anything
/// from a few KiB to tens of MiB; GiB inputs are out of scope and just
/// render as a large MiB figure.
fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.0} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn confidence_badge(confidence: u8) -> String {
    if confidence >= 80 {
        style(format!("[{}% high]", confidence)).green().to_string()
    } else if confidence >= 50 {
        style(format!("[{}% medium]", confidence))
            .yellow()
            .to_string()
    } else {
        style(format!("[{}% low]", confidence)).red().to_string()
    }
}

fn cmd_tools() -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Tool Status").bold());
    println!("{}", "-".repeat(50));

    let tools = check_tools();
    let mut all_found = true;

    for (tool, available) in &tools {
        let status = if *available {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!();

    if all_found {
        println!("{} All extraction tools are available", style("✓").green());
    } else {
        println!(
            "{} Some tools are missing. Install them for full support:",
            style("!").yellow()
        );
        println!("  - pdftotext, pdftoppm, pdfinfo: poppler-utils package");
        println!("  - tesseract: tesseract-ocr package");
    }

    Ok(())
}

fn cmd_types() -> anyhow::Result<()> {
    println!("\n{}", style("Supported File Types").bold());
    println!("{}", "-".repeat(30));
    for ext in supported_file_types() {
        println!("  {}", ext);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_typical_uploads() {
        // A one-page text memo, a page scan, and a multi-page scanned PDF.
        assert_eq!(format_size(800), "800 B");
        assert_eq!(format_size(412 * 1024), "412 KiB");
        assert_eq!(format_size(23 * 1024 * 1024 + 512 * 1024), "23.5 MiB");
    }

    #[test]
    fn test_format_size_boundaries() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KiB");
    }
}
