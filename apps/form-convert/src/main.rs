//! form-convert
//!
//! Command-line front end for the conversion pipeline. Results go to stdout
//! as JSON (or a harness report); logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use converter_harness::{ConverterHarness, HarnessConfig, OutputFormat, Reporter};
use form_converters::{
    BatchOptions, BatchProcessor, ConversionOptions, ConverterConfig, ConverterFactory,
    WatermarkGate,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "form-convert")]
#[command(version, about = "Turn PDF, Word and Excel documents into form templates")]
struct Cli {
    /// TOML converter settings; the environment is read when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one document and print the result as JSON
    Convert {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
        #[arg(long)]
        no_watermark_check: bool,
        /// Skip the OCR pass and rely on the PDF text layer
        #[arg(long)]
        no_ocr: bool,
    },
    /// Scan one document for watermarks
    Watermark { file: PathBuf },
    /// Run every applicable converter and recommend one
    Compare {
        file: PathBuf,
        /// console, json, json-pretty or markdown
        #[arg(long, default_value = "console")]
        format: String,
        #[arg(long)]
        iterations: Option<u32>,
        /// TOML harness settings
        #[arg(long)]
        harness_config: Option<PathBuf>,
        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert every matching file in a directory
    Batch {
        dir: PathBuf,
        #[arg(long)]
        recursive: bool,
        #[arg(long)]
        skip_watermarked: bool,
        /// Extensions to include
        #[arg(long, value_delimiter = ',', default_value = "pdf,docx,xlsx")]
        types: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let gate = WatermarkGate::new(config.watermark_detector()?, config.watermark_policy);
    info!(version = env!("CARGO_PKG_VERSION"), policy = ?gate.policy(), "form-convert starting");

    let ok = match cli.command {
        Command::Convert {
            file,
            pretty,
            no_watermark_check,
            no_ocr,
        } => {
            let factory = ConverterFactory::with_defaults(&config, Some(gate))?;
            let options = ConversionOptions {
                watermark_check: !no_watermark_check,
                ocr_enabled: !no_ocr,
            };
            let result = factory.convert(&file, &options).await;
            factory.cleanup().await;
            print_json(&result, pretty)?;
            result.success
        }
        Command::Watermark { file } => {
            let verdict = gate.verdict(&file).await;
            print_json(&verdict, true)?;
            true
        }
        Command::Compare {
            file,
            format,
            iterations,
            harness_config,
            output,
        } => {
            let format: OutputFormat = format.parse()?;
            let mut harness_config = match harness_config {
                Some(path) => HarnessConfig::from_file(path)?,
                None => HarnessConfig::default(),
            };
            if let Some(iterations) = iterations {
                harness_config = harness_config.with_iterations(iterations);
                harness_config.validate()?;
            }

            let factory = ConverterFactory::with_defaults(&config, Some(gate))?;
            let harness = ConverterHarness::new(factory, harness_config);
            let report = harness.compare(&file).await;
            harness.factory().cleanup().await;

            let reporter = Reporter::new(format);
            match output {
                Some(path) => reporter
                    .write_to_file(&report, &path)
                    .with_context(|| format!("Failed to write report: {}", path.display()))?,
                None => reporter.report(&report)?,
            }
            !report.all_failed()
        }
        Command::Batch {
            dir,
            recursive,
            skip_watermarked,
            types,
        } => {
            let factory = ConverterFactory::with_defaults(&config, Some(gate.clone()))?;
            let processor = BatchProcessor::new(factory.clone(), gate);
            let options = BatchOptions {
                recursive,
                file_types: types.iter().map(|t| t.trim().trim_start_matches('.').to_ascii_lowercase()).collect(),
                skip_watermarked,
            };
            let report = processor
                .process_directory(&dir, &options)
                .await
                .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
            factory.cleanup().await;
            print_json(&report, true)?;
            !report.has_failures()
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_config(path: Option<&Path>) -> Result<ConverterConfig> {
    match path {
        Some(path) => ConverterConfig::from_file(path),
        None => Ok(ConverterConfig::from_env()?),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
