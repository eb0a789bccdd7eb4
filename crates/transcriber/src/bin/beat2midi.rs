use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crescent_domain::tempo::{DEFAULT_BPM, MAX_REQUEST_BPM, MIN_REQUEST_BPM};
use crescent_domain::ExportFormat;
use crescent_transcriber::{TranscriptionJob, TranscriptionPipeline};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Midi,
    Json,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Midi => ExportFormat::Midi,
            OutputFormat::Json => ExportFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert the rhythm of an audio file into a MIDI drum track", long_about = None)]
struct Cli {
    /// Audio file to analyze
    input: PathBuf,
    /// Output path (defaults to the input path with a .mid or .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Tempo the exported track plays back at
    #[arg(long, default_value_t = DEFAULT_BPM, value_parser = clap::value_parser!(u16).range(MIN_REQUEST_BPM as i64..=MAX_REQUEST_BPM as i64))]
    bpm: u16,
    /// Peak-normalize the input file in place first (wav only)
    #[arg(long)]
    normalize: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Midi)]
    format: OutputFormat,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let output = cli.output.clone().unwrap_or_else(|| {
        cli.input.with_extension(match cli.format {
            OutputFormat::Midi => "mid",
            OutputFormat::Json => "json",
        })
    });
    let job = TranscriptionJob::new(&cli.input, output)
        .with_target_bpm(cli.bpm)
        .with_normalize(cli.normalize)
        .with_format(cli.format.into());

    let report = TranscriptionPipeline::default()
        .transcribe(&job)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
