use clap::{Parser, Subcommand};
use image_converter::batch::{self, ChannelSink, ConversionSettings};
use image_converter::convert::{ConvertError, Converter};
use image_converter::imaging::{Optimizer, RustBackend};
use image_converter::types::{CompressionLevel, ConversionOutcome, ErrorKind, TargetFormat};
use image_converter::{config, output, scan};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that take images.
#[derive(clap::Args, Clone)]
struct ConvertArgs {
    /// Image files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Target format: jpeg (or jpg), png, webp [default: conversion.target]
    #[arg(long, short = 't', value_parser = parse_target)]
    to: Option<TargetFormat>,

    /// Compression level: none, low, medium, high [default: conversion.compression]
    #[arg(long, short = 'c', value_parser = parse_compression)]
    compression: Option<CompressionLevel>,

    /// Replace the source (same format) or remove it after converting
    #[arg(long)]
    delete_original: bool,

    /// Skip same-format files that would only have their metadata stripped
    #[arg(long)]
    keep_metadata: bool,

    /// Replace output files that already exist
    #[arg(long)]
    overwrite: bool,

    /// Do not run pngquant / cwebp even if installed
    #[arg(long)]
    no_optimizer: bool,

    /// Descend into subdirectories
    #[arg(long, short = 'r')]
    recursive: bool,

    /// Write a JSON report of every outcome to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "image-converter")]
#[command(about = "Convert, compress and strip metadata from JPEG, PNG and WebP images")]
#[command(long_about = "\
Convert, compress and strip metadata from JPEG, PNG and WebP images

Every file is decoded and re-encoded from its pixels only, so EXIF, XMP,
ICC, IPTC and text blocks never reach the output. Originals are kept unless
--delete-original is given, and are never written to in place.

What happens to photo.png:

  --to webp                       photo-converted.webp (photo.png kept)
  --to webp --delete-original     photo.webp (photo.png removed)
  --to png                        photo-clean.png (metadata stripped)
  --to png --delete-original      photo.png cleaned in place
  --to png -c medium              photo-compressed.png

Images with transparency are refused for JPEG. Unsupported files are
reported and skipped; one failing file never stops the batch.

Run 'image-converter gen-config' to generate a documented config file.")]
#[command(version = env!("IMAGE_CONVERTER_VERSION"))]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert, compress or clean images
    Convert(ConvertArgs),
    /// Show what convert would do, without writing anything
    Check(ConvertArgs),
    /// Print a stock config file with all options documented
    GenConfig,
}

/// Shape of the `--report` file.
#[derive(Serialize)]
struct Report<'a> {
    summary: &'a batch::BatchSummary,
    outcomes: &'a [ConversionOutcome],
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Convert(args) => {
            let config = config::load_config_with(&cli.config, Some(overrides(&args)))?;
            let target = resolve_target(&args, &config)?;
            let files = scan::expand_inputs(&args.paths, args.recursive)?;
            if files.is_empty() {
                println!("No images found");
                return Ok(ExitCode::SUCCESS);
            }

            init_thread_pool(&config.processing);
            let settings = ConversionSettings::from_config(&config.conversion, target);
            let backend = RustBackend::new();
            let converter =
                Converter::new(&backend).with_optimizer(Optimizer::detect(&config.optimizer));

            let keep = args.report.is_some();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                let mut kept = Vec::new();
                for outcome in rx {
                    output::print_outcome(&outcome);
                    if keep {
                        kept.push(outcome);
                    }
                }
                kept
            });
            let summary = batch::convert_batch(&converter, &files, &settings, &ChannelSink(tx));
            let outcomes = printer.join().map_err(|_| "output thread panicked")?;
            output::print_summary(&summary);

            if let Some(path) = &args.report {
                write_report(path, &summary, &outcomes)?;
            }
            Ok(exit_code(summary.has_failures()))
        }
        Command::Check(args) => {
            let config = config::load_config_with(&cli.config, Some(overrides(&args)))?;
            let target = resolve_target(&args, &config)?;
            let files = scan::expand_inputs(&args.paths, args.recursive)?;
            let settings = ConversionSettings::from_config(&config.conversion, target);
            let backend = RustBackend::new();
            let converter = Converter::new(&backend);

            let mut problems = 0;
            for file in &files {
                let plan = converter.preview(&settings.request_for(file));
                if plan.as_ref().is_err_and(is_problem) {
                    problems += 1;
                }
                output::print_plan(file, &plan);
            }
            println!();
            println!("{} files checked, {problems} would fail", files.len());
            Ok(exit_code(problems > 0))
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr so stdout stays the per-file report.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,image_converter={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Command-line flags as a config layer. Flags not given leave the file's
/// values alone.
fn overrides(args: &ConvertArgs) -> toml::Value {
    let mut conversion = toml::Table::new();
    if let Some(level) = args.compression {
        conversion.insert("compression".into(), toml::Value::String(level.as_str().into()));
    }
    if args.delete_original {
        conversion.insert("delete_original".into(), toml::Value::Boolean(true));
    }
    if args.keep_metadata {
        conversion.insert("strip_metadata".into(), toml::Value::Boolean(false));
    }
    if args.overwrite {
        conversion.insert("overwrite".into(), toml::Value::Boolean(true));
    }

    let mut root = toml::Table::new();
    root.insert("conversion".into(), toml::Value::Table(conversion));
    if args.no_optimizer {
        let mut optimizer = toml::Table::new();
        optimizer.insert("enabled".into(), toml::Value::Boolean(false));
        root.insert("optimizer".into(), toml::Value::Table(optimizer));
    }
    toml::Value::Table(root)
}

fn resolve_target(
    args: &ConvertArgs,
    config: &config::ConverterConfig,
) -> Result<TargetFormat, &'static str> {
    args.to
        .or(config.conversion.target)
        .ok_or("no target format: pass --to or set conversion.target in the config file")
}

fn parse_target(s: &str) -> Result<TargetFormat, String> {
    s.parse().map_err(|e: ConvertError| e.to_string())
}

fn parse_compression(s: &str) -> Result<CompressionLevel, String> {
    s.parse().map_err(|e: ConvertError| e.to_string())
}

/// Unsupported files are skipped, not failures.
fn is_problem(err: &ConvertError) -> bool {
    err.kind() != ErrorKind::UnsupportedFormat
}

fn write_report(
    path: &Path,
    summary: &batch::BatchSummary,
    outcomes: &[ConversionOutcome],
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&Report { summary, outcomes })?;
    std::fs::write(path, json)?;
    Ok(())
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
