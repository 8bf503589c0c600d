use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use isbnscan::detection::{build_standard_pipeline, ocr::TextRecognizer};
use isbnscan::{ExtractionResult, Isbn13, OcrTarget, ScanConfig, ScanlineDecoder};

#[derive(Parser)]
#[command(name = "isbnscan")]
#[command(about = "Find the ISBN in photos of book covers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan images for an ISBN (barcode first, then printed text)
    Scan(ScanArgs),
    /// Validate an ISBN-10 or ISBN-13 and print its ISBN-13 form
    Check {
        #[arg(value_name = "CODE")]
        code: String,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Paths to input image files
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with scan settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding text-detection.rten and text-recognition.rten
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Skip the OCR fallback (barcode only)
    #[arg(long)]
    skip_ocr: bool,

    /// Run OCR on the detected barcode strip instead of the whole image
    #[arg(long)]
    ocr_on_crop: bool,

    /// Save debug outputs to directory (must be empty, single image only)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print one JSON object per image
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "ocr")]
fn load_recognizer(args: &ScanArgs) -> anyhow::Result<Option<Box<dyn TextRecognizer>>> {
    use isbnscan::{OcrConfig, OcrsRecognizer};

    if args.skip_ocr {
        return Ok(None);
    }
    let config = match &args.model_dir {
        Some(dir) => OcrConfig::from_dir(dir),
        None => OcrConfig::default(),
    };
    let engine = OcrsRecognizer::new(&config)
        .context("failed to start the OCR engine (use --skip-ocr to scan barcodes only)")?;
    Ok(Some(Box::new(engine) as Box<dyn TextRecognizer>))
}

#[cfg(not(feature = "ocr"))]
fn load_recognizer(args: &ScanArgs) -> anyhow::Result<Option<Box<dyn TextRecognizer>>> {
    if !args.skip_ocr {
        tracing::warn!("built without the `ocr` feature; scanning barcodes only");
    }
    Ok(None)
}

fn scan(args: ScanArgs) -> anyhow::Result<ExitCode> {
    init_logging(args.verbose);

    if args.debug_out.is_some() && args.images.len() > 1 {
        anyhow::bail!("--debug-out works with a single image");
    }

    let mut config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if args.ocr_on_crop {
        config = config.with_ocr_target(OcrTarget::Crop);
    }

    let recognizer = load_recognizer(&args)?;
    let mut pipeline = build_standard_pipeline(Box::new(ScanlineDecoder::new()), recognizer, config);
    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let mut failures = 0usize;
    for path in &args.images {
        tracing::debug!(path = %path.display(), "Scanning image");
        match pipeline.extract_from_path(path) {
            Ok(result) => {
                if args.json {
                    let mut line = serde_json::to_value(&result)?;
                    line["path"] = serde_json::json!(path.display().to_string());
                    println!("{}", line);
                } else {
                    match result {
                        ExtractionResult::Found(isbn) => println!("{}: FOUND {}", path.display(), isbn),
                        ExtractionResult::NotFound => println!("{}: NOT FOUND", path.display()),
                    }
                }
            }
            Err(e) => {
                failures += 1;
                if args.json {
                    let line = serde_json::json!({
                        "path": path.display().to_string(),
                        "status": "error",
                        "error": e.to_string(),
                    });
                    println!("{}", line);
                } else {
                    eprintln!("{}: ERROR {}", path.display(), e);
                }
            }
        }
    }

    Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn check(code: &str) -> ExitCode {
    match code.parse::<Isbn13>() {
        Ok(isbn) => {
            println!("{}", isbn);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan(args) => scan(args),
        Command::Check { code } => Ok(check(&code)),
    }
}
