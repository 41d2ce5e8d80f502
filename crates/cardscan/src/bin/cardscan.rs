use std::path::{Path, PathBuf};
use std::sync::Arc;

use cardscan::locate::{CaptureKind, CardLocalizer};
use cardscan::phash::{
    FingerprintIndex, FingerprintRecord, JsonFileSource, PerceptualHasher, SourceError,
    StoredRecord,
};
use cardscan::{CardIdentifier, DirectoryImages, ScanConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(
    name = "cardscan",
    about = "Identify trading cards from photos with perceptual hashes",
    version
)]
struct Cli {
    /// Print debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of an image as hex.
    Hash(HashArgs),
    /// Rank the catalogue cards closest to a photo.
    Identify(IdentifyArgs),
    /// Fingerprint a catalogue image and store it in a records file.
    Register(RegisterArgs),
    /// Build the fingerprint index from a records file and print its size.
    Index(IndexArgs),
    /// Print the default configuration as JSON.
    Config,
}

/// How the input image was captured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Capture {
    /// Upright, cropped catalogue image; no localization.
    Reference,
    /// Frame from the fixed capture rig.
    Rig,
    /// Free-form photo.
    Upload,
}

#[derive(Args)]
struct HashArgs {
    /// Image file (PNG, JPEG, ...).
    image: PathBuf,

    #[arg(long, value_enum, default_value_t = Capture::Reference)]
    capture: Capture,

    /// JSON config; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured hash size.
    #[arg(long)]
    hash_size: Option<u32>,
}

#[derive(Args)]
struct IdentifyArgs {
    /// Photo to identify.
    image: PathBuf,

    /// JSON array of `{ "id", "phash" }` records.
    #[arg(long)]
    records: PathBuf,

    /// Number of matches to print.
    #[arg(short = 'k', long)]
    neighbors: Option<usize>,

    #[arg(long, value_enum, default_value_t = Capture::Rig)]
    capture: Capture,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    hash_size: Option<u32>,

    /// Write the rectified card (PNG) here.
    #[arg(long)]
    rectified: Option<PathBuf>,

    /// Write the side-by-side comparison (PNG) here; needs `--images`.
    #[arg(long)]
    comparison: Option<PathBuf>,

    /// Directory of reference images named `<id>.png|jpg|jpeg`.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RegisterArgs {
    /// Catalogue image.
    image: PathBuf,

    /// Card identifier to store the fingerprint under.
    #[arg(long)]
    id: String,

    /// Records file to update; created when missing.
    #[arg(long)]
    records: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct IndexArgs {
    /// JSON array of `{ "id", "phash" }` records.
    records: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Hash(args) => run_hash(&args),
        Commands::Identify(args) => run_identify(&args),
        Commands::Register(args) => run_register(&args),
        Commands::Index(args) => run_index(&args),
        Commands::Config => run_config(),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: bool, json: bool) {
    let _ = tracing_log::LogTracer::init();
    cardscan::core::init_tracing(json);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool, json: bool) {
    if json {
        eprintln!("--log-json needs the `tracing` feature; using plain logs");
    }
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = cardscan::core::init_with_level(level);
}

fn load_config(path: Option<&Path>) -> CliResult<ScanConfig> {
    match path {
        Some(p) => Ok(ScanConfig::load_json(p)?),
        None => Ok(ScanConfig::default()),
    }
}

fn capture_kind(capture: Capture) -> Option<CaptureKind> {
    match capture {
        Capture::Reference => None,
        Capture::Rig => Some(CaptureKind::Rig),
        Capture::Upload => Some(CaptureKind::Upload),
    }
}

// ── hash ───────────────────────────────────────────────────────────────

fn run_hash(args: &HashArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(size) = args.hash_size {
        config.hash.hash_size = size;
    }
    let bytes = std::fs::read(&args.image)?;

    let fingerprint = match capture_kind(args.capture) {
        None => {
            let index = Arc::new(FingerprintIndex::new(config.index.clone()));
            CardIdentifier::new(&config, index)?.fingerprint_reference(&bytes)?
        }
        Some(kind) => {
            let frame = image::load_from_memory(&bytes)?.to_rgb8();
            let card = CardLocalizer::new(config.locator.clone()).locate(&frame, kind)?;
            log::info!("card source: {:?}", card.source);
            PerceptualHasher::new(config.hash.clone())?.hash(&card.image)?
        }
    };
    println!("{fingerprint}");
    Ok(())
}

// ── identify ───────────────────────────────────────────────────────────

fn run_identify(args: &IdentifyArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(k) = args.neighbors {
        config.index.neighbors = k;
    }
    let Some(kind) = capture_kind(args.capture) else {
        return Err("identify needs a photo: use --capture rig or --capture upload".into());
    };
    if args.comparison.is_some() && args.images.is_none() {
        return Err("--comparison needs --images".into());
    }

    let source = Arc::new(JsonFileSource::new(&args.records));
    let mut identifier = CardIdentifier::with_source(&config, source)?;
    if let Some(dir) = &args.images {
        identifier = identifier.with_reference_images(Arc::new(DirectoryImages::new(dir)));
    }
    // Surface storage errors instead of the lazy build's empty fallback.
    identifier.rebuild_index()?;

    let bytes = std::fs::read(&args.image)?;
    let result = identifier.identify(&bytes, kind, args.hash_size)?;

    if let Some(path) = &args.rectified {
        std::fs::write(path, &result.rectified_png)?;
    }
    if let Some(path) = &args.comparison {
        match &result.comparison_png {
            Some(png) => std::fs::write(path, png)?,
            None => log::warn!("no reference image for the top match; comparison not written"),
        }
    }

    if args.json {
        let report = serde_json::json!({
            "matches": result.matches,
            "phash": result.fingerprint,
            "source": result.source,
            "quad": result.quad,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for neighbor in &result.matches {
            println!("{}\t{}", neighbor.id, neighbor.distance);
        }
    }
    Ok(())
}

// ── register ───────────────────────────────────────────────────────────

fn run_register(args: &RegisterArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let index = Arc::new(FingerprintIndex::new(config.index.clone()));
    let identifier = CardIdentifier::new(&config, index)?;
    let fingerprint = identifier.fingerprint_reference(&std::fs::read(&args.image)?)?;

    let source = JsonFileSource::new(&args.records);
    let mut records = match source.read_all() {
        Ok(records) => records,
        Err(SourceError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Vec::new()
        }
        Err(err) => return Err(err.into()),
    };
    let stored: StoredRecord = FingerprintRecord::new(args.id.clone(), fingerprint).to_stored();
    match records.iter_mut().find(|r| r.id == stored.id) {
        Some(existing) => *existing = stored,
        None => records.push(stored),
    }
    source.write_all(&records)?;
    println!("{}", records.len());
    Ok(())
}

// ── index ──────────────────────────────────────────────────────────────

fn run_index(args: &IndexArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let index =
        FingerprintIndex::with_source(config.index, Arc::new(JsonFileSource::new(&args.records)));
    let count = index.rebuild()?;
    match index.hash_size() {
        Some(size) => log::info!("indexed {count} fingerprints of {size}x{size} bits"),
        None => log::info!("records file is empty"),
    }
    println!("{count}");
    Ok(())
}

// ── config ─────────────────────────────────────────────────────────────

fn run_config() -> CliResult<()> {
    println!("{}", ScanConfig::default().to_json_pretty()?);
    Ok(())
}
