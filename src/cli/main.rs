//! Sticker CLI
//!
//! Turns local files, directories, URLs or stdin into chat-ready stickers
//! using the same pipeline the bot runs.

use super::config::CliConfigBuilder;
use crate::{
    services::{ConsoleProgressReporter, ImageFetcher, ImageIOService},
    tracing_config::{init_cli_tracing, spans},
    utils::PathValidator,
    StickerAsset, StickerPipeline,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Make chat stickers from flat-backdrop images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "stickerbot")]
pub struct Cli {
    /// Input image files, directories or http(s) URLs ("-" for stdin)
    #[arg(value_name = "INPUT", required_unless_present = "print_config")]
    pub input: Vec<String>,

    /// Output file (single input) or directory (several inputs). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// JSON pipeline configuration; flags below override its values
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Background removal strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<CliStrategy>,

    /// RGB distance tolerance for key-color strategies (442 covers the whole cube)
    #[arg(short, long)]
    pub tolerance: Option<f32>,

    /// Corner whose block average is the key color
    #[arg(long, value_enum)]
    pub key_corner: Option<CliCorner>,

    /// Side length of the sampled corner block
    #[arg(long)]
    pub block_size: Option<u32>,

    /// Fixed key color as hex (e.g. 00ff00); overrides corner sampling
    #[arg(long, value_name = "HEX")]
    pub key_color: Option<String>,

    /// Sample only the top-left pixel instead of a corner block
    #[arg(long, conflicts_with_all = ["key_corner", "block_size", "key_color"])]
    pub top_left_pixel: bool,

    /// Run the one-pixel edge erosion after flood fill (off by default)
    #[arg(long)]
    pub erode: Option<bool>,

    /// Longest output side in pixels
    #[arg(long)]
    pub max_dimension: Option<u32>,

    /// Encoded size budget in bytes
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Use the 300 KiB budget of stricter platforms
    #[arg(long, conflicts_with = "max_bytes")]
    pub compact: bool,

    /// Quality decrement between encode attempts
    #[arg(long)]
    pub quality_step: Option<u8>,

    /// Lowest quality tried before giving up
    #[arg(long)]
    pub quality_floor: Option<u8>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliOutputFormat>,

    /// Per-image timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// File name pattern for directory inputs (e.g. "*.png")
    #[arg(long)]
    pub pattern: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliStrategy {
    /// Flood fill from the border over key-colored pixels
    FloodFill,
    /// Remove every key-colored pixel, enclosed or not
    Global,
    /// Wide green hue band
    GreenScreen,
    /// Narrow green hue band
    GreenScreenNarrow,
    /// Purple hue band
    Purple,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Webp,
    Png,
}

/// # Errors
/// Argument, configuration and tracing setup failures, or a batch that produced nothing.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let session = spans::session(&session_id, config.strategy.name());

    info!("Input(s): {}", cli.input.join(", "));
    info!(
        "Strategy: {}, max {}px / {} bytes, format {:?}",
        config.strategy.name(),
        config.limits.max_dimension,
        config.limits.max_bytes,
        config.format
    );

    let fetch_timeout = config.per_image_timeout();
    let pipeline = Arc::new(
        StickerPipeline::new(config)
            .context("Failed to create sticker pipeline")?
            .with_progress_reporter(Arc::new(ConsoleProgressReporter::new(cli.verbose > 0))),
    );

    let start_time = Instant::now();
    let processed = process_inputs(&cli, &pipeline, fetch_timeout)
        .instrument(session)
        .await?;
    info!(
        "Processed {} image(s) in {:.2}s",
        processed,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Where an input comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Stdin,
    File(PathBuf),
    Url(String),
}

impl InputSource {
    fn display_name(&self) -> String {
        match self {
            Self::Stdin => "<stdin>".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
        }
    }

    /// Default output next to the input (or in `dir`)
    fn default_output(&self, dir: Option<&Path>, format: crate::StickerFormat) -> PathBuf {
        let base = match self {
            Self::Stdin => PathBuf::from(crate::services::io::STDIO_PATH),
            Self::File(path) => ImageIOService::sticker_output_path(path, format),
            Self::Url(url) => {
                let name = url
                    .split(['?', '#'])
                    .next()
                    .and_then(|u| u.rsplit('/').next())
                    .filter(|n| !n.is_empty())
                    .unwrap_or("image");
                ImageIOService::sticker_output_path(Path::new(name), format)
            },
        };
        match (dir, base.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => base,
        }
    }
}

fn collect_inputs(cli: &Cli) -> Result<Vec<InputSource>> {
    let mut urls = Vec::new();
    let mut files = Vec::new();
    let mut stdin = false;

    for input in &cli.input {
        if input == crate::services::io::STDIO_PATH {
            stdin = true;
        } else if PathValidator::is_url(input) {
            urls.push(InputSource::Url(input.clone()));
        } else {
            let path = PathBuf::from(input);
            if path.is_file() {
                if PathValidator::is_supported_image_format(&path) {
                    files.push(path);
                } else {
                    warn!("Skipping unsupported file: {}", path.display());
                }
            } else if path.is_dir() {
                files.extend(find_image_files(&path, cli.recursive, cli.pattern.as_deref())?);
            } else {
                anyhow::bail!(
                    "Input path does not exist or is not accessible: {}",
                    path.display()
                );
            }
        }
    }

    if stdin && (cli.input.len() > 1) {
        anyhow::bail!("stdin (-) cannot be combined with other inputs");
    }

    files.sort();
    let mut sources: Vec<InputSource> = files.into_iter().map(InputSource::File).collect();
    sources.extend(urls);
    if stdin {
        sources.push(InputSource::Stdin);
    }
    Ok(sources)
}

async fn read_input(source: &InputSource, fetcher: &ImageFetcher) -> Result<Vec<u8>> {
    match source {
        InputSource::Stdin => Ok(ImageIOService::read_stdin()?),
        InputSource::File(path) => Ok(ImageIOService::read_bytes(path)?),
        InputSource::Url(url) => Ok(fetcher.fetch(url).instrument(spans::fetch(url)).await?),
    }
}

async fn process_inputs(
    cli: &Cli,
    pipeline: &Arc<StickerPipeline>,
    fetch_timeout: Duration,
) -> Result<usize> {
    let sources = collect_inputs(cli)?;
    if sources.is_empty() {
        warn!(
            "No supported image inputs found (extensions: {})",
            PathValidator::supported_image_extensions().join(", ")
        );
        return Ok(0);
    }
    let count = sources.len();
    let format = pipeline.config().format;

    let output_dir = match (&cli.output, count) {
        (Some(output), n) if n > 1 => {
            if output == crate::services::io::STDIO_PATH {
                anyhow::bail!("Cannot use stdout (-) as output when processing multiple inputs");
            }
            let dir = PathBuf::from(output);
            if dir.is_file() {
                anyhow::bail!("Output path exists and is a file, not a directory: {}", dir.display());
            }
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            Some(dir)
        },
        _ => None,
    };

    let fetcher = ImageFetcher::new(fetch_timeout)?;
    let progress = (count > 1).then(|| {
        let pb = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    });
    let batch_span = spans::batch_processing(count);

    let mut processed = 0;
    let mut failed = 0;
    for source in &sources {
        if let Some(pb) = &progress {
            pb.set_message(source.display_name());
        }

        let output = match (&cli.output, &output_dir) {
            (Some(output), None) => PathBuf::from(output),
            (_, dir) => source.default_output(dir.as_deref(), format),
        };

        match process_one(pipeline, &fetcher, source, &output)
            .instrument(batch_span.clone())
            .await
        {
            Ok(asset) => {
                processed += 1;
                report_asset(source, &output, &asset);
            },
            Err(e) => {
                failed += 1;
                error!("Failed to process {}: {:#}", source.display_name(), e);
            },
        }

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Completed! Processed: {processed}, Failed: {failed}"));
    }
    if failed > 0 {
        warn!("Some inputs failed. Processed: {processed}, Failed: {failed}");
        if processed == 0 {
            anyhow::bail!("No stickers were produced");
        }
    }
    Ok(processed)
}

async fn process_one(
    pipeline: &Arc<StickerPipeline>,
    fetcher: &ImageFetcher,
    source: &InputSource,
    output: &Path,
) -> Result<StickerAsset> {
    let bytes = read_input(source, fetcher).await?;
    let asset = pipeline
        .process_with_timeout(bytes)
        .await
        .with_context(|| format!("Failed to make sticker from {}", source.display_name()))?;
    asset
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(asset)
}

fn report_asset(source: &InputSource, output: &Path, asset: &StickerAsset) {
    let timings = &asset.timings;
    info!("Sticker for {}:", source.display_name());
    info!(
        "  ├─ {}x{} -> {}x{}, {} transparent px",
        asset.original_dimensions.0,
        asset.original_dimensions.1,
        asset.dimensions.0,
        asset.dimensions.1,
        asset.transparent_pixels
    );
    info!(
        "  ├─ {} bytes at quality {} after {} attempt(s)",
        asset.len(),
        asset.quality,
        asset.attempts
    );
    info!(
        "  ├─ decode {}ms, removal {}ms, resize {}ms, encode {}ms",
        timings.decode_ms, timings.removal_ms, timings.resize_ms, timings.encode_ms
    );
    if output == Path::new(crate::services::io::STDIO_PATH) {
        info!("  └─ Total: {}ms, written to stdout", timings.total_ms);
    } else {
        info!("  └─ Total: {}ms, saved to {}", timings.total_ms, output.display());
    }
}

fn find_image_files(dir: &Path, recursive: bool, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
    let depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).max_depth(depth) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file()
            && PathValidator::is_supported_image_format(path)
            && matches_pattern(path, pattern)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn matches_pattern(path: &Path, pattern: Option<&str>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(name))
                .unwrap_or(false)
        })
}
