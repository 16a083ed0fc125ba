use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use stickerize::{
    IndicatifReporter, PipelineConfig, ResizePolicy, SourceAsset, TranscodePipeline,
    load_manifest, probe,
};

#[derive(Parser, Debug)]
#[command(name = "stickerize", version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single asset.
    Convert(ConvertArgs),
    /// Convert every asset listed in a JSON manifest.
    Batch(BatchArgs),
    /// Print the probed dimensions and duration of a media file as JSON.
    Probe(ProbeArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of assets converted concurrently.
    #[arg(long, global = true)]
    jobs: Option<usize>,

    /// Variant encoded for animated assets when `--all` is not given.
    #[arg(long, global = true, value_enum)]
    policy: Option<ResizePolicy>,

    /// Keep the downloaded GIF intermediates in the scratch directory.
    #[arg(long, global = true)]
    keep_intermediate: bool,

    /// Output directory for still stickers.
    #[arg(long, global = true)]
    static_dir: Option<PathBuf>,

    /// Output directory for animated stickers.
    #[arg(long, global = true)]
    animated_dir: Option<PathBuf>,

    /// Directory for intermediate files.
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Also write debug-level logs to this file (truncated on start).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Source image (WebP, PNG, GIF, ...).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file stem.
    #[arg(long)]
    name: String,

    /// Treat the source as an animation.
    #[arg(long)]
    animated: bool,

    /// Produce every size variant instead of only the canonical one.
    #[arg(long)]
    all: bool,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// JSON array of `{ "path", "name", "animated" }` entries.
    #[arg(long)]
    manifest: PathBuf,

    /// Produce every size variant instead of only the canonical one.
    #[arg(long)]
    all: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Media file to inspect.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.log_file.as_deref())?;
    match cli.cmd {
        Command::Convert(args) => cmd_convert(&cli.common, args),
        Command::Batch(args) => cmd_batch(&cli.common, args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create log file '{}'", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

fn load_config(common: &CommonArgs) -> anyhow::Result<PipelineConfig> {
    let mut cfg = match &common.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(jobs) = common.jobs {
        cfg.workers = jobs;
    }
    if let Some(policy) = common.policy {
        cfg.canonical_policy = policy;
    }
    if common.keep_intermediate {
        cfg.keep_intermediate = true;
    }
    if let Some(dir) = &common.static_dir {
        cfg.layout.static_dir = dir.clone();
    }
    if let Some(dir) = &common.animated_dir {
        cfg.layout.animated_dir = dir.clone();
    }
    if let Some(dir) = &common.scratch_dir {
        cfg.layout.scratch_dir = dir.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_convert(common: &CommonArgs, args: ConvertArgs) -> anyhow::Result<()> {
    let pipeline = TranscodePipeline::new(load_config(common)?)?;
    let asset = SourceAsset::new(args.in_path, args.name, args.animated);

    let outputs = pipeline
        .convert(&asset, args.all)
        .with_context(|| format!("convert '{}'", asset.name))?;

    println!("{}", serde_json::to_string_pretty(&outputs)?);
    for path in outputs.paths() {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_batch(common: &CommonArgs, args: BatchArgs) -> anyhow::Result<()> {
    let assets = load_manifest(&args.manifest)?;
    let pipeline = TranscodePipeline::new(load_config(common)?)?;
    tracing::info!(assets = assets.len(), workers = pipeline.config().workers, "starting batch");

    let reporter = IndicatifReporter::new();
    let report = pipeline.run_batch(&assets, args.all, &reporter)?;

    for (name, err) in &report.failed {
        eprintln!("failed {name}: {err}");
    }
    eprintln!("converted {}/{}", report.succeeded.len(), report.total());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let result = probe(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
