use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use sprint_stitcher::{config::Config, StitchEngine};

#[derive(Parser)]
#[command(
    name = "sprint-stitcher",
    version,
    about = "Stitch sprint demo videos from screen recordings",
    long_about = "Sprint-Stitcher assembles configured screen-recording clips into one narrated \
                  demo video with ticket/description overlays, a generated table of contents, \
                  chapter bookkeeping, and a watermark."
)]
struct Cli {
    /// Working directory containing the source videos and config file
    #[arg(short, long)]
    dir: PathBuf,

    /// Cap every clip to this many seconds for fast iteration
    #[arg(short, long)]
    preview: Option<f64>,

    /// Configuration file name inside the working directory
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting Sprint-Stitcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Stitching sprint video from directory: {:?}", cli.dir);
    if let Some(preview) = cli.preview {
        info!("PREVIEW MODE: all clips cut to {preview} seconds");
    }

    let config = Config::load(&cli.dir, &cli.config)?;
    let engine = StitchEngine::new(cli.dir, config, cli.preview)?;
    let report = engine.run().await?;

    info!("Starting times for each clip in the final video (in seconds):");
    for chapter in &report.chapters {
        info!("Chapter {}: {} sec", chapter.index + 1, chapter.start);
    }
    info!("Done! Output saved to: {:?}", report.output);

    Ok(())
}
