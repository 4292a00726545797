mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use smear_core::pipeline::{self, PipelineConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    info!(input = ?cli.input, output = ?cli.output, "starting motion blur");

    let config = PipelineConfig {
        progress: Some(Box::new(|done, total| {
            info!(frames_done = done, total_frames = total, "processing frames");
        })),
    };

    let summary = pipeline::run_pipeline(&cli.input, &cli.output, &config)
        .context("motion blur failed")?;

    info!(
        frame_count = summary.frame_count,
        width = summary.width,
        height = summary.height,
        fps = summary.fps,
        output = ?cli.output,
        "processing complete"
    );

    Ok(())
}
