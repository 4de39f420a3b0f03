use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{progress, setup};
use std::path::{Path, PathBuf};
use tagger_core::config::{self, AppConfig};
use tagger_core::discovery::{self, DiscoveryError};
use tagger_core::pipeline;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the listing and JSON reports.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { path, json } => run_scan(&path, json),
        Commands::Tag { path, json } => {
            let cfg = config::load(cli.config.as_deref())?;
            run_tag(cfg, &path, json).await
        }
        Commands::Setup => {
            println!("{}", setup::instructions());
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "image-tagger")]
#[command(about = "Tag photos with labels from Google Cloud Vision", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the images that would be tagged
    Scan {
        /// Directory to search recursively
        path: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Detect labels and write them into each image's metadata
    Tag {
        /// Directory to search recursively
        path: PathBuf,
        /// Output a JSON report instead of progress lines
        #[arg(long)]
        json: bool,
    },
    /// Print credential setup instructions
    Setup,
}

/// `Ok(None)` when the directory holds no images; that is not an error.
fn discover_or_report(path: &Path, json: bool) -> Result<Option<Vec<PathBuf>>> {
    match discovery::discover(path) {
        Ok(images) => Ok(Some(images)),
        Err(e) if e.is_informational() => {
            if json {
                let out = serde_json::json!({
                    "status": "ok",
                    "images": [],
                    "message": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", e);
            }
            Ok(None)
        }
        Err(e @ DiscoveryError::InvalidRoot) => {
            Err(e).with_context(|| format!("cannot scan {}", path.display()))
        }
        Err(e) => Err(e.into()),
    }
}

fn run_scan(path: &Path, json: bool) -> Result<()> {
    let Some(images) = discover_or_report(path, json)? else {
        return Ok(());
    };
    if json {
        let out = serde_json::json!({
            "status": "ok",
            "images": images,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Images to be tagged:");
        for image in &images {
            println!("{}", image.display());
        }
    }
    Ok(())
}

async fn run_tag(cfg: AppConfig, path: &Path, json: bool) -> Result<()> {
    let Some(images) = discover_or_report(path, json)? else {
        return Ok(());
    };

    // Authentication is checked once, before any file is read.
    let detector = pipeline::build_detector(&cfg).context("Authentication failed.")?;
    info!("Using {} label detector", cfg.vision.provider);

    let (handle, mut events) = pipeline::spawn_session(detector, images);
    while let Some(event) = events.recv().await {
        if !json {
            println!("{}", progress::render(&event));
        }
    }
    let report = handle.await.context("tagging session panicked")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&progress::report_json(&report)?)?
        );
    }
    Ok(())
}
