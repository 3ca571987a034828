// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Postwerk — capture a photo, print a postcard.
//
// Entry point. Initialises logging, loads configuration, wires the capture
// service and runs one command. In-flight uploads are awaited before exit.

mod services;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use postwerk_core::{AppConfig, Code};

use services::CaptureService;

#[derive(Parser)]
#[command(name = "postwerk")]
#[command(author, version, about = "Turn photos into printable postcards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process photos: code, compose, render, print and upload
    Capture {
        /// Image files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Re-render a stored capture and print it again
    Reprint {
        /// Postcard code
        code: String,
    },

    /// Write a JPEG preview of a stored capture
    Preview {
        /// Postcard code
        code: String,
        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Re-render the PDF of a stored capture
    Render {
        /// Postcard code
        code: String,
    },

    /// Show which files exist for a code
    Show {
        /// Postcard code
        code: String,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Commands::Config = cli.command {
        return print_config(&config);
    }

    tracing::info!(data_dir = %config.data_dir.display(), "Postwerk starting");
    let service = CaptureService::from_config(config).context("failed to start services")?;
    let result = run(&service, cli.command).await;
    service.shutdown().await;
    result
}

async fn run(service: &CaptureService, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Capture { files } => {
            let mut failed = 0usize;
            for file in &files {
                match capture_file(service, file).await {
                    Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
                    Err(err) => {
                        failed += 1;
                        tracing::error!(file = %file.display(), error = %format!("{err:#}"), "capture failed");
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} captures failed", files.len());
            }
        }
        Commands::Reprint { code } => {
            let outcome = service.reprint(&parse_code(&code)?).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Preview { code, out } => {
            let jpeg = service.preview(&parse_code(&code)?).await?;
            tokio::fs::write(&out, &jpeg)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", out.display());
        }
        Commands::Render { code } => {
            let path = service.render_document(&parse_code(&code)?).await?;
            println!("{}", path.display());
        }
        Commands::Show { code } => {
            let stored = service.inspect(&parse_code(&code)?)?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Commands::Config => print_config(service.config())?,
    }
    Ok(())
}

async fn capture_file(
    service: &CaptureService,
    file: &std::path::Path,
) -> anyhow::Result<postwerk_core::CaptureOutcome> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(service.capture(bytes).await?)
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}

fn parse_code(raw: &str) -> anyhow::Result<Code> {
    Ok(Code::parse(raw)?)
}
