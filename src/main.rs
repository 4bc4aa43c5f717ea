//! CLI entry point for the ftp-fetch tool.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ftp_fetch::{Endpoint, FetchRequest, Resource};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

mod cli;
mod progress_ui;

use cli::Args;
use progress_ui::TransferProgress;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout may carry the fetched file.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(url = %args.url, mode = ?args.mode, active = args.active, "CLI arguments parsed");

    // Malformed addresses are rejected before any connection is made.
    let endpoint = Endpoint::parse(&args.url)?;

    let progress = TransferProgress::new(!args.no_progress && !args.quiet);
    let request = build_request(&args).with_progress_listener(progress.listener());

    let resource = request.fetch(&endpoint).await;
    progress.finish();

    let Some(resource) = resource else {
        error!(url = %endpoint, "Fetch failed, no file retrieved");
        return Ok(ExitCode::FAILURE);
    };

    write_output(&resource, args.output.as_deref(), args.encoding.as_deref()).await?;

    info!(
        url = %endpoint,
        bytes = resource.len(),
        "Fetch complete"
    );

    Ok(ExitCode::SUCCESS)
}

fn build_request(args: &Args) -> FetchRequest {
    let mut request = FetchRequest::new()
        .with_transfer_mode(args.mode.into())
        .with_passive_mode(!args.active)
        .with_max_retries(u32::from(args.retries))
        .with_retry_delay(Duration::from_secs(args.retry_delay))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_read_timeout(Duration::from_secs(args.read_timeout));

    if let Some(user) = &args.user {
        request = request.with_username(user.as_str());
    }
    if let Some(password) = &args.password {
        request = request.with_password(password.as_str());
    }
    request
}

async fn write_output(
    resource: &Resource,
    output: Option<&Path>,
    encoding: Option<&str>,
) -> Result<()> {
    let text;
    let bytes: &[u8] = match encoding {
        Some(label) => {
            text = resource.as_text_with_label(label)?;
            text.as_bytes()
        }
        None => resource.as_bytes(),
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, bytes)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            debug!(path = %path.display(), "output written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
