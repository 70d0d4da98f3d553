use anyhow::{bail, Context, Result};
use clap::Parser;
use report_processor::{
    transport::{handle_upload, Upload},
    ReportConfig,
};
use serde::Serialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Semaphore;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Turn campaign CSV reports into highlighted XLSX workbooks.
#[derive(Debug, Parser)]
#[command(name = "report-processor", version)]
struct Cli {
    /// CSV reports to process; each one is handled as a separate upload.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Where finished workbooks are written (default: $REPORT_OUTPUT_DIR or ./output).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Where uploads are staged while processing (default: $REPORT_UPLOAD_DIR or ./uploads).
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Reports processed at the same time.
    #[arg(long, default_value_t = 3)]
    concurrency: usize,
}

#[derive(Serialize)]
struct FileSummary {
    input: String,
    request_id: String,
    success: bool,
    artifact: Option<String>,
    status: Option<u16>,
    error: Option<String>,
    processing_time_seconds: f64,
}

fn process_one(config: &ReportConfig, input: &Path) -> Result<FileSummary> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let upload = Upload {
        filename: &filename,
        bytes: &bytes,
    };
    let summary = match handle_upload(config, upload, &request_id) {
        Ok(download) => FileSummary {
            input: input.display().to_string(),
            request_id,
            success: true,
            artifact: Some(download.path.display().to_string()),
            status: None,
            error: None,
            processing_time_seconds: start.elapsed().as_secs_f64(),
        },
        Err(rejection) => FileSummary {
            input: input.display().to_string(),
            request_id,
            success: false,
            artifact: None,
            status: Some(rejection.status),
            error: Some(rejection.error),
            processing_time_seconds: start.elapsed().as_secs_f64(),
        },
    };
    Ok(summary)
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // ─── 2) configure dirs ───────────────────────────────────────────
    let mut config = ReportConfig::from_env();
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }
    config.ensure_dirs().context("creating working directories")?;
    info!(
        "uploads → {}, output → {}",
        config.upload_dir.display(),
        config.output_dir.display()
    );

    // ─── 3) process each report on the blocking pool ────────────────
    let config = Arc::new(config);
    let sem = Arc::new(Semaphore::new(cli.concurrency.max(1)));
    let mut handles = Vec::with_capacity(cli.files.len());

    for input in cli.files {
        let config = Arc::clone(&config);
        let sem = sem.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await?;
            tokio::task::spawn_blocking(move || process_one(&config, &input)).await?
        }));
    }

    // ─── 4) report results ───────────────────────────────────────────
    let mut failed = 0;
    for h in handles {
        match h.await? {
            Ok(summary) => {
                if summary.success {
                    info!(input = %summary.input, artifact = ?summary.artifact, "done");
                } else {
                    failed += 1;
                    error!(input = %summary.input, error = ?summary.error, "rejected");
                }
                println!("{}", serde_json::to_string(&summary)?);
            }
            Err(e) => {
                failed += 1;
                error!("{:#}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} report(s) failed", failed);
    }
    info!("all done");
    Ok(())
}
