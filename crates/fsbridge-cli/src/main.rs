mod args;

use clap::Parser;
use fsbridge_transfer::{JobHandle, TransferConfig, TransferManager};
use fsbridge_types::{DownloadOptions, JobId, UploadOptions};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // stdout carries the JSON event stream; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fsbridge=info,fsbridge_transfer=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = TransferConfig::from_env()?;
    let manager = TransferManager::new(config);
    let job_id = JobId(cli.job_id);

    let succeeded = match cli.command {
        Command::Download {
            url,
            dest,
            headers,
            progress_interval,
            progress_divider,
            connect_timeout,
            read_timeout,
            max_redirects,
            quiet,
        } => {
            let mut options = DownloadOptions::new(url, dest);
            options.headers = headers.into_iter().collect();
            options.progress_interval = progress_interval;
            options.progress_divider = progress_divider;
            options.connection_timeout = connect_timeout;
            options.read_timeout = read_timeout;
            options.max_redirects = max_redirects;
            options.has_begin_callback = !quiet;
            options.has_progress_callback = !quiet;

            let handle = manager.download(job_id, options)?;
            drive(&manager, handle).await?
        }
        Command::Upload {
            url,
            files,
            fields,
            headers,
            method,
            binary,
            quiet,
        } => {
            let mut options = UploadOptions::new(url, files);
            options.fields = fields.into_iter().collect();
            options.headers = headers.into_iter().collect();
            options.method = method;
            options.binary_stream_only = binary;
            options.has_begin_callback = !quiet;
            options.has_progress_callback = !quiet;

            let handle = manager.upload(job_id, options)?;
            drive(&manager, handle).await?
        }
        Command::Hash { path, algorithm } => {
            let digest = manager.hash(&path, algorithm).await?;
            print_line(&json!({
                "type": "hash",
                "data": { "path": path, "algorithm": algorithm.to_string(), "digest": digest },
            }))?;
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Print events until the job finishes, then its outcome. Ctrl+C stops the
/// job and still waits for it to report.
async fn drive<T: Serialize>(manager: &TransferManager, mut handle: JobHandle<T>) -> anyhow::Result<bool> {
    let job_id = handle.job_id();
    let stop = shutdown_signal();
    tokio::pin!(stop);
    let mut stopping = false;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => print_line(&event)?,
                None => break,
            },
            _ = &mut stop, if !stopping => {
                stopping = true;
                manager.stop(job_id);
            }
        }
    }

    match handle.wait().await {
        Ok(result) => {
            print_line(&json!({ "type": "complete", "data": result }))?;
            Ok(true)
        }
        Err(err) => {
            print_line(&json!({ "type": "failed", "data": err.to_failure(job_id) }))?;
            Ok(false)
        }
    }
}

fn print_line<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, stopping transfer..."),
            _ = sigterm.recv() => info!("Received SIGTERM, stopping transfer..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, stopping transfer...");
    }
}
