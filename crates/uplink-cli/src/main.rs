mod manifest;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use uplink_core::impls::{ChannelObserver, HttpTransport, InMemoryTransport};
use uplink_core::ports::ProgressObserver;
use uplink_core::{BatchReport, FileState, ProgressEvent, SiblingPolicy, UploadConfig, UploadCoordinator};

use crate::manifest::Manifest;

#[derive(Debug, Parser)]
#[command(name = "uplink", version, about = "Upload files to pre-signed URLs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload every file listed in a manifest, concurrently
    Upload(UploadArgs),
}

#[derive(Debug, Args)]
struct UploadArgs {
    /// TOML manifest of `[[upload]]` entries (path, url, ...)
    #[arg(long)]
    manifest: PathBuf,

    /// TOML upload config
    #[arg(long, env = "UPLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Override `chunk_size` from the config
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Abort in-flight uploads once one has failed
    #[arg(long)]
    abort_siblings: bool,

    /// Wait for every upload and print a per-file report
    #[arg(long)]
    settle: bool,

    /// Print the report as JSON (with --settle)
    #[arg(long, requires = "settle")]
    json: bool,

    /// Upload into memory instead of over HTTP
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Upload(args) => {
            let json = args.json;
            if let Some(report) = upload(args).await? {
                print_report(&report, json)?;
                if !report.is_success() {
                    bail!(
                        "{} of {} uploads failed",
                        report.failed_indices().len(),
                        report.files.len()
                    );
                }
            }
            Ok(())
        }
    }
}

fn load_config(args: &UploadArgs) -> anyhow::Result<UploadConfig> {
    let mut config = match &args.config {
        Some(path) => UploadConfig::load(path)?,
        None => UploadConfig::default(),
    };
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.abort_siblings {
        config.sibling_policy = SiblingPolicy::Abort;
    }
    config.validate()?;
    Ok(config)
}

/// Runs the upload; returns the report in `--settle` mode.
async fn upload(args: UploadArgs) -> anyhow::Result<Option<BatchReport>> {
    let config = load_config(&args)?;
    let (files, targets) = Manifest::load(&args.manifest)?.load_files().await?;
    info!(files = files.len(), dry_run = args.dry_run, "loaded manifest");

    let builder = UploadCoordinator::builder().config(config.clone());
    let coordinator = if args.dry_run {
        builder
            .transport(InMemoryTransport::new().with_chunk_size(config.chunk_size))
            .build()?
    } else {
        builder
            .transport(HttpTransport::new(&config).context("building HTTP client")?)
            .build()?
    };

    let (observer, rx) = ChannelObserver::new();
    let observer: Arc<dyn ProgressObserver> = Arc::new(observer);
    let printer = tokio::spawn(log_progress(rx));

    let result = if args.settle {
        coordinator
            .upload_batch_settled(files, targets, Some(observer))
            .await
            .map(Some)
    } else {
        coordinator
            .upload_batch(files, targets, Some(observer))
            .await
            .map(|()| None)
    };

    // 成功時は送信側がすべて drop 済みなので printer は自然に終わる
    if result.is_ok() {
        let _ = printer.await;
    }
    Ok(result?)
}

async fn log_progress(mut rx: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        info!(file = %event.file_name, percent = event.percent, "progress");
    }
}

fn print_report(report: &BatchReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("batch {}", report.batch_id);
    for file in &report.files {
        let status = match file.state {
            FileState::Complete => "ok".to_string(),
            FileState::Failed => format!("FAILED: {}", file.error.as_deref().unwrap_or("unknown error")),
            other => format!("{other:?}"),
        };
        println!("  [{}] {} {:>3}% {}", file.index, file.file_name, file.percent, status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn write_manifest(dir: &std::path::Path, expired_second: bool) -> PathBuf {
        std::fs::write(dir.join("a.txt"), vec![b'a'; 1024]).unwrap();
        std::fs::write(dir.join("b.txt"), vec![b'b'; 2048]).unwrap();

        let expires_at = if expired_second {
            Utc::now() - Duration::minutes(5)
        } else {
            Utc::now() + Duration::minutes(15)
        };
        let manifest = format!(
            r#"
            [[upload]]
            path = "a.txt"
            content_type = "text/plain"
            url = "https://s/a.txt"

            [[upload]]
            path = "b.txt"
            content_type = "text/plain"
            url = "https://s/b.txt"
            expires_at = "{}"
            "#,
            expires_at.to_rfc3339()
        );
        let path = dir.join("manifest.toml");
        std::fs::write(&path, manifest).unwrap();
        path
    }

    fn args(manifest: PathBuf, settle: bool) -> UploadArgs {
        UploadArgs {
            manifest,
            config: None,
            chunk_size: Some(256),
            abort_siblings: false,
            settle,
            json: false,
            dry_run: true,
        }
    }

    #[test]
    fn cli_parses_upload_flags() {
        let cli = Cli::try_parse_from([
            "uplink", "upload", "--manifest", "m.toml", "--settle", "--json", "--abort-siblings",
        ])
        .unwrap();
        let Command::Upload(args) = cli.command;
        assert_eq!(args.manifest, PathBuf::from("m.toml"));
        assert!(args.settle && args.json && args.abort_siblings);
    }

    #[test]
    fn json_requires_settle() {
        assert!(Cli::try_parse_from(["uplink", "upload", "--manifest", "m.toml", "--json"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let mut a = args(PathBuf::from("m.toml"), false);
        a.abort_siblings = true;
        let config = load_config(&a).unwrap();
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.sibling_policy, SiblingPolicy::Abort);
    }

    #[tokio::test]
    async fn dry_run_uploads_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), false);
        assert!(upload(args(manifest, false)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dry_run_settled_reports_expired_target() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), true);

        let report = upload(args(manifest, true)).await.unwrap().unwrap();
        assert_eq!(report.failed_indices(), vec![1]);
        assert_eq!(report.files[0].state, FileState::Complete);
        assert_eq!(report.files[0].percent, 100);
    }

    #[tokio::test]
    async fn dry_run_fail_fast_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), true);

        let err = upload(args(manifest, false)).await.unwrap_err();
        assert!(err.to_string().contains("b.txt"));
    }
}
