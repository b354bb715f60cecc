use anyhow::{Context, Result};
use clap::Parser;
use dream_fetcher::backend::downloader::{Downloader, ProgressMonitor};
use dream_fetcher::backend::utils::config::{DownloaderConfig, VersionSelection};
use dream_fetcher::utils::logging;
use dream_fetcher::{log_info, log_warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Checks a Minecraft installation and downloads whatever it is missing.
#[derive(Debug, Parser)]
#[command(name = "dream-fetcher", version, about)]
struct Args {
    /// Configuration file, created with defaults when missing
    #[arg(short, long, env = "DREAM_FETCHER_CONFIG", default_value = "dream-fetcher.json")]
    config: PathBuf,

    /// Working directory the game files live in
    #[arg(short = 'd', long)]
    dir: Option<PathBuf>,

    /// Pin a version id instead of the latest release
    #[arg(long = "game-version", value_name = "ID", conflicts_with = "snapshot")]
    game_version: Option<String>,

    /// Use the latest snapshot
    #[arg(long)]
    snapshot: bool,

    /// Concurrent transfers
    #[arg(short = 'j', long)]
    pool_size: Option<usize>,

    /// Extra attempts per file after a failure
    #[arg(long)]
    tries: Option<u32>,

    /// Do not refresh version metadata or asset indexes
    #[arg(long)]
    offline: bool,
}

impl Args {
    fn apply(self, mut config: DownloaderConfig) -> DownloaderConfig {
        if let Some(dir) = self.dir {
            config.working_dir = dir;
        }
        if let Some(version) = self.game_version {
            config.selection = VersionSelection::Custom {
                version: Some(version),
            };
        } else if self.snapshot {
            config.selection = VersionSelection::LatestSnapshot;
        }
        if let Some(size) = self.pool_size {
            config.pool_size = size;
        }
        if let Some(tries) = self.tries {
            config.download_tries = tries;
        }
        config.offline |= self.offline;
        config.normalized()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env();
    let args = Args::parse();

    let config = DownloaderConfig::load_or_create(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    let config = args.apply(config);
    log_info!("Working directory: {}", config.working_dir.display());

    let downloader = Downloader::from_config(config)?;
    let cancel = CancellationToken::new();

    let reporter = tokio::spawn(report_progress(downloader.monitor(), cancel.clone()));
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log_warn!("Interrupted, finishing in-flight transfers...");
                cancel.cancel();
            }
        })
    };

    let result = downloader.start_download_with(&cancel).await;
    interrupt.abort();
    reporter.abort();

    let snapshot = downloader.monitor().snapshot();
    if let Err(e) = result {
        let outcome = if e.is_fatal() { "aborted" } else { "failed" };
        return Err(anyhow::Error::new(e).context(format!("download session {outcome}")));
    }
    log_info!(
        "Done: {} of {} bytes in place ({:.1}%)",
        snapshot.downloaded + snapshot.validated,
        snapshot.total,
        snapshot.fraction_percent()
    );
    Ok(())
}

async fn report_progress(monitor: ProgressMonitor, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    let mut last = String::new();

    while !cancel.is_cancelled() {
        ticker.tick().await;
        if !monitor.is_active() {
            continue;
        }
        let line = format!(
            "{:5.1}% {}",
            monitor.current_progress_percent(),
            monitor.current_file_label()
        );
        if line != last {
            log_info!("{line}");
            last = line;
        }
    }
}
