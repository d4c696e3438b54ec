//! standup-nudge daemon.
//!
//! Usage:
//!   standup-nudge [CONFIG]              watch every stored group
//!   standup-nudge init-config [PATH]    write a default config file

use anyhow::Context;
use standup_nudge::app_dirs;
use standup_nudge::calendar::WorkingDays;
use standup_nudge::channels::sender_from_config;
use standup_nudge::config::LoggingConfig;
use standup_nudge::deadline::LocaleDeadlineParser;
use standup_nudge::i18n::Catalog;
use standup_nudge::store::SqliteStore;
use standup_nudge::{Engine, EngineSettings, GroupFeed, NudgeConfig, WatchContext, WatcherPool};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("init-config") => {
            let path = args
                .next()
                .map(PathBuf::from)
                .unwrap_or_else(NudgeConfig::default_config_path);
            init_config(path)
        }
        Some(path) => run(load_config(Some(PathBuf::from(path)))?).await,
        None => run(load_config(None)?).await,
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<NudgeConfig> {
    match path {
        Some(path) => NudgeConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => {
            let default_path = NudgeConfig::default_config_path();
            if default_path.exists() {
                NudgeConfig::from_file(&default_path)
                    .with_context(|| format!("loading config from {}", default_path.display()))
            } else {
                Ok(NudgeConfig::default())
            }
        }
    }
}

fn init_config(path: PathBuf) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    NudgeConfig::default()
        .save_to_file(&path)
        .with_context(|| format!("writing config to {}", path.display()))?;
    eprintln!("Wrote default config to {}", path.display());
    Ok(())
}

/// Install the stderr subscriber, plus a daily-rotated file when enabled.
///
/// The returned guard must stay alive for file output to be flushed.
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = if config.file {
        let appender = tracing_appender::rolling::daily(app_dirs::logs_dir(), "standup-nudge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    guard
}

async fn run(config: NudgeConfig) -> anyhow::Result<()> {
    let _log_guard = init_tracing(&config.logging);
    info!("standup-nudge v{} starting", env!("CARGO_PKG_VERSION"));

    let db_path = config.storage.resolved_db_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?,
    );
    info!(path = %db_path.display(), "standup store opened");

    let engine = Engine::new(
        EngineSettings::from_config(&config.watch),
        Arc::new(LocaleDeadlineParser::default()),
        Arc::new(Catalog::new(&config.locale.default_language)),
    );
    let ctx = WatchContext::new(
        engine,
        store.clone(),
        store.clone(),
        sender_from_config(&config.telegram),
    )
    .with_window(Arc::new(WorkingDays::new(config.watch.working_days.clone())))
    .with_tick_interval(Duration::from_secs(config.watch.tick_interval_secs))
    .with_utc_fallback(config.watch.utc_fallback);

    let (stopped_tx, stopped_rx) = mpsc::unbounded_channel();
    let pool = WatcherPool::new(ctx).with_stop_notifier(stopped_tx);
    let feed_cancel = CancellationToken::new();
    let requests = GroupFeed::new(store, Duration::from_secs(config.watch.feed_poll_secs))
        .with_stop_events(stopped_rx)
        .spawn(feed_cancel.clone());

    let watching = pool.start_watching(requests);
    tokio::pin!(watching);

    tokio::select! {
        () = &mut watching => {
            info!("group feed ended");
            return Ok(());
        }
        result = tokio::signal::ctrl_c() => {
            result.context("listening for Ctrl+C")?;
            info!("received Ctrl+C, shutting down...");
        }
    }

    // Closing the feed ends the request stream; the pool then stops its watchers.
    feed_cancel.cancel();
    watching.await;
    info!("standup-nudge stopped");
    Ok(())
}
