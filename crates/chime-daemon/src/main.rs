use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use chime_scheduler::{ChannelWorkQueue, Dispatcher, QueuedTask, SqliteScheduleStore, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chime_daemon=info,chime_scheduler=info".into()),
        )
        .init();

    // load config: explicit path via CHIME_CONFIG env > ~/.chime/chime.toml
    let config_path = std::env::var("CHIME_CONFIG").ok();
    let config = chime_core::ChimeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        chime_core::ChimeConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let store = Arc::new(SqliteScheduleStore::new(conn)?);

    // Dispatched-task channel: Dispatcher → worker task. Bounded, so a stalled
    // worker shows up as deferred dispatches instead of unbounded memory.
    let queue_name = config.scheduler.queue_name.clone();
    let (task_tx, mut task_rx) = tokio::sync::mpsc::channel::<QueuedTask>(256);
    let queue = Arc::new(ChannelWorkQueue::new(task_tx));

    let worker_queue = queue_name.clone();
    let worker = tokio::spawn(async move {
        while let Some(item) = task_rx.recv().await {
            // Reference worker: execution belongs to the host embedding chime.
            info!(
                queue = %item.queue,
                schedule_id = %item.schedule_id,
                task = %item.task,
                "task received for execution"
            );
        }
        info!(queue = %worker_queue, "worker stopped");
    });
    info!(queue = %queue_name, "work queue ready");

    let dispatcher = Dispatcher::new(store, queue, Arc::new(SystemClock));

    let cadence = Duration::from_secs(config.scheduler.time_threshold);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(cadence, shutdown_rx));
    info!(cadence_secs = cadence.as_secs(), "chime daemon running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    dispatcher_task.await?;
    // The dispatcher owned the only sender, so the worker drains and exits.
    worker.await?;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
