// matchday entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the local store
// 4. Build the webhook client
// 5. Create mpsc channels and the application state
// 6. Restore the persisted session and conversations
// 7. Spawn the app logic task
// 8. Run the TUI until the user quits
// 9. Cleanup on exit

use std::sync::Arc;

use matchday::api::WebhookClient;
use matchday::app;
use matchday::config;
use matchday::db;
use matchday::tui;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("matchday starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: predictions={}, timeout={}s",
        config.endpoints.predictions, config.http.timeout_secs
    );

    // 3. Open the local store
    let db_path = config.storage.resolve_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path = db_path.to_string_lossy().into_owned();
    let db = Arc::new(db::Database::open(&db_path).context("failed to open database")?);
    info!("Database opened at {}", db_path);

    // 4. Build the webhook client
    let remote = Arc::new(WebhookClient::from_config(&config).context("failed to build HTTP client")?);

    // 5. Create mpsc channels and the application state
    let (event_tx, event_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let mut app_state = app::AppState::new(config, db, remote, event_tx);

    // 6. Restore the persisted session and conversations
    app_state
        .hydrate(Utc::now())
        .context("failed to restore session")?;
    match app_state.session_info() {
        Some(info) => info!("Restored session for {}", info.email),
        None => info!("No active session; showing login"),
    }

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, event_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 8. Run the TUI event loop (blocking until user quits)
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 9. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("matchday shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("matchday.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("matchday=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
