//! Headless usage monitor daemon
//!
//! Refreshes on a fixed cadence until interrupted; every cycle rescans the
//! Claude Code logs and rewrites the status file.

use log::{error, info};

use claude_usage_monitor::usage::background::Monitor;
use claude_usage_monitor::usage::config::{default_settings_path, Settings};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = default_settings_path();
    let settings = Settings::load(&settings_path);
    info!(
        "watching {:?}, refreshing every {} minutes, status at {:?}",
        settings.projects_dir(),
        settings.refresh_interval.minutes(),
        settings.status_file_path()
    );

    let monitor = Monitor::new(settings_path);

    // First snapshot right away, then on the ticker
    monitor.refresh().await;
    monitor.start(settings.refresh_interval);

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(e) => error!("failed to listen for shutdown signal: {}", e),
    }
    monitor.shutdown();
}
