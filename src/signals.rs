//! Process signal handling
//!
//! SIGINT (and SIGTERM on Unix) trigger the same orderly stop as a user
//! request. The watcher runs a small tokio runtime on its own thread.

use anyhow::{Context, Result};
use std::thread;
use tracing::{info, warn};

use crate::app::StopHandle;

/// Spawn the signal watcher thread
pub fn install(handle: StopHandle) -> Result<()> {
    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Signal handling unavailable: {}", e);
                    return;
                }
            };

            let signal = runtime.block_on(wait_for_signal());
            info!("Received {}, shutting down", signal);
            handle.request_stop();
        })
        .context("Failed to spawn signal watcher")?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Cannot listen for SIGTERM: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
