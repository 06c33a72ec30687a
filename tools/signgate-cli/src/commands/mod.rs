pub mod capture;
pub mod config;
pub mod info;
pub mod recognize;
pub mod score;
pub mod validate;

use signgate_capture_engine::StopHandle;

/// Stop the session on the first Ctrl+C.
pub fn stop_on_ctrl_c(stop: StopHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping session");
            stop.stop();
        }
    });
}
