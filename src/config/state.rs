// Application state module
// Shared, read-only runtime state handed to every connection task

use std::sync::atomic::AtomicUsize;
use tokio::sync::watch;

use super::types::Config;
use crate::script::ScriptRunner;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Runs the external script for each create request
    pub runner: ScriptRunner,
    pub active_connections: AtomicUsize,
    /// Flips to `true` once when the process is asked to stop
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            runner: ScriptRunner::new(config.script.clone()),
            active_connections: AtomicUsize::new(0),
            shutdown: watch::Sender::new(false),
        }
    }

    /// Tell the accept loop and every open connection to stop
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once shutdown has been requested, even if that happened first
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so the channel stays open while we wait
        let _ = rx.wait_for(|stopping| *stopping).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_reaches_every_waiter() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        let state = AppState::new(&cfg);

        let pending = tokio::time::timeout(Duration::from_millis(50), state.shutdown_requested()).await;
        assert!(pending.is_err());

        state.request_shutdown();
        let (a, b) = tokio::join!(
            tokio::time::timeout(Duration::from_secs(1), state.shutdown_requested()),
            tokio::time::timeout(Duration::from_secs(1), state.shutdown_requested()),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
    }
}
