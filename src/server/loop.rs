// Server loop module
// Accepts connections until shutdown is signalled, then drains open ones

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Poll interval while waiting for open connections on shutdown
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop on `listener` until shutdown is requested.
///
/// Connection tasks are spawned with `spawn_local`, so this must run inside
/// a `LocalSet`.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = state.shutdown_requested() => {
                logger::log_shutdown(state.active_connections.load(Ordering::SeqCst));
                break;
            }
        }
    }

    // Stop accepting before waiting on in-flight requests
    drop(listener);
    drain_connections(&state).await;
    Ok(())
}

/// Wait for open connections to finish, up to `performance.shutdown_timeout`
///
/// Each connection task sees the same shutdown request and closes once its
/// in-flight response is written.
async fn drain_connections(state: &AppState) {
    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(state.config.performance.shutdown_timeout);

    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 {
            logger::log_info("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown timeout reached with {active} connection(s) still open"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
