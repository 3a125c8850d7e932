//! Liveness probes and the stale-connection sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::handle::{ConnectionHandle, OutboundFrame};
use super::registry::ConnectionRegistry;

/// Run the probe loop for one connection.
///
/// Sends a transport ping every `interval` until the connection dies. The
/// client's pong is recorded by the socket reader; staleness is decided by
/// the registry sweep.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, interval: Duration) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);

    loop {
        ticker.tick().await;

        if !handle.is_alive() {
            break;
        }

        if !handle.send(OutboundFrame::Ping) {
            debug!(conn_id = %handle.id, "Ping send failed, marking dead");
            handle.mark_dead();
            break;
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}

/// Spawn the periodic stale-connection sweep.
pub fn spawn_stale_sweeper(
    registry: Arc<ConnectionRegistry>,
    every: Duration,
    threshold: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = registry.sweep_stale(threshold);
                    if !removed.is_empty() {
                        info!(count = removed.len(), "Stale connections removed");
                    }
                }
            }
        }
        debug!("Stale connection sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RealtimeMetrics;
    use consulthub_core::types::UserId;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_sends_pings_until_closed() {
        let registry = ConnectionRegistry::new(8, Arc::new(RealtimeMetrics::new()));
        let (handle, mut rx) = registry.connect(UserId::new(1));
        let task = tokio::spawn(run_heartbeat(handle.clone(), Duration::from_secs(30)));

        assert_eq!(rx.recv().await, Some(OutboundFrame::Ping));
        assert_eq!(rx.recv().await, Some(OutboundFrame::Ping));

        drop(rx);
        task.await.unwrap();
        assert!(!handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_silent_connections() {
        let registry = Arc::new(ConnectionRegistry::new(8, Arc::new(RealtimeMetrics::new())));
        let (_handle, _rx) = registry.connect(UserId::new(1));
        let cancel = CancellationToken::new();
        let task = spawn_stale_sweeper(
            registry.clone(),
            Duration::from_secs(30),
            Duration::from_secs(60),
            cancel.clone(),
        );

        time::sleep(Duration::from_secs(95)).await;
        assert!(!registry.is_online(UserId::new(1)));

        cancel.cancel();
        task.await.unwrap();
    }
}
