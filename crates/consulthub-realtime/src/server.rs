//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use consulthub_core::config::{MessagingConfig, RealtimeConfig};
use consulthub_core::types::UserId;
use consulthub_storage::MessageStore;

use crate::connection::handle::{ConnectionHandle, OutboundFrame};
use crate::connection::heartbeat::{run_heartbeat, spawn_stale_sweeper};
use crate::connection::registry::ConnectionRegistry;
use crate::delivery::service::MessageDeliveryService;
use crate::metrics::RealtimeMetrics;
use crate::router::InboundRouter;
use crate::signaling::relay::SignalingRelay;

/// Central real-time engine that coordinates the registry, signaling and
/// chat delivery.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Signaling relay.
    pub relay: Arc<SignalingRelay>,
    /// Chat delivery.
    pub delivery: Arc<MessageDeliveryService>,
    /// Inbound frame router.
    pub router: Arc<InboundRouter>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    messaging: MessagingConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        messaging: MessagingConfig,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(
            config.channel_buffer_size,
            metrics.clone(),
        ));
        let relay = Arc::new(SignalingRelay::new(registry.clone(), metrics.clone()));
        let delivery = Arc::new(MessageDeliveryService::new(
            registry.clone(),
            store,
            metrics.clone(),
            &messaging,
        ));
        let router = Arc::new(InboundRouter::new(
            registry.clone(),
            relay.clone(),
            delivery.clone(),
            metrics.clone(),
            config.max_message_size,
        ));

        info!("Real-time engine initialized");

        Self {
            registry,
            relay,
            delivery,
            router,
            metrics,
            config,
            messaging,
            shutdown: CancellationToken::new(),
        }
    }

    /// Registers a connection for `user_id`, starts its heartbeat and
    /// flushes any messages queued while the user was offline.
    pub fn connect(&self, user_id: UserId) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundFrame>) {
        let (handle, rx) = self.registry.connect(user_id);
        tokio::spawn(run_heartbeat(handle.clone(), self.config.ping_interval()));
        self.delivery.deliver_queued(user_id);
        (handle, rx)
    }

    /// Removes a connection once its socket closed.
    pub fn disconnect(&self, handle: &ConnectionHandle) {
        handle.mark_dead();
        self.registry.disconnect_connection(handle.user_id, handle.id);
    }

    /// Handles a text frame from a connection.
    pub async fn handle_text(&self, user_id: UserId, raw: &str) {
        self.router.handle_text(user_id, raw).await;
    }

    /// Records a transport-level pong.
    pub fn record_pong(&self, user_id: UserId) {
        self.registry.record_heartbeat(user_id);
    }

    /// Maximum accepted inbound frame size.
    pub fn max_message_size(&self) -> usize {
        self.config.max_message_size
    }

    /// Spawns the stale-connection sweep, the delivery tracking cleanup and
    /// the typing-timer listener. All stop on [`Self::shutdown`].
    pub fn spawn_background(&self) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        tasks.push(spawn_stale_sweeper(
            self.registry.clone(),
            self.config.sweep_interval(),
            self.config.stale_threshold(),
            self.shutdown.child_token(),
        ));

        tasks.push(self.delivery.typing().clone().spawn_registry_listener(
            self.registry.subscribe(),
            self.shutdown.child_token(),
        ));

        let delivery = self.delivery.clone();
        let every = self.messaging.tracking_cleanup_interval();
        let cancel = self.shutdown.child_token();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        delivery.cleanup_expired_tracking();
                    }
                }
            }
            debug!("Delivery tracking cleanup stopped");
        }));

        info!(tasks = tasks.len(), "Real-time background tasks started");
        tasks
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops background tasks, cancels typing timers and closes every
    /// connection.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();
        self.delivery.typing().cancel_all();
        self.registry.close_all();
        info!("Real-time engine shut down");
    }
}
