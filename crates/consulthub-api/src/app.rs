//! Application wiring: builds the engines and services from configuration.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use consulthub_billing::BillingEngine;
use consulthub_core::config::AppConfig;
use consulthub_realtime::RealtimeEngine;
use consulthub_service::{SessionFacade, SessionManager};
use consulthub_storage::{MessageStore, SessionStore, WalletStore};

use crate::state::AppState;

/// Persistence collaborators the core runs against.
#[derive(Clone)]
pub struct Stores {
    /// Session rows.
    pub sessions: Arc<dyn SessionStore>,
    /// Chat messages.
    pub messages: Arc<dyn MessageStore>,
    /// Wallets and ledger.
    pub wallet: Arc<dyn WalletStore>,
}

/// Constructs every component once and wires them together.
pub fn build_state(config: AppConfig, stores: Stores) -> AppState {
    let realtime = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        config.messaging.clone(),
        stores.messages,
    ));

    let manager = SessionManager::new(
        realtime.registry.clone(),
        stores.sessions,
        config.session.clone(),
    );
    let billing = Arc::new(BillingEngine::new(stores.wallet, config.billing.clone()));
    let sessions = SessionFacade::new(manager, billing);

    info!("Application state initialized");

    AppState {
        config: Arc::new(config),
        realtime,
        sessions,
        started_at: Instant::now(),
    }
}

/// Starts the background sweepers. All stop when `cancel` fires.
pub fn spawn_background(state: &AppState, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
    let mut tasks = state.realtime.spawn_background();

    let manager = state.sessions.manager();
    tasks.push(
        manager.spawn_membership_listener(state.realtime.registry.subscribe(), cancel.child_token()),
    );
    tasks.push(manager.spawn_orphan_cleanup(cancel.child_token()));

    info!(tasks = tasks.len(), "Background tasks started");
    tasks
}

/// Cancels billing ticks, typing timers and sweepers, then closes every
/// connection.
pub fn shutdown(state: &AppState, cancel: &CancellationToken) {
    cancel.cancel();
    state.sessions.manager().shutdown();
    state.realtime.shutdown();
}
