//! Session manager: state machine, participants and billing ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use consulthub_core::config::SessionConfig;
use consulthub_core::error::AppError;
use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, UserId};
use consulthub_entity::session::{
    NewSession, SessionBilling, SessionEnd, SessionPatch, SessionRecord, SessionStatus,
};
use consulthub_realtime::message::builder::{build_membership, build_session_update};
use consulthub_realtime::{ConnectionRegistry, Envelope, MessageType, RegistryEvent};
use consulthub_storage::SessionStore;

use super::model::{ActiveSession, CreateSessionRequest, EndSessionParams, SessionStats};
use super::ticker::{BillingTicks, TickGuard};

/// End reason recorded when a session lost every connected participant.
pub const ORPHANED_CLEANUP: &str = "orphaned_cleanup";

/// Closing note recorded by orphan cleanup.
pub const ORPHANED_CLEANUP_NOTE: &str = "Session cleaned up due to no connected participants";

/// Owns the in-memory table of active sessions.
///
/// Every session is mirrored to the [`SessionStore`]; the in-memory entry
/// is removed on completion and the persisted row remains as the record.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionId, ActiveSession>>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn SessionStore>,
    ticks: Arc<BillingTicks>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active_sessions", &self.sessions.len())
            .field("billing_ticks", &self.ticks.len())
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            registry,
            store,
            ticks: Arc::new(BillingTicks::new()),
            config,
        }
    }

    /// Persists a new session, then mirrors it into memory.
    ///
    /// Unscheduled sessions attach the client and advisor immediately and
    /// start out `connecting`; scheduled ones have no participants yet.
    pub async fn create(&self, request: &CreateSessionRequest) -> AppResult<ActiveSession> {
        request.validate()?;

        let now = Utc::now();
        let scheduled = request.scheduled_time.is_some();
        let new_session = NewSession {
            user_id: request.user_id,
            advisor_id: request.advisor_id,
            session_type: request.session_type,
            status: if scheduled {
                SessionStatus::Scheduled
            } else {
                SessionStatus::Connecting
            },
            rate_per_minute: request.rate_per_minute.unwrap_or(0.0),
            scheduled_time: request.scheduled_time,
            created_at: now,
            started_at: (!scheduled).then_some(now),
        };

        let record = self.store.create_session(&new_session).await?;
        let mut session = ActiveSession::from_record(record);
        let id = session.id;

        if !scheduled {
            session.record_join(request.user_id, now);
            session.record_join(request.advisor_id, now);
        }
        if !scheduled {
            self.attach(id, &[request.user_id, request.advisor_id]);
        }
        self.sessions.insert(id, session.clone());

        info!(
            session_id = %id,
            user_id = %request.user_id,
            advisor_id = %request.advisor_id,
            session_type = %request.session_type,
            status = %session.status,
            "Session created"
        );

        Ok(session)
    }

    /// Moves a session to a new status.
    ///
    /// Becoming `active` records the billing start and arms the billing
    /// tick. Ending goes through [`Self::end_session`].
    pub async fn update_status(
        &self,
        session_id: SessionId,
        status: SessionStatus,
    ) -> AppResult<ActiveSession> {
        let now = Utc::now();
        let (snapshot, started) = {
            let mut entry = self
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;

            let current = entry.status;
            if current == status {
                return Ok(entry.value().clone());
            }
            if !can_transition(current, status) {
                return Err(AppError::conflict(format!(
                    "Cannot move session {session_id} from {current} to {status}"
                )));
            }

            let attach = current == SessionStatus::Scheduled;
            if attach && entry.occupied_seats() > self.config.max_participants {
                return Err(AppError::conflict(format!(
                    "Session {session_id} exceeds the participant limit of {}",
                    self.config.max_participants
                )));
            }

            entry.status = status;
            if attach {
                let (user_id, advisor_id) = (entry.user_id, entry.advisor_id);
                entry.record_join(user_id, now);
                entry.record_join(advisor_id, now);
                if entry.started_at.is_none() {
                    entry.started_at = Some(now);
                }
                self.attach(session_id, &[user_id, advisor_id]);
            }

            let started = status == SessionStatus::Active && entry.actual_start_time.is_none();
            if started {
                entry.actual_start_time = Some(now);
                entry.active_since = Some(Instant::now());
            }
            (entry.value().clone(), started)
        };

        if started {
            self.start_billing_tick(session_id);
        }

        let patch = SessionPatch {
            status: Some(status),
            actual_start_time: started.then_some(now),
            ..SessionPatch::default()
        };
        if let Err(e) = self.store.update_session(session_id, &patch).await {
            warn!(session_id = %session_id, error = %e, "Failed to persist status change");
        }

        let update = build_session_update(
            session_id,
            status,
            snapshot.participants.iter().copied().collect(),
            snapshot.actual_duration,
        );
        self.notify_members(session_id, &update, None);

        info!(session_id = %session_id, status = %status, "Session status updated");
        Ok(snapshot)
    }

    /// Adds a participant. Returns `false` once the session is full.
    ///
    /// A scheduled session keeps seats for its client and advisor, who
    /// attach when it opens.
    pub async fn add_participant(&self, session_id: SessionId, user_id: UserId) -> AppResult<bool> {
        {
            let mut entry = self
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;

            if entry.participants.contains(&user_id) {
                return Ok(true);
            }
            let reserved = entry.status == SessionStatus::Scheduled
                && (user_id == entry.user_id || user_id == entry.advisor_id);
            if !reserved && entry.occupied_seats() >= self.config.max_participants {
                warn!(
                    session_id = %session_id,
                    user_id = %user_id,
                    limit = self.config.max_participants,
                    "Participant limit reached"
                );
                return Ok(false);
            }
            entry.record_join(user_id, Utc::now());
            self.registry.join_session(user_id, session_id);
        }

        self.notify_members(
            session_id,
            &build_membership(MessageType::SessionJoin, session_id, user_id),
            Some(user_id),
        );

        info!(session_id = %session_id, user_id = %user_id, "Participant joined");
        Ok(true)
    }

    /// Removes a participant. Returns `false` if the user was not one.
    pub async fn remove_participant(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> AppResult<bool> {
        {
            let mut entry = self
                .sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;

            if !entry.participants.contains(&user_id) {
                return Ok(false);
            }
            entry.record_leave(user_id, Utc::now());
            self.registry.leave_session(user_id, session_id);
        }

        self.notify_members(
            session_id,
            &build_membership(MessageType::SessionLeave, session_id, user_id),
            None,
        );

        info!(session_id = %session_id, user_id = %user_id, "Participant left");
        Ok(true)
    }

    /// Ends a session and removes it from memory.
    ///
    /// The billing tick is cancelled before anything else, and an in-flight
    /// tick is awaited so it cannot overwrite the final figures. If the
    /// store fails, the locally computed billing is returned.
    pub async fn end_session(
        &self,
        session_id: SessionId,
        params: EndSessionParams,
    ) -> AppResult<SessionBilling> {
        let (_, mut session) = self
            .sessions
            .remove(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        if let Some(gate) = self.ticks.cancel(session_id) {
            drop(gate.lock().await);
        }

        let end_time = Utc::now();
        let duration = params
            .duration
            .unwrap_or_else(|| session.duration_until(end_time));
        let billed_amount = params
            .billed_amount
            .unwrap_or_else(|| session.cost_for(duration));

        session.status = SessionStatus::Completed;
        session.actual_end_time = Some(end_time);
        session.actual_duration = Some(duration);
        session.billed_amount = Some(billed_amount);

        let update = build_session_update(
            session_id,
            SessionStatus::Completed,
            session.participants.iter().copied().collect(),
            Some(duration),
        );
        for user_id in self.registry.remove_session(session_id) {
            self.registry.send(user_id, &update);
        }

        let end = SessionEnd {
            end_reason: params.reason.clone(),
            notes: params.notes,
            actual_end_time: end_time,
            actual_duration: duration,
            billed_amount,
        };

        match self.store.end_session(session_id, &end).await {
            Ok(billing) => {
                info!(
                    session_id = %session_id,
                    reason = %params.reason,
                    duration,
                    billed_amount = billing.billed_amount,
                    "Session ended"
                );
                Ok(billing)
            }
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    error = %e,
                    duration,
                    billed_amount,
                    "Failed to persist session end, using local billing"
                );
                Ok(SessionBilling {
                    billed_amount,
                    actual_duration: duration,
                })
            }
        }
    }

    /// Ends every session that no connected user belongs to.
    ///
    /// Scheduled sessions and sessions already being ended are skipped.
    pub async fn cleanup_orphaned_sessions(&self) -> Vec<SessionId> {
        let candidates: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.status != SessionStatus::Scheduled && !entry.end_claimed)
            .map(|entry| *entry.key())
            .collect();

        let mut ended = Vec::new();
        for session_id in candidates {
            if !self.registry.users_in_session(session_id).is_empty() {
                continue;
            }
            if self.try_claim_end(session_id).is_err() {
                continue;
            }

            let params = EndSessionParams {
                reason: ORPHANED_CLEANUP.to_string(),
                notes: Some(ORPHANED_CLEANUP_NOTE.to_string()),
                ..EndSessionParams::default()
            };
            match self.end_session(session_id, params).await {
                Ok(_) => ended.push(session_id),
                Err(e) => {
                    self.release_end_claim(session_id);
                    warn!(session_id = %session_id, error = %e, "Orphan cleanup failed");
                }
            }
        }

        if !ended.is_empty() {
            info!(count = ended.len(), "Orphaned sessions cleaned up");
        }
        ended
    }

    /// Marks a session as being ended by the caller.
    ///
    /// Fails with a conflict if another caller already holds the claim.
    pub fn try_claim_end(&self, session_id: SessionId) -> AppResult<ActiveSession> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        if entry.end_claimed {
            return Err(AppError::conflict(format!(
                "Session {session_id} is already ending"
            )));
        }
        entry.end_claimed = true;
        Ok(entry.value().clone())
    }

    /// Gives up an end claim, e.g. after a failed payment.
    pub fn release_end_claim(&self, session_id: SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.end_claimed = false;
        }
    }

    /// Snapshot of an active session.
    pub fn get(&self, session_id: SessionId) -> Option<ActiveSession> {
        self.sessions.get(&session_id).map(|entry| entry.value().clone())
    }

    /// Persisted row of a session, active or not.
    pub async fn load_record(&self, session_id: SessionId) -> AppResult<Option<SessionRecord>> {
        self.store.get_session(session_id).await
    }

    /// All active sessions, by id.
    pub fn all_active(&self) -> Vec<ActiveSession> {
        self.collect(|_| true)
    }

    /// Active sessions the user is the client of or participates in.
    pub fn user_sessions(&self, user_id: UserId) -> Vec<ActiveSession> {
        self.collect(|session| session.user_id == user_id || session.participants.contains(&user_id))
    }

    /// Active sessions led by an advisor.
    pub fn advisor_sessions(&self, advisor_id: UserId) -> Vec<ActiveSession> {
        self.collect(|session| session.advisor_id == advisor_id)
    }

    /// Whether a user is a participant of an active session.
    pub fn is_participant(&self, session_id: SessionId, user_id: UserId) -> bool {
        self.sessions
            .get(&session_id)
            .is_some_and(|entry| entry.participants.contains(&user_id))
    }

    /// Participants of an active session, in ascending id order.
    pub fn participants(&self, session_id: SessionId) -> Vec<UserId> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.participants.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Stores advisor notes on the session row and the in-memory entry.
    pub async fn update_notes(&self, session_id: SessionId, notes: &str) -> AppResult<()> {
        if let Some(mut entry) = self.sessions.get_mut(&session_id) {
            entry.notes = Some(notes.to_string());
        }

        let patch = SessionPatch {
            notes: Some(notes.to_string()),
            ..SessionPatch::default()
        };
        self.store
            .update_session(session_id, &patch)
            .await?
            .ok_or_else(|| session_not_found(session_id))?;

        debug!(session_id = %session_id, "Session notes updated");
        Ok(())
    }

    /// Totals over the active sessions.
    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        let mut duration_sum = 0i64;
        let mut with_duration = 0usize;

        for entry in self.sessions.iter() {
            stats.total_active += 1;
            *stats
                .by_status
                .entry(entry.status.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_type
                .entry(entry.session_type.as_str().to_string())
                .or_default() += 1;
            if let Some(duration) = entry.actual_duration {
                duration_sum += duration;
                with_duration += 1;
            }
            stats.total_billed += entry.billed_amount.unwrap_or(0.0);
        }

        if with_duration > 0 {
            stats.average_duration = duration_sum as f64 / with_duration as f64;
        }
        stats
    }

    /// Number of live billing ticks.
    pub fn active_ticks(&self) -> usize {
        self.ticks.len()
    }

    /// Re-adds a reconnected user to the registry membership of every
    /// session they participate in. Returns how many were restored.
    pub fn restore_memberships(&self, user_id: UserId) -> usize {
        let session_ids: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.participants.contains(&user_id))
            .map(|entry| *entry.key())
            .collect();

        let restored = session_ids
            .into_iter()
            .filter(|session_id| {
                self.sessions.get(session_id).is_some_and(|entry| {
                    entry.participants.contains(&user_id)
                        && self.registry.join_session(user_id, *session_id)
                })
            })
            .count();
        if restored > 0 {
            debug!(user_id = %user_id, sessions = restored, "Session memberships restored");
        }
        restored
    }

    /// Listens for registry connects and restores memberships.
    pub fn spawn_membership_listener(
        &self,
        mut events: broadcast::Receiver<RegistryEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(RegistryEvent::Connected { user_id }) => {
                            manager.restore_memberships(user_id);
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Session membership listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Session membership listener stopped");
        })
    }

    /// Periodically ends orphaned sessions until cancelled.
    pub fn spawn_orphan_cleanup(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = self.clone();
        let every = self.config.orphan_cleanup_interval().max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        manager.cleanup_orphaned_sessions().await;
                    }
                }
            }
            debug!("Orphan cleanup stopped");
        })
    }

    /// Cancels every billing tick.
    pub fn shutdown(&self) {
        self.ticks.cancel_all();
        info!(active_sessions = self.sessions.len(), "Session manager shut down");
    }

    fn collect(&self, keep: impl Fn(&ActiveSession) -> bool) -> Vec<ActiveSession> {
        let mut sessions: Vec<ActiveSession> = self
            .sessions
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by_key(|session| session.id);
        sessions
    }

    fn attach(&self, session_id: SessionId, users: &[UserId]) {
        for user_id in users {
            self.registry.join_session(*user_id, session_id);
        }
    }

    fn notify_members(&self, session_id: SessionId, envelope: &Envelope, excluding: Option<UserId>) {
        for user_id in self.registry.users_in_session(session_id) {
            if Some(user_id) != excluding {
                self.registry.send(user_id, envelope);
            }
        }
    }

    fn start_billing_tick(&self, session_id: SessionId) {
        let Some(guard) = self.ticks.arm(session_id) else {
            return;
        };
        let period = self.config.billing_tick().max(Duration::from_secs(1));
        tokio::spawn(run_billing_tick(
            self.sessions.clone(),
            self.store.clone(),
            session_id,
            period,
            guard,
        ));
        debug!(session_id = %session_id, period_secs = period.as_secs(), "Billing tick armed");
    }
}

fn can_transition(from: SessionStatus, to: SessionStatus) -> bool {
    matches!(
        (from, to),
        (SessionStatus::Connecting, SessionStatus::Active)
            | (SessionStatus::Scheduled, SessionStatus::Active)
            | (SessionStatus::Scheduled, SessionStatus::Connecting)
    )
}

fn session_not_found(session_id: SessionId) -> AppError {
    AppError::not_found(format!("Session {session_id} not found"))
}

/// Recomputes the running duration and cost every `period` and persists it.
async fn run_billing_tick(
    sessions: Arc<DashMap<SessionId, ActiveSession>>,
    store: Arc<dyn SessionStore>,
    session_id: SessionId,
    period: Duration,
    guard: TickGuard,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = guard.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let _gate = guard.gate.lock().await;
        if guard.cancel.is_cancelled() {
            break;
        }

        let patch = {
            let Some(mut session) = sessions.get_mut(&session_id) else {
                break;
            };
            if session.status != SessionStatus::Active {
                break;
            }
            let Some(minutes) = session.elapsed_minutes(Instant::now()) else {
                break;
            };
            let amount = session.cost_for(minutes);
            session.actual_duration = Some(minutes);
            session.billed_amount = Some(amount);
            SessionPatch {
                actual_duration: Some(minutes),
                billed_amount: Some(amount),
                ..SessionPatch::default()
            }
        };

        debug!(
            session_id = %session_id,
            duration = ?patch.actual_duration,
            billed_amount = ?patch.billed_amount,
            "Billing tick"
        );
        if let Err(e) = store.update_session(session_id, &patch).await {
            warn!(session_id = %session_id, error = %e, "Failed to persist running cost");
        }
    }
    debug!(session_id = %session_id, "Billing tick stopped");
}
