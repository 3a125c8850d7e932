//! Session facade: start, join, leave, end, status and notes flows.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use consulthub_billing::{BillingEngine, PaymentRequest, SessionBillingData};
use consulthub_core::error::{AppError, ErrorKind};
use consulthub_core::result::AppResult;
use consulthub_core::types::{SessionId, UserId};
use consulthub_entity::session::{SessionMetrics, SessionStatus};

use super::manager::SessionManager;
use super::model::{CreateSessionRequest, EndSessionParams};
use super::results::{
    EndBilling, EndSessionRequest, EndSessionResult, JoinResult, SessionStatusView,
    StartSessionResult,
};

/// Orchestration surface over the session manager and billing engine.
#[derive(Clone)]
pub struct SessionFacade {
    manager: SessionManager,
    billing: Arc<BillingEngine>,
}

impl std::fmt::Debug for SessionFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFacade")
            .field("manager", &self.manager)
            .finish()
    }
}

impl SessionFacade {
    /// Creates a new session facade.
    pub fn new(manager: SessionManager, billing: Arc<BillingEngine>) -> Self {
        Self { manager, billing }
    }

    /// Session manager.
    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Billing engine.
    pub fn billing(&self) -> &Arc<BillingEngine> {
        &self.billing
    }

    /// Creates a session; unscheduled sessions are activated right away.
    pub async fn start_session(&self, request: &CreateSessionRequest) -> StartSessionResult {
        if let Err(e) = request.validate() {
            return StartSessionResult::failed(e.message);
        }

        let session = match self.manager.create(request).await {
            Ok(session) => session,
            Err(e) => {
                error!(user_id = %request.user_id, error = %e, "Failed to create session");
                return StartSessionResult::failed(e.message);
            }
        };

        if request.scheduled_time.is_some() {
            return StartSessionResult::started(session);
        }

        match self
            .manager
            .update_status(session.id, SessionStatus::Active)
            .await
        {
            Ok(active) => StartSessionResult::started(active),
            Err(e) => {
                error!(session_id = %session.id, error = %e, "Failed to activate session");
                StartSessionResult::failed(e.message)
            }
        }
    }

    /// Adds a user to an active session.
    pub async fn join_session(&self, session_id: SessionId, user_id: UserId) -> JoinResult {
        let Some(session) = self.manager.get(session_id) else {
            return JoinResult::failed("Session not found");
        };
        if session.participants.contains(&user_id) {
            return JoinResult::failed("User already in session");
        }

        match self.manager.add_participant(session_id, user_id).await {
            Ok(true) => JoinResult::joined(self.manager.participants(session_id).len()),
            Ok(false) => JoinResult::failed("Session participant limit reached"),
            Err(e) => JoinResult::failed(e.message),
        }
    }

    /// Removes a user from an active session.
    pub async fn leave_session(&self, session_id: SessionId, user_id: UserId) -> AppResult<()> {
        if !self.manager.remove_participant(session_id, user_id).await? {
            return Err(AppError::session(format!(
                "User {user_id} is not in session {session_id}"
            )));
        }
        Ok(())
    }

    /// Bills and ends a session.
    ///
    /// Payment happens before the state transition: when it fails the
    /// session stays as it was and can be ended again later.
    pub async fn end_session(
        &self,
        session_id: SessionId,
        request: &EndSessionRequest,
    ) -> EndSessionResult {
        let session = match self.manager.try_claim_end(session_id) {
            Ok(session) => session,
            Err(e) if e.kind == ErrorKind::NotFound => {
                return EndSessionResult::failed("Session not found");
            }
            Err(e) => return EndSessionResult::failed(e.message),
        };

        if !session.involves(request.ended_by) {
            self.manager.release_end_claim(session_id);
            return EndSessionResult::failed("User is not part of this session");
        }

        let mut charge = EndBilling {
            cost: 0.0,
            duration: 0,
            transaction_id: None,
            is_free: session.is_free(),
        };

        if let (SessionStatus::Active, Some(start)) = (session.status, session.actual_start_time) {
            let data = SessionBillingData {
                session_id,
                advisor_id: session.advisor_id,
                user_id: Some(session.user_id),
                start_time: start,
                end_time: Utc::now().max(start + Duration::milliseconds(1)),
                rate_per_minute: session.rate_per_minute,
                session_type: Some(session.session_type),
            };

            let cost = match self.billing.calculate_cost(&data).await {
                Ok(cost) => cost,
                Err(e) => {
                    self.manager.release_end_claim(session_id);
                    error!(session_id = %session_id, error = %e, "Cost calculation failed");
                    return EndSessionResult::failed(format!(
                        "Billing calculation failed: {}",
                        e.message
                    ));
                }
            };
            charge.cost = cost.cost;
            charge.duration = cost.duration;
            charge.is_free = cost.is_free;

            if cost.cost > 0.0 {
                let payment = self
                    .billing
                    .process_payment(&PaymentRequest {
                        session_id,
                        user_id: session.user_id,
                        amount: cost.cost,
                        payment_method: self.billing.payment_method().to_string(),
                    })
                    .await;

                if !payment.success {
                    self.manager.release_end_claim(session_id);
                    let reason = payment
                        .error
                        .unwrap_or_else(|| "unknown error".to_string());
                    warn!(
                        session_id = %session_id,
                        amount = cost.cost,
                        reason = %reason,
                        "Session end refused, payment failed"
                    );
                    return EndSessionResult::failed(format!("Payment processing failed: {reason}"));
                }
                charge.transaction_id = payment.transaction_id;
            }
        }

        let params = EndSessionParams {
            reason: request.reason.clone(),
            notes: request.notes.clone(),
            billed_amount: Some(charge.cost),
            duration: Some(charge.duration),
        };

        match self.manager.end_session(session_id, params).await {
            Ok(billing) => {
                info!(
                    session_id = %session_id,
                    ended_by = %request.ended_by,
                    cost = charge.cost,
                    duration = billing.actual_duration,
                    "Session completed"
                );
                EndSessionResult::completed(EndBilling {
                    duration: billing.actual_duration,
                    ..charge
                })
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to end session");
                EndSessionResult::failed(e.message)
            }
        }
    }

    /// Status of a session, from memory while active and from storage after.
    pub async fn get_status(&self, session_id: SessionId) -> AppResult<SessionStatusView> {
        if let Some(session) = self.manager.get(session_id) {
            let duration = if session.status == SessionStatus::Active {
                session.duration_until(Utc::now())
            } else {
                session.actual_duration.unwrap_or(0)
            };
            return Ok(SessionStatusView {
                id: session.id,
                status: session.status,
                participants: session.participants.iter().copied().collect(),
                started_at: session.started_at,
                duration,
                billing_status: self.billing.get_billing_status(session_id).await?,
                metrics: session.metrics,
            });
        }

        let record = self
            .manager
            .load_record(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;

        Ok(SessionStatusView {
            id: record.id,
            status: record.status,
            participants: Vec::new(),
            started_at: record.started_at,
            duration: record.actual_duration.unwrap_or(0),
            billing_status: self.billing.get_billing_status(session_id).await?,
            metrics: SessionMetrics::default(),
        })
    }

    /// Stores advisor notes. Only the advisor may write them, and not
    /// while the session is active.
    pub async fn update_notes(
        &self,
        session_id: SessionId,
        notes: &str,
        user_id: UserId,
    ) -> AppResult<()> {
        let (advisor_id, status) = match self.manager.get(session_id) {
            Some(session) => (session.advisor_id, session.status),
            None => {
                let record = self
                    .manager
                    .load_record(session_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Session {session_id} not found")))?;
                (record.advisor_id, record.status)
            }
        };

        if advisor_id != user_id {
            return Err(AppError::authorization(
                "Only the advisor can update session notes",
            ));
        }
        if status == SessionStatus::Active {
            return Err(AppError::conflict(
                "Cannot update notes while the session is active",
            ));
        }

        self.manager.update_notes(session_id, notes).await
    }
}
