use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{BillingPlanId, BillingPlanLineItem, LineKey};
use super::gateway::BillingPlanGateway;
use super::session::{
    ConfirmOutcome, ReviewError, ReviewSession, ReviewSnapshot, SimulationOutcome,
};
use crate::workflows::backend::GatewayError;

/// Callback run after a successful confirm instead of reloading the plan.
pub type CompletionHook = Arc<dyn Fn(&BillingPlanId, &[BillingPlanLineItem]) + Send + Sync>;

/// Review sessions keyed by plan, driving the backend gateway outside the session lock.
pub struct BillingReviewService<G> {
    gateway: Arc<G>,
    sessions: Mutex<HashMap<BillingPlanId, ReviewSession>>,
    on_confirmed: Option<CompletionHook>,
}

/// Summary of a successful confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceipt {
    pub plan_id: BillingPlanId,
    pub submitted_items: usize,
    pub submitted_total: Decimal,
    /// The backend accepted the items, but the session was closed or reopened while the
    /// request was in flight, so neither the completion hook nor a reload ran.
    pub session_discarded: bool,
    /// Fresh session state when the plan was reloaded after confirming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reloaded: Option<ReviewSnapshot>,
}

impl<G> BillingReviewService<G>
where
    G: BillingPlanGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            sessions: Mutex::new(HashMap::new()),
            on_confirmed: None,
        }
    }

    pub fn with_completion_hook(mut self, hook: CompletionHook) -> Self {
        self.on_confirmed = Some(hook);
        self
    }

    fn with_session<T>(
        &self,
        id: &BillingPlanId,
        action: impl FnOnce(&mut ReviewSession) -> T,
    ) -> Result<T, ReviewServiceError> {
        let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = guard
            .get_mut(id)
            .ok_or_else(|| ReviewServiceError::SessionNotFound(id.clone()))?;
        Ok(action(session))
    }

    fn install(&self, session: ReviewSession) {
        let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut previous) = guard.insert(session.plan().id.clone(), session) {
            previous.close();
        }
    }

    /// Load the plan and start a session, comparing right away when the plan needs review.
    pub async fn open(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        let plan = self.gateway.fetch_plan(id).await?;
        let needs_review = plan.needs_review();
        info!(plan = %id, items = plan.items.len(), needs_review, "opened billing plan review");
        self.install(ReviewSession::new(plan));

        if needs_review {
            match self.simulate(id).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(ReviewServiceError::Review(ReviewError::Gateway(err))) => {
                    warn!(plan = %id, error = %err, "initial simulation failed");
                }
                Err(other) => return Err(other),
            }
        }

        self.snapshot(id)
    }

    pub fn snapshot(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| session.snapshot())
    }

    /// Enter (or refresh) comparison mode with a fresh simulation.
    pub async fn simulate(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        let ticket = self.with_session(id, ReviewSession::begin_simulation)??;
        let result = self.gateway.simulate(id).await;

        let outcome = match self.with_session(id, |session| session.finish_simulation(ticket, result))
        {
            Ok(outcome) => outcome?,
            Err(err) => {
                debug!(plan = %id, "simulation finished after session ended");
                return Err(err);
            }
        };

        match outcome {
            SimulationOutcome::Applied { lines, different } => {
                info!(plan = %id, lines, different, "billing plan simulation applied");
            }
            SimulationOutcome::Empty => {
                info!(plan = %id, "simulation returned no items; keeping current view");
            }
            SimulationOutcome::Stale => {
                debug!(plan = %id, "discarded stale simulation response");
            }
        }

        self.snapshot(id)
    }

    pub fn exit_comparison(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| {
            session.exit_comparison();
            session.snapshot()
        })
    }

    pub fn toggle(
        &self,
        id: &BillingPlanId,
        key: LineKey,
    ) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| {
            session.toggle(key)?;
            Ok(session.snapshot())
        })?
    }

    pub fn set_accepted(
        &self,
        id: &BillingPlanId,
        key: LineKey,
        accepted: bool,
    ) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| {
            session.set_accepted(key, accepted)?;
            Ok(session.snapshot())
        })?
    }

    pub fn accept_all(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| {
            session.accept_all()?;
            Ok(session.snapshot())
        })?
    }

    pub fn dismiss_error(&self, id: &BillingPlanId) -> Result<ReviewSnapshot, ReviewServiceError> {
        self.with_session(id, |session| {
            session.dismiss_banner();
            session.snapshot()
        })
    }

    /// Drop the session; late responses for it are discarded.
    pub fn close(&self, id: &BillingPlanId) -> Result<(), ReviewServiceError> {
        let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = guard
            .remove(id)
            .ok_or_else(|| ReviewServiceError::SessionNotFound(id.clone()))?;
        session.close();
        debug!(plan = %id, "closed billing plan review");
        Ok(())
    }

    /// Submit the resolved items. On success the completion hook runs, or the plan is reloaded.
    pub async fn confirm(&self, id: &BillingPlanId) -> Result<ConfirmReceipt, ReviewServiceError> {
        let (ticket, items) = self.with_session(id, ReviewSession::begin_confirm)??;
        let result = self.gateway.confirm(id, &items).await;

        let failure = result.as_ref().err().cloned();

        let outcome = self.with_session(id, |session| {
            session.finish_confirm(ticket, items.clone(), result)
        });
        let items = match outcome {
            Ok(Ok(ConfirmOutcome::Confirmed { items })) => items,
            Ok(Err(err)) => return Err(err.into()),
            Ok(Ok(ConfirmOutcome::Stale)) | Err(ReviewServiceError::SessionNotFound(_)) => {
                if let Some(err) = failure {
                    return Err(err.into());
                }
                // The backend already holds these items; only the local session is gone.
                warn!(plan = %id, items = items.len(), "confirm succeeded after session ended");
                return Ok(receipt(id, &items, true, None));
            }
            Err(other) => return Err(other),
        };

        info!(plan = %id, items = items.len(), "billing plan confirmed");

        let reloaded = match &self.on_confirmed {
            Some(hook) => {
                hook(id, &items);
                let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
                guard.remove(id);
                None
            }
            None => self.reload(id).await,
        };

        Ok(receipt(id, &items, false, reloaded))
    }

    async fn reload(&self, id: &BillingPlanId) -> Option<ReviewSnapshot> {
        match self.gateway.fetch_plan(id).await {
            Ok(plan) => {
                let session = ReviewSession::new(plan);
                let snapshot = session.snapshot();
                self.install(session);
                Some(snapshot)
            }
            Err(err) => {
                warn!(plan = %id, error = %err, "reload after confirm failed");
                let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
                guard.remove(id);
                None
            }
        }
    }
}

fn receipt(
    id: &BillingPlanId,
    items: &[BillingPlanLineItem],
    session_discarded: bool,
    reloaded: Option<ReviewSnapshot>,
) -> ConfirmReceipt {
    ConfirmReceipt {
        plan_id: id.clone(),
        submitted_items: items.len(),
        submitted_total: items.iter().map(|item| item.amount).sum(),
        session_discarded,
        reloaded,
    }
}

/// Error raised by the billing review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("no open review session for billing plan {0}")]
    SessionNotFound(BillingPlanId),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
