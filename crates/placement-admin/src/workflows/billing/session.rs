use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use serde::Serialize;

use super::diff::{lines_from_wire, resolve_lines, DiffLine, LineChange, SimulationResponse};
use super::domain::{
    BillingPlan, BillingPlanId, BillingPlanLineItem, ItemCategory, LineKey, ReviewStatus,
};
use crate::workflows::backend::GatewayError;

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Which view of the plan the operator is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    Normal,
    Diff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Simulate,
    Confirm,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Simulate => f.write_str("simulate"),
            RequestKind::Confirm => f.write_str("confirm"),
        }
    }
}

/// Handle for one outstanding backend request. Responses carrying a ticket the session no
/// longer expects are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    sequence: u64,
    kind: RequestKind,
}

impl RequestTicket {
    fn issue(kind: RequestKind) -> Self {
        Self {
            sequence: REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffView {
    lines: Vec<DiffLine>,
    acceptance: BTreeMap<LineKey, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReviewState {
    Normal,
    Diff(DiffView),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Confirmed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    Applied { lines: usize, different: usize },
    /// The backend returned no items; the previous view is kept.
    Empty,
    /// The response arrived for a request the session no longer waits on.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed { items: Vec<BillingPlanLineItem> },
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("billing plan is not in comparison mode")]
    NotInDiffMode,
    #[error("no line {0} in the current comparison")]
    UnknownLine(LineKey),
    #[error("line {0} matches the stored plan and needs no decision")]
    LineUnchanged(LineKey),
    #[error("a {0} request is already in flight")]
    RequestInFlight(RequestKind),
    #[error("review session is closed")]
    Closed,
    #[error("billing plan was already confirmed in this session")]
    AlreadyConfirmed,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Operator review of one billing plan: normal view, comparison against a simulation,
/// per-line acceptance, and a single confirm.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    plan: BillingPlan,
    state: ReviewState,
    in_flight: Option<RequestTicket>,
    banner: Option<String>,
    lifecycle: Lifecycle,
}

impl ReviewSession {
    pub fn new(plan: BillingPlan) -> Self {
        Self {
            plan,
            state: ReviewState::Normal,
            in_flight: None,
            banner: None,
            lifecycle: Lifecycle::Open,
        }
    }

    pub fn plan(&self) -> &BillingPlan {
        &self.plan
    }

    pub fn mode(&self) -> ReviewMode {
        match self.state {
            ReviewState::Normal => ReviewMode::Normal,
            ReviewState::Diff(_) => ReviewMode::Diff,
        }
    }

    /// Comparison lines; empty outside diff mode.
    pub fn lines(&self) -> &[DiffLine] {
        match &self.state {
            ReviewState::Normal => &[],
            ReviewState::Diff(view) => &view.lines,
        }
    }

    pub fn is_accepted(&self, key: &LineKey) -> bool {
        match &self.state {
            ReviewState::Normal => false,
            ReviewState::Diff(view) => view.acceptance.get(key).copied().unwrap_or(false),
        }
    }

    pub fn accepted_keys(&self) -> Vec<LineKey> {
        match &self.state {
            ReviewState::Normal => Vec::new(),
            ReviewState::Diff(view) => view
                .acceptance
                .iter()
                .filter(|(_, accepted)| **accepted)
                .map(|(key, _)| key.clone())
                .collect(),
        }
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn pending_request(&self) -> Option<RequestKind> {
        self.in_flight.map(|ticket| ticket.kind)
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closed
    }

    fn ensure_open(&self) -> Result<(), ReviewError> {
        match self.lifecycle {
            Lifecycle::Open => Ok(()),
            Lifecycle::Confirmed => Err(ReviewError::AlreadyConfirmed),
            Lifecycle::Closed => Err(ReviewError::Closed),
        }
    }

    fn issue(&mut self, kind: RequestKind) -> Result<RequestTicket, ReviewError> {
        self.ensure_open()?;
        if let Some(pending) = self.in_flight {
            return Err(ReviewError::RequestInFlight(pending.kind));
        }
        let ticket = RequestTicket::issue(kind);
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    /// Returns true when `ticket` is the one outstanding request, releasing it.
    fn settle(&mut self, ticket: RequestTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    pub fn begin_simulation(&mut self) -> Result<RequestTicket, ReviewError> {
        self.issue(RequestKind::Simulate)
    }

    /// Apply a simulation result. Failures keep the current mode and set the banner.
    pub fn finish_simulation(
        &mut self,
        ticket: RequestTicket,
        result: Result<SimulationResponse, GatewayError>,
    ) -> Result<SimulationOutcome, ReviewError> {
        if !self.settle(ticket) {
            return Ok(SimulationOutcome::Stale);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.banner = Some(format!("Simulation failed: {err}"));
                return Err(ReviewError::Gateway(err));
            }
        };

        let items = match response.items {
            Some(items) if !items.is_empty() => items,
            _ => return Ok(SimulationOutcome::Empty),
        };

        let lines = lines_from_wire(items);
        let different = lines.iter().filter(|line| line.is_different()).count();
        let total = lines.len();
        self.state = ReviewState::Diff(DiffView {
            lines,
            acceptance: BTreeMap::new(),
        });
        self.banner = None;

        Ok(SimulationOutcome::Applied {
            lines: total,
            different,
        })
    }

    /// Leave comparison mode, dropping selections and any pending simulation.
    pub fn exit_comparison(&mut self) {
        if matches!(self.in_flight, Some(ticket) if ticket.kind == RequestKind::Simulate) {
            self.in_flight = None;
        }
        self.state = ReviewState::Normal;
    }

    fn diff_view_mut(&mut self) -> Result<&mut DiffView, ReviewError> {
        self.ensure_open()?;
        match &mut self.state {
            ReviewState::Normal => Err(ReviewError::NotInDiffMode),
            ReviewState::Diff(view) => Ok(view),
        }
    }

    pub fn set_accepted(&mut self, key: LineKey, accepted: bool) -> Result<(), ReviewError> {
        let view = self.diff_view_mut()?;
        let line = view
            .lines
            .iter()
            .find(|line| line.key == key)
            .ok_or_else(|| ReviewError::UnknownLine(key.clone()))?;
        if !line.is_different() {
            return Err(ReviewError::LineUnchanged(key));
        }
        view.acceptance.insert(key, accepted);
        Ok(())
    }

    /// Flip the acceptance of one line, returning the new state.
    pub fn toggle(&mut self, key: LineKey) -> Result<bool, ReviewError> {
        let accepted = !self.is_accepted(&key);
        self.set_accepted(key, accepted)?;
        Ok(accepted)
    }

    /// Accept every differing line, replacing earlier selections.
    pub fn accept_all(&mut self) -> Result<usize, ReviewError> {
        let view = self.diff_view_mut()?;
        view.acceptance = view
            .lines
            .iter()
            .filter(|line| line.is_different())
            .map(|line| (line.key.clone(), true))
            .collect();
        Ok(view.acceptance.len())
    }

    /// Items that a confirm would submit right now.
    pub fn resolved_items(&self) -> Vec<BillingPlanLineItem> {
        match &self.state {
            ReviewState::Normal => self.plan.items.clone(),
            ReviewState::Diff(view) => resolve_lines(&view.lines, &view.acceptance),
        }
    }

    pub fn begin_confirm(
        &mut self,
    ) -> Result<(RequestTicket, Vec<BillingPlanLineItem>), ReviewError> {
        let ticket = self.issue(RequestKind::Confirm)?;
        Ok((ticket, self.resolved_items()))
    }

    pub fn finish_confirm(
        &mut self,
        ticket: RequestTicket,
        items: Vec<BillingPlanLineItem>,
        result: Result<(), GatewayError>,
    ) -> Result<ConfirmOutcome, ReviewError> {
        if !self.settle(ticket) {
            return Ok(ConfirmOutcome::Stale);
        }

        if let Err(err) = result {
            self.banner = Some(format!("Confirm failed: {err}"));
            return Err(ReviewError::Gateway(err));
        }

        self.lifecycle = Lifecycle::Confirmed;
        self.banner = None;
        self.plan.items = items.clone();
        self.plan.review_status = ReviewStatus::Reviewed;
        Ok(ConfirmOutcome::Confirmed { items })
    }

    /// End the session; any response still on the way is ignored.
    pub fn close(&mut self) {
        self.lifecycle = Lifecycle::Closed;
        self.in_flight = None;
    }

    pub fn snapshot(&self) -> ReviewSnapshot {
        let resolved = self.resolved_items();
        let resolved_total: Decimal = resolved.iter().map(|item| item.amount).sum();

        let lines = match &self.state {
            ReviewState::Normal => Vec::new(),
            ReviewState::Diff(view) => view
                .lines
                .iter()
                .map(|line| {
                    let accepted = view.acceptance.get(&line.key).copied().unwrap_or(false);
                    LineView {
                        key: line.key.clone(),
                        billing_date: line.template.billing_date,
                        item_category: line.template.item_category.clone(),
                        description: line.template.description.clone(),
                        is_prorated: line.template.is_prorated,
                        change: line.change,
                        delta: line.change.delta(),
                        accepted,
                        resolved_amount: line.change.resolve(accepted),
                    }
                })
                .collect(),
        };

        ReviewSnapshot {
            plan_id: self.plan.id.clone(),
            mode: self.mode(),
            review_status: self.plan.review_status,
            stored_items: self.plan.items.clone(),
            lines,
            resolved_total,
            banner: self.banner.clone(),
            pending_request: self.pending_request(),
        }
    }
}

/// One comparison row as presented to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub key: LineKey,
    pub billing_date: chrono::NaiveDate,
    pub item_category: ItemCategory,
    pub description: String,
    pub is_prorated: bool,
    pub change: LineChange,
    pub delta: Decimal,
    pub accepted: bool,
    pub resolved_amount: Option<Decimal>,
}

/// Serializable state of a review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    pub plan_id: BillingPlanId,
    pub mode: ReviewMode,
    pub review_status: ReviewStatus,
    pub stored_items: Vec<BillingPlanLineItem>,
    pub lines: Vec<LineView>,
    pub resolved_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<RequestKind>,
}
