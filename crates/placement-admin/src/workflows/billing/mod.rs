//! Billing plan review: compare a stored plan with a backend simulation, let the operator
//! accept individual changes, and confirm the resolved schedule.
//!
//! Lines are identified by [`LineKey`] rather than list position, so selections survive a
//! re-simulation that reorders or inserts lines.

pub mod diff;
pub mod domain;
pub mod export;
pub mod gateway;
pub mod router;
pub mod schedule;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use diff::{
    lines_from_wire, reconcile, resolve_lines, DiffLine, DiffLineItem, LineChange, LineTemplate,
    Reconciliation, SimulationResponse,
};
pub use domain::{
    BillingPlan, BillingPlanId, BillingPlanLineItem, ItemCategory, LineKey, LineKeyError,
    LineStatus, PlanStatus, ReviewStatus,
};
pub use export::{write_csv, ExportError};
pub use gateway::BillingPlanGateway;
pub use router::billing_review_router;
pub use schedule::{generate_plan, prorate, DeploymentContract, FeeSchedule, ScheduleError};
pub use service::{BillingReviewService, CompletionHook, ConfirmReceipt, ReviewServiceError};
pub use session::{
    ConfirmOutcome, LineView, RequestKind, RequestTicket, ReviewError, ReviewMode,
    ReviewSession, ReviewSnapshot, SimulationOutcome,
};
