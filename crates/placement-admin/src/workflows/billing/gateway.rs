use async_trait::async_trait;

use super::diff::SimulationResponse;
use super::domain::{BillingPlan, BillingPlanId, BillingPlanLineItem};
use crate::workflows::backend::GatewayError;

/// Billing plan endpoints of the backend, abstracted so the review flow can run against fakes.
#[async_trait]
pub trait BillingPlanGateway: Send + Sync {
    async fn fetch_plan(&self, id: &BillingPlanId) -> Result<BillingPlan, GatewayError>;

    /// Recalculate the plan without mutating it.
    async fn simulate(&self, id: &BillingPlanId) -> Result<SimulationResponse, GatewayError>;

    /// Persist the operator-resolved items and mark the plan reviewed.
    async fn confirm(
        &self,
        id: &BillingPlanId,
        items: &[BillingPlanLineItem],
    ) -> Result<(), GatewayError>;
}
