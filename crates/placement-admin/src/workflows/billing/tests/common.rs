use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::workflows::backend::GatewayError;
use crate::workflows::billing::{
    BillingPlan, BillingPlanGateway, BillingPlanId, BillingPlanLineItem, BillingReviewService,
    DiffLineItem, ItemCategory, LineKey, LineStatus, PlanStatus, ReviewStatus,
    SimulationResponse,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn plan_id() -> BillingPlanId {
    BillingPlanId("plan-7".to_string())
}

pub(super) fn item(
    billing_date: NaiveDate,
    item_category: ItemCategory,
    amount: Decimal,
) -> BillingPlanLineItem {
    BillingPlanLineItem {
        billing_date,
        description: format!("{} {}", item_category, billing_date),
        item_category,
        amount,
        is_prorated: false,
        status: LineStatus::Pending,
    }
}

pub(super) fn service_fee_key() -> LineKey {
    LineKey {
        billing_date: date(2025, 2, 1),
        category: ItemCategory::ServiceFee,
        occurrence: 0,
    }
}

pub(super) fn dormitory_key() -> LineKey {
    LineKey {
        billing_date: date(2025, 2, 1),
        category: ItemCategory::DormitoryFee,
        occurrence: 0,
    }
}

pub(super) fn health_check_key() -> LineKey {
    LineKey {
        billing_date: date(2025, 2, 1),
        category: ItemCategory::HealthCheckFee,
        occurrence: 0,
    }
}

/// Stored plan: service fee 1000 and dormitory fee 500 for February.
pub(super) fn stored_plan(review_status: ReviewStatus) -> BillingPlan {
    BillingPlan {
        id: plan_id(),
        worker_id: Some("W-1042".to_string()),
        status: PlanStatus::Active,
        review_status,
        items: vec![
            item(date(2025, 2, 1), ItemCategory::ServiceFee, dec!(1000)),
            item(date(2025, 2, 1), ItemCategory::DormitoryFee, dec!(500)),
        ],
    }
}

/// Simulation raising the service fee to 1200, keeping the dormitory fee, and adding a
/// 500 health check.
pub(super) fn simulation() -> SimulationResponse {
    let feb = date(2025, 2, 1);
    SimulationResponse {
        items: Some(vec![
            DiffLineItem::annotate(
                &item(feb, ItemCategory::ServiceFee, dec!(1200)),
                Some(dec!(1000)),
            ),
            DiffLineItem::annotate(
                &item(feb, ItemCategory::DormitoryFee, dec!(500)),
                Some(dec!(500)),
            ),
            DiffLineItem::annotate(&item(feb, ItemCategory::HealthCheckFee, dec!(500)), None),
        ]),
    }
}

pub(super) fn amounts(items: &[BillingPlanLineItem]) -> Vec<(ItemCategory, Decimal)> {
    items
        .iter()
        .map(|item| (item.item_category.clone(), item.amount))
        .collect()
}

type ConfirmSideEffect = Box<dyn FnOnce() + Send>;

/// In-memory backend counting calls and recording confirmed item lists.
pub(super) struct FakeGateway {
    plan: Mutex<Option<BillingPlan>>,
    simulation: Mutex<Result<SimulationResponse, GatewayError>>,
    confirm_result: Mutex<Result<(), GatewayError>>,
    simulate_calls: AtomicUsize,
    confirmed: Mutex<Vec<Vec<BillingPlanLineItem>>>,
    during_confirm: Mutex<Option<ConfirmSideEffect>>,
}

impl FakeGateway {
    pub(super) fn new(plan: BillingPlan) -> Self {
        Self {
            plan: Mutex::new(Some(plan)),
            simulation: Mutex::new(Ok(simulation())),
            confirm_result: Mutex::new(Ok(())),
            simulate_calls: AtomicUsize::new(0),
            confirmed: Mutex::new(Vec::new()),
            during_confirm: Mutex::new(None),
        }
    }

    pub(super) fn empty() -> Self {
        let gateway = Self::new(stored_plan(ReviewStatus::Reviewed));
        *gateway.plan.lock().expect("plan mutex poisoned") = None;
        gateway
    }

    pub(super) fn set_simulation(&self, result: Result<SimulationResponse, GatewayError>) {
        *self.simulation.lock().expect("simulation mutex poisoned") = result;
    }

    pub(super) fn set_confirm_result(&self, result: Result<(), GatewayError>) {
        *self.confirm_result.lock().expect("confirm mutex poisoned") = result;
    }

    /// Run `action` while the next confirm request is in flight.
    pub(super) fn during_confirm(&self, action: impl FnOnce() + Send + 'static) {
        *self.during_confirm.lock().expect("confirm mutex poisoned") = Some(Box::new(action));
    }

    pub(super) fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    pub(super) fn confirmed(&self) -> Vec<Vec<BillingPlanLineItem>> {
        self.confirmed.lock().expect("confirmed mutex poisoned").clone()
    }
}

#[async_trait]
impl BillingPlanGateway for FakeGateway {
    async fn fetch_plan(&self, id: &BillingPlanId) -> Result<BillingPlan, GatewayError> {
        self.plan
            .lock()
            .expect("plan mutex poisoned")
            .clone()
            .filter(|plan| &plan.id == id)
            .ok_or(GatewayError::NotFound)
    }

    async fn simulate(&self, _id: &BillingPlanId) -> Result<SimulationResponse, GatewayError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        self.simulation
            .lock()
            .expect("simulation mutex poisoned")
            .clone()
    }

    async fn confirm(
        &self,
        _id: &BillingPlanId,
        items: &[BillingPlanLineItem],
    ) -> Result<(), GatewayError> {
        let side_effect = self.during_confirm.lock().expect("confirm mutex poisoned").take();
        if let Some(action) = side_effect {
            action();
        }
        self.confirm_result
            .lock()
            .expect("confirm mutex poisoned")
            .clone()?;
        self.confirmed
            .lock()
            .expect("confirmed mutex poisoned")
            .push(items.to_vec());
        if let Some(plan) = self.plan.lock().expect("plan mutex poisoned").as_mut() {
            plan.items = items.to_vec();
            plan.review_status = ReviewStatus::Reviewed;
        }
        Ok(())
    }
}

pub(super) fn build_service(
    review_status: ReviewStatus,
) -> (Arc<BillingReviewService<FakeGateway>>, Arc<FakeGateway>) {
    let gateway = Arc::new(FakeGateway::new(stored_plan(review_status)));
    let service = Arc::new(BillingReviewService::new(gateway.clone()));
    (service, gateway)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
