use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use placement_admin::workflows::backend::GatewayError;
use placement_admin::workflows::billing::{
    generate_plan, reconcile, BillingPlan, BillingPlanGateway, BillingPlanId,
    BillingPlanLineItem, DeploymentContract, PlanStatus, ReviewStatus, ScheduleError,
    SimulationResponse,
};
use placement_admin::workflows::leads::{
    ConvertLeadPayload, EmployerRecord, LeadGateway, LeadId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Clone)]
struct StoredPlan {
    plan: BillingPlan,
    contract: DeploymentContract,
}

/// Backend stand-in: plans are regenerated from their current contract on simulate.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBackend {
    plans: Arc<Mutex<HashMap<BillingPlanId, StoredPlan>>>,
    employers: Arc<Mutex<HashMap<String, EmployerRecord>>>,
    employer_sequence: Arc<AtomicU64>,
}

impl InMemoryBackend {
    /// Store a plan generated from `contract` and return its id.
    pub(crate) fn insert_contract(
        &self,
        id: BillingPlanId,
        contract: DeploymentContract,
    ) -> Result<BillingPlanId, ScheduleError> {
        let items = generate_plan(&contract)?;
        let plan = BillingPlan {
            id: id.clone(),
            worker_id: Some(contract.worker_id.clone()),
            status: PlanStatus::Active,
            review_status: ReviewStatus::Reviewed,
            items,
        };
        let mut guard = self.plans.lock().expect("plan mutex poisoned");
        guard.insert(id.clone(), StoredPlan { plan, contract });
        Ok(id)
    }

    /// Change the contract behind a plan and flag the plan for review.
    pub(crate) fn amend_contract(
        &self,
        id: &BillingPlanId,
        change: impl FnOnce(&mut DeploymentContract),
    ) -> bool {
        let mut guard = self.plans.lock().expect("plan mutex poisoned");
        match guard.get_mut(id) {
            Some(stored) => {
                change(&mut stored.contract);
                stored.plan.review_status = ReviewStatus::NeedsReview;
                true
            }
            None => false,
        }
    }

    pub(crate) fn plan(&self, id: &BillingPlanId) -> Option<BillingPlan> {
        let guard = self.plans.lock().expect("plan mutex poisoned");
        guard.get(id).map(|stored| stored.plan.clone())
    }
}

#[async_trait]
impl BillingPlanGateway for InMemoryBackend {
    async fn fetch_plan(&self, id: &BillingPlanId) -> Result<BillingPlan, GatewayError> {
        self.plan(id).ok_or(GatewayError::NotFound)
    }

    async fn simulate(&self, id: &BillingPlanId) -> Result<SimulationResponse, GatewayError> {
        let stored = {
            let guard = self.plans.lock().expect("plan mutex poisoned");
            guard.get(id).cloned().ok_or(GatewayError::NotFound)?
        };

        let simulated = generate_plan(&stored.contract)
            .map_err(|err| GatewayError::Rejected(err.to_string()))?;
        let reconciliation = reconcile(&stored.plan.items, &simulated);
        if !reconciliation.retired.is_empty() {
            debug!(
                plan = %id,
                retired = reconciliation.retired.len(),
                "simulation drops stored lines"
            );
        }

        Ok(SimulationResponse {
            items: Some(reconciliation.lines),
        })
    }

    async fn confirm(
        &self,
        id: &BillingPlanId,
        items: &[BillingPlanLineItem],
    ) -> Result<(), GatewayError> {
        let mut guard = self.plans.lock().expect("plan mutex poisoned");
        let stored = guard.get_mut(id).ok_or(GatewayError::NotFound)?;
        stored.plan.items = items.to_vec();
        stored.plan.review_status = ReviewStatus::Reviewed;
        Ok(())
    }
}

#[async_trait]
impl LeadGateway for InMemoryBackend {
    async fn convert(
        &self,
        id: &LeadId,
        payload: &ConvertLeadPayload,
    ) -> Result<EmployerRecord, GatewayError> {
        let mut guard = self.employers.lock().expect("employer mutex poisoned");
        if guard.contains_key(&payload.tax_id) {
            return Err(GatewayError::Rejected(format!(
                "tax id {} is already registered",
                payload.tax_id
            )));
        }

        let sequence = self.employer_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = EmployerRecord {
            id: format!("EMP-{sequence:04}"),
            tax_id: payload.tax_id.clone(),
            company_name: payload.company_name.clone(),
            industry_type: payload.industry_type,
            factory_address: payload.factory_address.clone(),
            avg_domestic_workers: payload.avg_domestic_workers,
            allocation_rate: payload.allocation_rate.map(|rate| rate.value()),
        };
        debug!(lead = %id, employer = %record.id, "stored converted employer");
        guard.insert(payload.tax_id.clone(), record.clone());
        Ok(record)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement_admin::workflows::billing::{FeeSchedule, ItemCategory};
    use placement_admin::workflows::leads::IndustryType;
    use rust_decimal_macros::dec;

    fn contract() -> DeploymentContract {
        DeploymentContract {
            worker_id: "W-7".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
            term_months: 2,
            fees: FeeSchedule::standard(),
        }
    }

    #[tokio::test]
    async fn simulation_reflects_amended_contract() {
        let backend = InMemoryBackend::default();
        let id = backend
            .insert_contract(BillingPlanId("BP-1".to_string()), contract())
            .expect("plan");
        assert!(backend.amend_contract(&id, |contract| {
            contract.fees.dormitory_fee = Some(dec!(2500));
        }));

        let plan = backend.fetch_plan(&id).await.expect("plan");
        assert_eq!(plan.review_status, ReviewStatus::NeedsReview);

        let items = backend.simulate(&id).await.expect("simulate").items.expect("items");
        let new_lines: Vec<_> = items
            .iter()
            .filter(|line| line.existing_amount.is_none())
            .map(|line| line.item_category.clone())
            .collect();
        assert_eq!(
            new_lines,
            vec![ItemCategory::DormitoryFee, ItemCategory::DormitoryFee]
        );
    }

    #[tokio::test]
    async fn unknown_plans_are_not_found() {
        let backend = InMemoryBackend::default();
        let id = BillingPlanId("missing".to_string());
        assert_eq!(backend.fetch_plan(&id).await, Err(GatewayError::NotFound));
        assert_eq!(
            backend.simulate(&id).await.map(|_| ()),
            Err(GatewayError::NotFound)
        );
        assert!(!backend.amend_contract(&id, |_| {}));
    }

    #[tokio::test]
    async fn duplicate_tax_ids_are_rejected() {
        let backend = InMemoryBackend::default();
        let payload = ConvertLeadPayload {
            tax_id: "24536806".to_string(),
            company_name: None,
            industry_type: IndustryType::Construction,
            factory_address: None,
            avg_domestic_workers: None,
            allocation_rate: None,
        };
        let lead = LeadId("lead-1".to_string());

        let employer = backend.convert(&lead, &payload).await.expect("created");
        assert_eq!(employer.id, "EMP-0001");
        assert!(matches!(
            backend.convert(&lead, &payload).await,
            Err(GatewayError::Rejected(_))
        ));
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert!(parse_date("2025-05-01").is_ok());
        assert!(parse_date("05/01/2025")
            .expect_err("rejected")
            .contains("YYYY-MM-DD"));
    }
}
