use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use placement_admin::error::AppError;
use placement_admin::workflows::billing::{
    billing_review_router, BillingPlanGateway, BillingReviewService,
};
use placement_admin::workflows::leads::{lead_router, LeadConversionService, LeadGateway};
use placement_admin::workflows::quota::{
    AllocationTier, QuotaCalculation, QuotaError, QuotaRounding, RateComposition,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuotaRequest {
    pub(crate) domestic_worker_count: i64,
    #[serde(default)]
    pub(crate) base_rate: Option<Decimal>,
    #[serde(default)]
    pub(crate) tier: Option<AllocationTier>,
    #[serde(default)]
    pub(crate) extra_rate: Option<Decimal>,
    #[serde(default)]
    pub(crate) apply_extra: bool,
    #[serde(default)]
    pub(crate) rounding: Option<QuotaRounding>,
}

impl QuotaRequest {
    pub(crate) fn composition(&self) -> Result<RateComposition, QuotaError> {
        let base_rate = match (self.base_rate, self.tier) {
            (Some(rate), None) => rate,
            (None, Some(tier)) => tier.base_rate(),
            (Some(_), Some(_)) => {
                return Err(QuotaError::InvalidArgument {
                    argument: "base_rate",
                    reason: "give either a base rate or a tier, not both".to_string(),
                })
            }
            (None, None) => {
                return Err(QuotaError::InvalidArgument {
                    argument: "base_rate",
                    reason: "a base rate or a tier is required".to_string(),
                })
            }
        };

        Ok(RateComposition::new(
            base_rate,
            self.extra_rate.unwrap_or(Decimal::ZERO),
            self.apply_extra,
        ))
    }
}

pub(crate) fn with_workflow_routes<G>(backend: Arc<G>) -> axum::Router
where
    G: BillingPlanGateway + LeadGateway + 'static,
{
    let billing = Arc::new(BillingReviewService::new(backend.clone()));
    let leads = Arc::new(LeadConversionService::new(backend));

    billing_review_router(billing)
        .merge(lead_router(leads))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/quota", axum::routing::post(quota_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn quota_endpoint(
    Json(payload): Json<QuotaRequest>,
) -> Result<Json<QuotaCalculation>, AppError> {
    let composition = payload.composition()?;
    let calculation = QuotaCalculation::compute(
        payload.domestic_worker_count,
        &composition,
        payload.rounding.unwrap_or_default(),
    )?;
    Ok(Json(calculation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryBackend;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    fn request(count: i64) -> QuotaRequest {
        QuotaRequest {
            domestic_worker_count: count,
            base_rate: None,
            tier: None,
            extra_rate: None,
            apply_extra: false,
            rounding: None,
        }
    }

    #[tokio::test]
    async fn quota_endpoint_uses_tier_rate() {
        let mut payload = request(125);
        payload.tier = Some(AllocationTier::C);

        let Json(body) = quota_endpoint(Json(payload)).await.expect("quota computes");

        assert_eq!(body.allocation_rate.value(), dec!(0.15));
        assert_eq!(body.quota, 19);
    }

    #[tokio::test]
    async fn quota_endpoint_applies_extra_rate_and_rounding() {
        let mut payload = request(201);
        payload.base_rate = Some(dec!(0.05));
        payload.extra_rate = Some(dec!(0.10));
        payload.rounding = Some(QuotaRounding::AnyRemainder);

        let Json(without_extra) = quota_endpoint(Json(payload)).await.expect("quota computes");
        assert_eq!(without_extra.quota, 11);

        let mut payload = request(201);
        payload.base_rate = Some(dec!(0.05));
        payload.extra_rate = Some(dec!(0.10));
        payload.apply_extra = true;
        let Json(with_extra) = quota_endpoint(Json(payload)).await.expect("quota computes");
        assert_eq!(with_extra.allocation_rate.value(), dec!(0.15));
        assert_eq!(with_extra.quota, 31);
    }

    #[tokio::test]
    async fn quota_endpoint_requires_exactly_one_rate_source() {
        let missing = quota_endpoint(Json(request(10))).await;
        assert!(matches!(missing, Err(AppError::Quota(_))));

        let mut both = request(10);
        both.base_rate = Some(dec!(0.2));
        both.tier = Some(AllocationTier::B);
        let response = quota_endpoint(Json(both))
            .await
            .expect_err("ambiguous rate")
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn router_serves_health_and_quota() {
        let router = with_workflow_routes(Arc::new(InMemoryBackend::default()));

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let quota = router
            .oneshot(
                Request::post("/api/v1/quota")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "domesticWorkerCount": 100, "tier": "A+" }).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(quota.status(), StatusCode::OK);
        let bytes = to_bytes(quota.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["quota"], 35);
    }

    #[tokio::test]
    async fn seeded_in_memory_plan_opens_in_diff_mode() {
        let backend = InMemoryBackend::default();
        let entry_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 15).expect("valid date");
        let plan_id = crate::demo::seed_review_plan(&backend, entry_date, 12).expect("seeded");
        let router = with_workflow_routes(Arc::new(backend));

        let response = router
            .oneshot(
                Request::post(format!("/api/v1/billing-plans/{plan_id}/review"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.expect("body"))
                .expect("json");
        assert_eq!(body["planId"], "BP-DEMO-1");
        assert_eq!(body["mode"], "diff");
        assert!(body["lines"]
            .as_array()
            .expect("lines")
            .iter()
            .any(|line| line["itemCategory"] == "DORMITORY_FEE"));
    }

    #[tokio::test]
    async fn router_exposes_review_routes() {
        let router = with_workflow_routes(Arc::new(InMemoryBackend::default()));

        let response = router
            .oneshot(
                Request::post("/api/v1/billing-plans/BP-404/review")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
