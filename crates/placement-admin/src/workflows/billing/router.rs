use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::domain::{BillingPlanId, LineKey};
use super::gateway::BillingPlanGateway;
use super::service::{BillingReviewService, ReviewServiceError};
use super::session::ReviewError;
use crate::workflows::backend::GatewayError;

/// Router builder exposing the billing plan review flow.
pub fn billing_review_router<G>(service: Arc<BillingReviewService<G>>) -> Router
where
    G: BillingPlanGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/billing-plans/:plan_id/review",
            post(open_handler::<G>)
                .get(snapshot_handler::<G>)
                .delete(close_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/simulate",
            post(simulate_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/exit",
            post(exit_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/lines/:line_key/toggle",
            post(toggle_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/accept-all",
            post(accept_all_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/confirm",
            post(confirm_handler::<G>),
        )
        .route(
            "/api/v1/billing-plans/:plan_id/review/dismiss-error",
            post(dismiss_error_handler::<G>),
        )
        .with_state(service)
}

pub(crate) fn gateway_status(error: &GatewayError) -> StatusCode {
    match error {
        GatewayError::NotFound => StatusCode::NOT_FOUND,
        GatewayError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::Status { .. } | GatewayError::Transport(_) | GatewayError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn error_response(error: ReviewServiceError) -> Response {
    let status = match &error {
        ReviewServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ReviewServiceError::Gateway(err) => gateway_status(err),
        ReviewServiceError::Review(review) => match review {
            ReviewError::UnknownLine(_) => StatusCode::NOT_FOUND,
            ReviewError::NotInDiffMode
            | ReviewError::LineUnchanged(_)
            | ReviewError::RequestInFlight(_)
            | ReviewError::Closed
            | ReviewError::AlreadyConfirmed => StatusCode::CONFLICT,
            ReviewError::Gateway(err) => gateway_status(err),
        },
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(result: Result<T, ReviewServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.open(&BillingPlanId(plan_id)).await)
}

pub(crate) async fn snapshot_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.snapshot(&BillingPlanId(plan_id)))
}

pub(crate) async fn close_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    match service.close(&BillingPlanId(plan_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn simulate_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.simulate(&BillingPlanId(plan_id)).await)
}

pub(crate) async fn exit_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.exit_comparison(&BillingPlanId(plan_id)))
}

pub(crate) async fn toggle_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path((plan_id, line_key)): Path<(String, String)>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    let key = match line_key.parse::<LineKey>() {
        Ok(key) => key,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };
    respond(service.toggle(&BillingPlanId(plan_id), key))
}

pub(crate) async fn accept_all_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.accept_all(&BillingPlanId(plan_id)))
}

pub(crate) async fn confirm_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.confirm(&BillingPlanId(plan_id)).await)
}

pub(crate) async fn dismiss_error_handler<G>(
    State(service): State<Arc<BillingReviewService<G>>>,
    Path(plan_id): Path<String>,
) -> Response
where
    G: BillingPlanGateway + 'static,
{
    respond(service.dismiss_error(&BillingPlanId(plan_id)))
}
