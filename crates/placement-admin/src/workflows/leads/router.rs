use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::domain::{ConvertLeadForm, LeadId};
use super::gateway::LeadGateway;
use super::service::{LeadConversionError, LeadConversionService};
use crate::workflows::billing::router::gateway_status;

pub fn lead_router<G>(service: Arc<LeadConversionService<G>>) -> Router
where
    G: LeadGateway + 'static,
{
    Router::new()
        .route("/api/v1/leads/:lead_id/convert", post(convert_handler::<G>))
        .with_state(service)
}

pub(crate) async fn convert_handler<G>(
    State(service): State<Arc<LeadConversionService<G>>>,
    Path(lead_id): Path<String>,
    Json(form): Json<ConvertLeadForm>,
) -> Response
where
    G: LeadGateway + 'static,
{
    match service.convert(&LeadId(lead_id), form).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(LeadConversionError::Validation(violations)) => {
            let payload = json!({
                "error": "conversion form is invalid",
                "violations": violations,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(LeadConversionError::Gateway(error)) => {
            let payload = json!({ "error": error.to_string() });
            (gateway_status(&error), Json(payload)).into_response()
        }
    }
}
