use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::backend::GatewayError;
use crate::workflows::billing::{ExportError, ReviewServiceError, ScheduleError};
use crate::workflows::leads::LeadConversionError;
use crate::workflows::quota::QuotaError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Quota(QuotaError),
    Schedule(ScheduleError),
    Export(ExportError),
    Backend(GatewayError),
    Review(ReviewServiceError),
    Lead(LeadConversionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Quota(err) => write!(f, "quota error: {}", err),
            AppError::Schedule(err) => write!(f, "billing schedule error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
            AppError::Backend(err) => write!(f, "backend error: {}", err),
            AppError::Review(err) => write!(f, "billing review error: {}", err),
            AppError::Lead(err) => write!(f, "lead conversion error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Quota(err) => Some(err),
            AppError::Schedule(err) => Some(err),
            AppError::Export(err) => Some(err),
            AppError::Backend(err) => Some(err),
            AppError::Review(err) => Some(err),
            AppError::Lead(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Quota(_) | AppError::Schedule(_) | AppError::Lead(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Export(_)
            | AppError::Review(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<QuotaError> for AppError {
    fn from(value: QuotaError) -> Self {
        Self::Quota(value)
    }
}

impl From<ScheduleError> for AppError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Backend(value)
    }
}

impl From<ReviewServiceError> for AppError {
    fn from(value: ReviewServiceError) -> Self {
        Self::Review(value)
    }
}

impl From<LeadConversionError> for AppError {
    fn from(value: LeadConversionError) -> Self {
        Self::Lead(value)
    }
}
