use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{ConversionResult, ConvertLeadForm, FieldViolation, LeadId};
use super::gateway::LeadGateway;
use super::validation::validate_conversion;
use crate::workflows::backend::GatewayError;

pub struct LeadConversionService<G> {
    gateway: Arc<G>,
}

impl<G> LeadConversionService<G>
where
    G: LeadGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Validate the form locally, then ask the backend to create the employer.
    pub async fn convert(
        &self,
        id: &LeadId,
        form: ConvertLeadForm,
    ) -> Result<ConversionResult, LeadConversionError> {
        let validated = validate_conversion(&form).map_err(|violations| {
            warn!(lead = %id, violations = violations.len(), "lead conversion form rejected");
            LeadConversionError::Validation(violations)
        })?;

        let employer = self.gateway.convert(id, &validated.payload).await?;
        info!(
            lead = %id,
            employer = %employer.id,
            quota = validated.quota_preview.as_ref().map(|preview| preview.quota),
            "lead converted to employer"
        );

        Ok(ConversionResult {
            employer,
            quota_preview: validated.quota_preview,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeadConversionError {
    #[error("conversion form has {} invalid field(s)", .0.len())]
    Validation(Vec<FieldViolation>),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
