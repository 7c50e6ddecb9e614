use async_trait::async_trait;

use super::domain::{ConvertLeadPayload, EmployerRecord, LeadId};
use crate::workflows::backend::GatewayError;

#[async_trait]
pub trait LeadGateway: Send + Sync {
    async fn convert(
        &self,
        id: &LeadId,
        payload: &ConvertLeadPayload,
    ) -> Result<EmployerRecord, GatewayError>;
}
