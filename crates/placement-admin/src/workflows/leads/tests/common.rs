use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use crate::workflows::backend::GatewayError;
use crate::workflows::leads::{
    ConvertLeadForm, ConvertLeadPayload, EmployerRecord, IndustryType, LeadConversionService,
    LeadGateway, LeadId,
};

pub(super) fn manufacturing_form() -> ConvertLeadForm {
    ConvertLeadForm {
        tax_id: "24536806".to_string(),
        company_name: Some("Hsinchu Precision Molding".to_string()),
        industry_type: IndustryType::Manufacturing,
        factory_address: Some("No. 12, Industrial Rd, Hsinchu".to_string()),
        avg_domestic_workers: Some(125),
        base_rate: Some(dec!(0.15)),
        extra_rate: Some(dec!(0.05)),
        apply_extra: false,
    }
}

pub(super) fn home_care_form() -> ConvertLeadForm {
    ConvertLeadForm {
        tax_id: "12345678".to_string(),
        company_name: None,
        industry_type: IndustryType::HomeCare,
        factory_address: None,
        avg_domestic_workers: None,
        base_rate: None,
        extra_rate: None,
        apply_extra: false,
    }
}

/// Backend double echoing the payload back as an employer.
#[derive(Default)]
pub(super) struct RecordingLeadGateway {
    calls: Mutex<Vec<(LeadId, ConvertLeadPayload)>>,
    failure: Mutex<Option<GatewayError>>,
}

impl RecordingLeadGateway {
    pub(super) fn failing(error: GatewayError) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(error)),
        }
    }

    pub(super) fn calls(&self) -> Vec<(LeadId, ConvertLeadPayload)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl LeadGateway for RecordingLeadGateway {
    async fn convert(
        &self,
        id: &LeadId,
        payload: &ConvertLeadPayload,
    ) -> Result<EmployerRecord, GatewayError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((id.clone(), payload.clone()));
        if let Some(error) = self.failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }

        Ok(EmployerRecord {
            id: format!("EMP-{}", payload.tax_id),
            tax_id: payload.tax_id.clone(),
            company_name: payload.company_name.clone(),
            industry_type: payload.industry_type,
            factory_address: payload.factory_address.clone(),
            avg_domestic_workers: payload.avg_domestic_workers,
            allocation_rate: payload.allocation_rate.map(|rate| rate.value()),
        })
    }
}

pub(super) fn build_service(
    gateway: RecordingLeadGateway,
) -> (
    Arc<LeadConversionService<RecordingLeadGateway>>,
    Arc<RecordingLeadGateway>,
) {
    let gateway = Arc::new(gateway);
    (
        Arc::new(LeadConversionService::new(gateway.clone())),
        gateway,
    )
}
