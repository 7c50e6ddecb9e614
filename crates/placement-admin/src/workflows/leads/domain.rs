use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflows::quota::{AllocationRate, QuotaCalculation};

/// Identifier of a sales lead in the backend CRM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Industry an employer hires migrant workers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndustryType {
    Manufacturing,
    Construction,
    HomeCare,
    Institution,
    Agriculture,
    Fishery,
}

impl IndustryType {
    /// Manufacturing employers are subject to the headcount quota.
    pub fn requires_quota(self) -> bool {
        matches!(self, IndustryType::Manufacturing)
    }
}

/// Operator input for converting a lead into an employer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadForm {
    pub tax_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub industry_type: IndustryType,
    #[serde(default)]
    pub factory_address: Option<String>,
    #[serde(default)]
    pub avg_domestic_workers: Option<i64>,
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    #[serde(default)]
    pub extra_rate: Option<Decimal>,
    #[serde(default)]
    pub apply_extra: bool,
}

/// Body sent to `POST /leads/:id/convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadPayload {
    pub tax_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub industry_type: IndustryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_domestic_workers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_rate: Option<AllocationRate>,
}

/// Employer created by the backend from a converted lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerRecord {
    pub id: String,
    pub tax_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub industry_type: IndustryType,
    #[serde(default)]
    pub factory_address: Option<String>,
    #[serde(default)]
    pub avg_domestic_workers: Option<u32>,
    #[serde(default)]
    pub allocation_rate: Option<Decimal>,
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub employer: EmployerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_preview: Option<QuotaCalculation>,
}
