use rust_decimal::Decimal;

use super::domain::{ConvertLeadForm, ConvertLeadPayload, FieldViolation};
use crate::workflows::quota::{QuotaCalculation, QuotaError, QuotaRounding, RateComposition};

/// A form that passed validation, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConversion {
    pub payload: ConvertLeadPayload,
    pub quota_preview: Option<QuotaCalculation>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn is_tax_id(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|byte| byte.is_ascii_digit())
}

fn quota_violation(error: QuotaError) -> FieldViolation {
    let QuotaError::InvalidArgument { argument, reason } = error;
    let field = match argument {
        "extra_rate" => "extraRate",
        "labor_count" => "avgDomesticWorkers",
        _ => "baseRate",
    };
    FieldViolation::new(field, reason)
}

/// Check the form before any network call, reporting every violation at once.
pub fn validate_conversion(
    form: &ConvertLeadForm,
) -> Result<ValidatedConversion, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let tax_id = form.tax_id.trim().to_string();
    if !is_tax_id(&tax_id) {
        violations.push(FieldViolation::new("taxId", "must be exactly 8 digits"));
    }

    let company_name = non_blank(form.company_name.as_deref());
    let factory_address = non_blank(form.factory_address.as_deref());

    if !form.industry_type.requires_quota() {
        if !violations.is_empty() {
            return Err(violations);
        }
        return Ok(ValidatedConversion {
            payload: ConvertLeadPayload {
                tax_id,
                company_name,
                industry_type: form.industry_type,
                factory_address,
                avg_domestic_workers: None,
                allocation_rate: None,
            },
            quota_preview: None,
        });
    }

    if factory_address.is_none() {
        violations.push(FieldViolation::new(
            "factoryAddress",
            "is required for manufacturing employers",
        ));
    }

    let workers = match form.avg_domestic_workers {
        None => {
            violations.push(FieldViolation::new(
                "avgDomesticWorkers",
                "is required for manufacturing employers",
            ));
            None
        }
        Some(count) => match u32::try_from(count) {
            Ok(count) if count > 0 => Some(count),
            _ => {
                violations.push(FieldViolation::new(
                    "avgDomesticWorkers",
                    "must be a positive whole number",
                ));
                None
            }
        },
    };

    let composition = match form.base_rate {
        None => {
            violations.push(FieldViolation::new(
                "baseRate",
                "is required for manufacturing employers",
            ));
            None
        }
        Some(base_rate) => {
            let composition = RateComposition::new(
                base_rate,
                form.extra_rate.unwrap_or(Decimal::ZERO),
                form.apply_extra,
            );
            match composition.compose() {
                Ok(_) => Some(composition),
                Err(error) => {
                    violations.push(quota_violation(error));
                    None
                }
            }
        }
    };

    let (Some(workers), Some(composition), true) = (workers, composition, violations.is_empty())
    else {
        return Err(violations);
    };

    let preview =
        QuotaCalculation::compute(i64::from(workers), &composition, QuotaRounding::default())
            .map_err(|error| vec![quota_violation(error)])?;

    Ok(ValidatedConversion {
        payload: ConvertLeadPayload {
            tax_id,
            company_name,
            industry_type: form.industry_type,
            factory_address,
            avg_domestic_workers: Some(workers),
            allocation_rate: Some(preview.allocation_rate),
        },
        quota_preview: Some(preview),
    })
}
