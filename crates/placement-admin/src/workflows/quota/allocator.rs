use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rate::{AllocationRate, RateComposition};
use super::QuotaError;

/// How a fractional headcount product turns into a whole quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaRounding {
    /// Round up when the first decimal digit is non-zero, otherwise round down.
    #[default]
    FirstDecimalDigit,
    /// Round up on any fractional remainder.
    AnyRemainder,
}

impl FromStr for QuotaRounding {
    type Err = QuotaError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_decimal_digit" => Ok(QuotaRounding::FirstDecimalDigit),
            "any_remainder" => Ok(QuotaRounding::AnyRemainder),
            other => Err(QuotaError::invalid(
                "rounding",
                format!("unknown rounding policy '{other}'"),
            )),
        }
    }
}

/// Quota for `labor_count` domestic workers at `rate`, using the default rounding.
pub fn compute_quota(labor_count: i64, rate: AllocationRate) -> Result<u32, QuotaError> {
    compute_quota_with(labor_count, rate, QuotaRounding::default())
}

pub fn compute_quota_with(
    labor_count: i64,
    rate: AllocationRate,
    rounding: QuotaRounding,
) -> Result<u32, QuotaError> {
    let raw = raw_quota(labor_count, rate)?;
    round_quota(labor_count, raw, rounding)
}

fn raw_quota(labor_count: i64, rate: AllocationRate) -> Result<Decimal, QuotaError> {
    if labor_count < 0 {
        return Err(QuotaError::invalid(
            "labor_count",
            format!("{labor_count} is negative"),
        ));
    }

    Decimal::from(labor_count)
        .checked_mul(rate.value())
        .ok_or_else(|| QuotaError::invalid("labor_count", "product overflows".to_string()))
}

fn round_quota(labor_count: i64, raw: Decimal, rounding: QuotaRounding) -> Result<u32, QuotaError> {
    let fraction = raw.fract();
    let rounded = if fraction.is_zero() {
        raw
    } else {
        match rounding {
            QuotaRounding::FirstDecimalDigit => {
                let first_digit = (fraction * Decimal::TEN).trunc();
                if first_digit.is_zero() {
                    raw.floor()
                } else {
                    raw.ceil()
                }
            }
            QuotaRounding::AnyRemainder => raw.ceil(),
        }
    };

    rounded.to_u32().ok_or_else(|| {
        QuotaError::invalid(
            "labor_count",
            format!("quota for {labor_count} workers exceeds the supported range"),
        )
    })
}

/// Full breakdown of a quota computation for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCalculation {
    pub domestic_worker_count: i64,
    pub allocation_rate: AllocationRate,
    pub raw_quota: Decimal,
    pub quota: u32,
    pub rounding: QuotaRounding,
}

impl QuotaCalculation {
    pub fn compute(
        domestic_worker_count: i64,
        composition: &RateComposition,
        rounding: QuotaRounding,
    ) -> Result<Self, QuotaError> {
        let allocation_rate = composition.compose()?;
        let raw = raw_quota(domestic_worker_count, allocation_rate)?;
        let quota = round_quota(domestic_worker_count, raw, rounding)?;

        Ok(Self {
            domestic_worker_count,
            allocation_rate,
            raw_quota: raw.normalize(),
            quota,
            rounding,
        })
    }
}
