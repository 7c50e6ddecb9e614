use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::QuotaError;

/// Regulatory ceiling for base plus extra allocation.
pub const MAX_ALLOCATION_RATE: Decimal = Decimal::from_parts(40, 0, 0, false, 2);

/// Allocation rate applied to domestic headcount, always within `[0, 0.40]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct AllocationRate(Decimal);

impl AllocationRate {
    pub fn new(value: Decimal) -> Result<Self, QuotaError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(QuotaError::invalid(
                "allocation_rate",
                format!("{value} is negative"),
            ));
        }
        if value > MAX_ALLOCATION_RATE {
            return Err(QuotaError::invalid(
                "allocation_rate",
                format!("{value} exceeds the {MAX_ALLOCATION_RATE} ceiling"),
            ));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for AllocationRate {
    type Error = QuotaError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AllocationRate> for Decimal {
    fn from(rate: AllocationRate) -> Self {
        rate.0
    }
}

impl fmt::Display for AllocationRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Base rate plus an optional extra rate, recomputed whenever any input changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateComposition {
    pub base_rate: Decimal,
    #[serde(default)]
    pub extra_rate: Decimal,
    #[serde(default)]
    pub apply_extra: bool,
}

impl RateComposition {
    pub fn new(base_rate: Decimal, extra_rate: Decimal, apply_extra: bool) -> Self {
        Self {
            base_rate,
            extra_rate,
            apply_extra,
        }
    }

    pub fn base_only(base_rate: Decimal) -> Self {
        Self::new(base_rate, Decimal::ZERO, false)
    }

    /// `min(0.40, base + extra)` where extra only counts when applied.
    pub fn compose(&self) -> Result<AllocationRate, QuotaError> {
        if self.base_rate.is_sign_negative() && !self.base_rate.is_zero() {
            return Err(QuotaError::invalid(
                "base_rate",
                format!("{} is negative", self.base_rate),
            ));
        }

        let extra = if self.apply_extra {
            if self.extra_rate.is_sign_negative() && !self.extra_rate.is_zero() {
                return Err(QuotaError::invalid(
                    "extra_rate",
                    format!("{} is negative", self.extra_rate),
                ));
            }
            self.extra_rate
        } else {
            Decimal::ZERO
        };

        AllocationRate::new((self.base_rate + extra).min(MAX_ALLOCATION_RATE))
    }
}

/// Industry tiers published by the labor ministry, each with its base allocation rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationTier {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
}

impl AllocationTier {
    pub fn base_rate(self) -> Decimal {
        match self {
            AllocationTier::APlus => Decimal::new(35, 2),
            AllocationTier::A => Decimal::new(25, 2),
            AllocationTier::B => Decimal::new(20, 2),
            AllocationTier::C => Decimal::new(15, 2),
            AllocationTier::D => Decimal::new(10, 2),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AllocationTier::APlus => "A+",
            AllocationTier::A => "A",
            AllocationTier::B => "B",
            AllocationTier::C => "C",
            AllocationTier::D => "D",
        }
    }
}

impl FromStr for AllocationTier {
    type Err = QuotaError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A+" | "APLUS" => Ok(AllocationTier::APlus),
            "A" => Ok(AllocationTier::A),
            "B" => Ok(AllocationTier::B),
            "C" => Ok(AllocationTier::C),
            "D" => Ok(AllocationTier::D),
            other => Err(QuotaError::invalid(
                "tier",
                format!("unknown allocation tier '{other}'"),
            )),
        }
    }
}
