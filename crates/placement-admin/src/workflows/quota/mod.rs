//! Headcount-based foreign-worker quota (the "3K5" allocation).
//!
//! A company's quota is its average domestic headcount multiplied by an allocation rate. The
//! rate is the industry tier's base rate, optionally raised by an extra rate, and never exceeds
//! [`MAX_ALLOCATION_RATE`].

mod allocator;
mod rate;


pub use allocator::{compute_quota, compute_quota_with, QuotaCalculation, QuotaRounding};
pub use rate::{AllocationRate, AllocationTier, RateComposition, MAX_ALLOCATION_RATE};

/// Rejected quota inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaError {
    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: String,
    },
}

impl QuotaError {
    pub(crate) fn invalid(argument: &'static str, reason: String) -> Self {
        Self::InvalidArgument { argument, reason }
    }
}
