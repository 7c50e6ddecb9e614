//! Converting a sales lead into an employer record.
//!
//! Manufacturing employers carry a headcount quota, so their conversion needs the factory
//! address, the average domestic workforce, and an allocation rate that composes within the
//! quota ceiling. Forms are validated in full before the backend is called.

pub mod domain;
pub mod gateway;
pub mod router;
pub mod service;
mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ConversionResult, ConvertLeadForm, ConvertLeadPayload, EmployerRecord, FieldViolation,
    IndustryType, LeadId,
};
pub use gateway::LeadGateway;
pub use router::lead_router;
pub use service::{LeadConversionError, LeadConversionService};
pub use validation::{validate_conversion, ValidatedConversion};
