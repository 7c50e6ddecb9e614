//! Back-office workflows for a migrant-worker placement agency: headcount quota
//! allocation, lead conversion, and billing plan review against the agency backend.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
