pub mod backend;
pub mod billing;
pub mod leads;
pub mod quota;
