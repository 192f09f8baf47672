//! Health probes and HTTP smoke tests

pub mod probe;
pub mod smoke;
