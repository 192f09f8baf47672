//! Deployment module

pub mod compose;
pub mod driver;
pub mod factory;
pub mod monitor;
pub mod orchestrator;
pub mod paas;
pub mod vps;
