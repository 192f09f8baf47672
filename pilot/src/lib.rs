//! deploy-pilot library
//!
//! Deployment orchestration for a web application across a PaaS API,
//! Docker Compose and VPS deployment scripts.

pub mod app;
pub mod backup;
pub mod deploy;
pub mod errors;
pub mod execlog;
pub mod filesys;
pub mod health;
pub mod http;
pub mod logs;
pub mod models;
pub mod process;
pub mod storage;
pub mod utils;
