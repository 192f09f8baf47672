//! HTTP API clients

pub mod client;
pub mod paas;
