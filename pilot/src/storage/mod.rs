//! Configuration and on-disk layout

pub mod config;
pub mod layout;
pub mod settings;
