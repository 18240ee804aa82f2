//! Berth Library
//!
//! Core modules for the berth ephemeral deployment service.

pub mod app;
pub mod config;
pub mod deploy;
pub mod engine;
pub mod errors;
pub mod logs;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod utils;
