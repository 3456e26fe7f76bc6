//! # Vault Audit Common Library
//!
//! Shared code for the vault audit workspace including:
//! - Error taxonomy
//! - Database initialization and durable-row models
//! - Configuration and data folder resolution
//! - Timestamp utilities
//! - Tracing subscriber setup

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
