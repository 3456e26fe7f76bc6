//! Database initialization and durable-row models

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
