//! # Vault Audit Service Library
//!
//! Reconciles expected container labels (parsed from an uploaded workbook)
//! against physically scanned labels, and tracks how long each label has
//! lingered at a carrier location across repeated imports. Labels lingering
//! three or more days are flagged stale.
//!
//! The HTTP surface, upload storage, and report rendering live outside this
//! crate; it exposes the parsing, reconciliation, tracking, and payload
//! assembly they drive.

pub mod models;
pub mod services;
pub mod session;

pub use session::AuditSession;
pub use vault_common::{Error, Result};
