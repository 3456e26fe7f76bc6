//! Data models for the vault audit service

pub mod audit;
pub mod container;
pub mod payloads;

pub use audit::{AuditResult, AuditSummary};
pub use container::{ContainerSnapshot, SheetParameters, Transaction};
pub use payloads::{AuditResponse, ContainerInfo, ExportPayload, UploadSummary};
