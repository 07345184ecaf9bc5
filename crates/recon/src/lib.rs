//! `refaudit-recon`: Referral reconciliation and eligibility audit engine.
//!
//! Pure engine crate: receives CSV text or typed tables, returns the
//! assembled report. No CLI or filesystem writes.

pub mod classify;
pub mod config;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod join;
pub mod load;
pub mod model;
pub mod project;
pub mod report;
pub mod resolve;
pub mod temporal;

pub use config::{DuplicatePolicy, PipelineConfig};
pub use engine::run;
pub use error::ReconError;
pub use model::{AuditInput, AuditResult, AuditSummary, MasterRow};
pub use report::{render_report, ReportRow};
