//! Core types for the skillgate integrity gate.
//!
//! This crate holds the data model shared by the engine, the hub client and
//! the CLI:
//!
//! - **Types**: fingerprints, findings, flow chains, ledger entries, gate
//!   decisions, diff results and watch state
//! - **Errors**: the engine error type [`AuditError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use skillgate_core::{Finding, Risk, Severity};
//!
//! fn summarize(findings: &[Finding]) -> Risk {
//!     let penalty: u32 = findings.iter().map(|f| f.weight).sum();
//!     Risk::from_score(100u32.saturating_sub(penalty))
//! }
//! ```

mod error;
pub mod types;

pub use error::{AuditError, Result};
pub use types::*;
