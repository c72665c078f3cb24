//! # skillgate-cli
//!
//! Command-line front end of the skill integrity gate.
//!
//! ## Features
//!
//! - **Scanning**: `scan`, `scan-hub`, `check`, `batch`, `runtime`
//! - **Install gate**: `install`, `approve`, `revoke`, `verify`
//! - **Ledger and drift**: `ledger`, `watch`, `diff`, `status`
//! - **Output formats**: pretty, compact, JSON, YAML

pub mod cli;
pub mod config;
pub mod output;

pub use cli::commands::Outcome;
pub use cli::run;
