//! HTTP client for a remote skill hub.
//!
//! [`HubClient::fetch_skill`] downloads a package document and
//! [`RemoteSkill::materialize`] writes it to a temporary directory so the
//! audit engine can treat it like any local package.

mod client;
mod config;
mod error;
mod remote;

pub use client::{HubClient, HubClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use config::RetryConfig;
pub use error::{HubError, Result};
pub use remote::{FileEncoding, MaterializedSkill, RemoteFile, RemoteSkill};
