//! # skillgate-audit
//!
//! Static integrity gate for drop-in skill packages.
//!
//! Don't trust a package because it was trusted yesterday, trust its bytes.
//! A package is identified by a content hash; approvals are recorded against
//! that hash, and any drift sends it back to review.
//!
//! ## Components
//!
//! - **Hasher** ([`hash`]) -- deterministic SHA-256 fingerprint of a package
//! - **Scanner** ([`scanner`]) -- versioned regex rule set, subtractive score
//! - **`FlowAnalyzer`** ([`flow`]) -- import graph + capability chains
//! - **`RuntimeMonitor`** ([`runtime`]) -- runtime-only heuristics, additive score
//! - **Ledger** ([`ledger`]) -- approve/block/revoke record keyed by name + hash
//! - **`DiffScanner`** ([`diff`]) -- structural and security diff of two versions
//! - **Gate** ([`gate`]) -- ALLOW / REVIEW / BLOCK
//! - **Watcher** ([`watch`]) -- drift detection across installed packages
//!
//! ## Data Flow
//!
//! ```text
//! Install check
//!   locate_package() -> fingerprint()
//!   -> Ledger::is_approved(name, hash)   same hash approved: ALLOW, done
//!   -> Scanner::scan() + FlowAnalyzer::analyze()
//!   -> adjusted = score - flow penalties
//!   -> DiffScanner::diff(installed, candidate)   when replacing a copy
//!   -> decision; BLOCK is logged to the ledger
//!
//! Watch cycle
//!   discover_packages() -> fingerprint() each
//!   -> unchanged hash: nothing
//!   -> changed hash: rescan, compare with stored state, alert
//!   -> WatchState rewritten atomically under a lock
//! ```
//!
//! Everything is synchronous. The only shared mutable files are the ledger,
//! the watch state and the pending-review store; each read-modify-write
//! cycle holds an advisory lock and ends with an atomic rename.

pub mod cancel;
pub mod diff;
pub mod discovery;
pub mod flow;
pub mod gate;
pub mod hash;
pub mod ledger;
pub mod pending;
pub mod policy;
pub mod runtime;
pub mod scanner;
pub mod store;
pub mod watch;

pub use cancel::Cancellation;
pub use diff::DiffScanner;
pub use discovery::{describe_package, discover_packages, locate_package, PackageInfo, DEFAULT_MANIFEST};
pub use flow::FlowAnalyzer;
pub use gate::{Gate, InstallOptions};
pub use hash::fingerprint;
pub use ledger::{render_markdown, Ledger};
pub use pending::{PendingReview, PendingReviews};
pub use policy::Policy;
pub use runtime::RuntimeMonitor;
pub use scanner::{RuleSet, Scanner};
pub use skillgate_core::{AuditError, Result};
pub use watch::Watcher;
