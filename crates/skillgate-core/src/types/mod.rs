mod decision;
mod diff;
mod finding;
mod fingerprint;
mod flow;
mod ledger;
mod runtime;
mod watch;

pub use decision::*;
pub use diff::*;
pub use finding::*;
pub use fingerprint::*;
pub use flow::*;
pub use ledger::*;
pub use runtime::*;
pub use watch::*;
