//! The ledger capability used by the saga and its implementations.

pub mod http;
pub mod ledger;
pub mod local;

pub use http::HttpLedgerClient;
pub use ledger::{LedgerClient, LedgerOutcome, LedgerRefusal, RefusalKind};
pub use local::LocalLedgerClient;
