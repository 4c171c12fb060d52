//! Accounting ledgers: per-token counters and the auto-compounding share pool.

pub mod share_pool;
pub mod token_ledger;

pub use share_pool::SharePool;
pub use token_ledger::{LedgerBook, TokenLedger};
