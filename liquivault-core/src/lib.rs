//! LiquiVault Core: the cross-chain stablecoin vault engine.
//!
//! This crate contains the deterministic heart of the protocol:
//! - Domain types (tokens, amounts, orders, deterministic order identity)
//! - Per-token accounting ledger with fee reserve/accrual counters
//! - Auto-compounding share pool with an asset-denominated holder surface
//! - Liquidity availability calculator (threshold floor, clamped)
//! - Order state machine (create / fill / revert)
//! - Bridge liquidity rebalancer with post-call balance reconciliation
//! - Explicit authorization contexts and the pause mode guard
//! - Versioned snapshot schema with explicit migrations
//!
//! Execution is single-threaded and atomic per call: every operation either
//! fully commits or returns a typed error with no partial vault state.
//! Collaborators (the token environment, call forwarder, price feed, and
//! permit verifier) are traits; implementations live with the embedder.

pub mod auth;
pub mod domain;
pub mod errors;
pub mod events;
pub mod external;
pub mod ledger;
pub mod liquidity;
pub mod orders;
pub mod schema;
pub mod vault;
