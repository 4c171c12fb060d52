//! Domain types: identifiers, tokens, amounts, and orders.

pub mod ids;
pub mod order;
pub mod token;

pub use ids::{AccountId, ChainId, Nonce, OrderHash};
pub use order::{Order, OrderAuditEntry, OrderRecord, OrderStatus};
pub use token::{bps_share, Amount, TokenId, BPS_DENOMINATOR};
