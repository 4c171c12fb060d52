//! Order intent, lifecycle status, and audit trail types.

use super::ids::{AccountId, ChainId, OrderHash};
use super::token::{Amount, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of cross-chain transfer/swap intent. Immutable once created; its
/// identity is the deterministic hash of all fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Caller-chosen uniqueness seed; two otherwise-identical orders must
    /// carry different seeds to coexist.
    pub seed: u64,
    pub amount_in: Amount,
    pub trader: AccountId,
    pub receiver: AccountId,
    pub src_chain_id: ChainId,
    pub dest_chain_id: ChainId,
    pub token_in: TokenId,
    pub token_out: TokenId,
    /// Reserved at creation, resolved exactly once at fill or revert.
    pub fee: Amount,
    pub fill_deadline: DateTime<Utc>,
    pub min_amount_out: Amount,
}

impl Order {
    /// Deterministic identity over every field.
    ///
    /// serde_json preserves struct field order, so the serialization is
    /// canonical without extra sorting.
    pub fn hash(&self) -> OrderHash {
        let json = serde_json::to_string(self).expect("Order must serialize");
        OrderHash::from_bytes(json.as_bytes())
    }
}

/// Order lifecycle states. Nonexistent is modeled as absence from the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Funds pulled in, fee reserved, awaiting fill or revert.
    Created,
    /// External delivery verified; fee accrued. Terminal.
    Filled,
    /// Deadline plus buffer elapsed; principal refunded minus the retained
    /// fee penalty. Terminal.
    Reverted,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Reverted)
    }
}

/// Book entry: the immutable order plus its mutable status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order: Order,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Audit trail entry for an order status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAuditEntry {
    pub order_hash: OrderHash,
    pub at: DateTime<Utc>,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_order(seed: u64) -> Order {
        Order {
            seed,
            amount_in: 1_000,
            trader: AccountId::new("trader"),
            receiver: AccountId::new("receiver"),
            src_chain_id: ChainId(1),
            dest_chain_id: ChainId(137),
            token_in: TokenId::new("USDC"),
            token_out: TokenId::new("USDC"),
            fee: 1,
            fill_deadline: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            min_amount_out: 990,
        }
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(sample_order(7).hash(), sample_order(7).hash());
    }

    #[test]
    fn hash_differs_per_seed() {
        assert_ne!(sample_order(1).hash(), sample_order(2).hash());
    }

    #[test]
    fn hash_differs_per_amount() {
        let mut other = sample_order(1);
        other.amount_in += 1;
        assert_ne!(sample_order(1).hash(), other.hash());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Reverted.is_terminal());
    }

    #[test]
    fn order_serialization_roundtrip() {
        let order = sample_order(42);
        let json = serde_json::to_string(&order).unwrap();
        let deser: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deser);
        assert_eq!(order.hash(), deser.hash());
    }
}
