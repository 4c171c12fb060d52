//! Typed event log appended by every mutating vault operation.
//!
//! This is the vault's observable surface for indexers, orchestrators, and
//! the scenario harness; callers drain it and persist it as they see fit.

use crate::auth::Mode;
use crate::domain::{AccountId, Amount, OrderHash, TokenId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultEvent {
    Staked {
        staker: AccountId,
        receiver: AccountId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    Unstaked {
        owner: AccountId,
        receiver: AccountId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    RewardSubmitted {
        from: AccountId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    DonationAbsorbed {
        token: TokenId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    OrderCreated {
        order_hash: OrderHash,
        token_in: TokenId,
        amount_in: Amount,
        fee: Amount,
        at: DateTime<Utc>,
    },
    OrderFilled {
        order_hash: OrderHash,
        delivered: Amount,
        at: DateTime<Utc>,
    },
    OrderReverted {
        order_hash: OrderHash,
        refunded: Amount,
        fee_kept: Amount,
        at: DateTime<Utc>,
    },
    SwapExecuted {
        token: TokenId,
        amount: Amount,
        receiver: AccountId,
        at: DateTime<Utc>,
    },
    FeesClaimed {
        token: TokenId,
        amount: Amount,
        receiver: AccountId,
        at: DateTime<Utc>,
    },
    BridgeLiquidityAdded {
        token: TokenId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    BridgeLiquidityRemoved {
        token: TokenId,
        amount: Amount,
        at: DateTime<Utc>,
    },
    Rebalanced {
        token: TokenId,
        outflow: Amount,
        inflow: Amount,
        at: DateTime<Utc>,
    },
    ThresholdUpdated {
        threshold_bps: u64,
        at: DateTime<Utc>,
    },
    ModeChanged {
        mode: Mode,
        at: DateTime<Utc>,
    },
    TokenAdded {
        token: TokenId,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn event_serialization_is_tagged() {
        let event = VaultEvent::Staked {
            staker: AccountId::new("alice"),
            receiver: AccountId::new("alice"),
            amount: 100,
            at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"STAKED\""));
        let back: VaultEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
