//! Declarative scenario files: a starting vault configuration, initial
//! account balances, and an ordered list of steps with expected outcomes.
//! Scenarios are TOML on disk and drive the [`crate::harness`] end to end.

use crate::forwarder::CallScript;
use chrono::{DateTime, Duration, Utc};
use liquivault_core::domain::{AccountId, Amount, ChainId, Order, TokenId};
use liquivault_core::vault::VaultConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("scenario has no steps")]
    Empty,
    #[error("step {index} references unknown order seed {seed}")]
    UnknownOrder { index: usize, seed: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub vault: VaultConfig,
    /// Tokens to register beyond the reference token.
    #[serde(default)]
    pub extra_tokens: Vec<TokenId>,
    #[serde(default)]
    pub accounts: Vec<AccountSetup>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSetup {
    pub account: AccountId,
    pub token: TokenId,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub action: Action,
    #[serde(default)]
    pub expect: Expectation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    #[default]
    Ok,
    Error,
}

/// Order parameters with a creation-relative deadline, so scenario files
/// stay valid regardless of start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSpec {
    pub seed: u64,
    pub amount_in: Amount,
    pub trader: AccountId,
    pub receiver: AccountId,
    pub src_chain_id: u64,
    pub dest_chain_id: u64,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub fee: Amount,
    pub deadline_secs: i64,
    pub min_amount_out: Amount,
}

impl OrderSpec {
    pub fn materialize(&self, now: DateTime<Utc>) -> Order {
        Order {
            seed: self.seed,
            amount_in: self.amount_in,
            trader: self.trader.clone(),
            receiver: self.receiver.clone(),
            src_chain_id: ChainId(self.src_chain_id),
            dest_chain_id: ChainId(self.dest_chain_id),
            token_in: self.token_in.clone(),
            token_out: self.token_out.clone(),
            fee: self.fee,
            fill_deadline: now + Duration::seconds(self.deadline_secs),
            min_amount_out: self.min_amount_out,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Stake {
        staker: AccountId,
        amount: Amount,
    },
    Withdraw {
        owner: AccountId,
        receiver: AccountId,
        amount: Amount,
    },
    SubmitReward {
        from: AccountId,
        amount: Amount,
    },
    /// Third-party transfer straight onto the vault address; absorbed on
    /// the next reconciliation.
    Donate {
        token: TokenId,
        amount: Amount,
    },
    CreateOrder {
        order: OrderSpec,
    },
    CreateOrderWithPermit {
        order: OrderSpec,
        nonce: u64,
    },
    FillOrder {
        seed: u64,
        script: CallScript,
    },
    RevertOrder {
        seed: u64,
    },
    ClaimFees {
        token: TokenId,
        receiver: AccountId,
    },
    /// Legacy single-pool outflow, bounded by the availability floor.
    Swap {
        token: TokenId,
        amount: Amount,
        receiver: AccountId,
    },
    BridgeOut {
        token: TokenId,
        amount: Amount,
        script: CallScript,
    },
    BridgeIn {
        token: TokenId,
        amount: Amount,
    },
    Rebalance {
        token: TokenId,
        amount: Amount,
        script: CallScript,
    },
    SetThreshold {
        bps: u64,
    },
    SetMode {
        paused: bool,
    },
    AddToken {
        token: TokenId,
    },
    SyncBalance {
        token: TokenId,
    },
    AdvanceTime {
        secs: i64,
    },
}

impl Scenario {
    pub fn from_toml_str(input: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(input)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Static checks: non-empty, and every fill/revert refers to a seed
    /// some earlier create step introduced.
    fn validate(&self) -> Result<(), ScenarioError> {
        if self.steps.is_empty() {
            return Err(ScenarioError::Empty);
        }
        let mut seen = std::collections::BTreeSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            match &step.action {
                Action::CreateOrder { order } | Action::CreateOrderWithPermit { order, .. } => {
                    seen.insert(order.seed);
                }
                Action::FillOrder { seed, .. } | Action::RevertOrder { seed } => {
                    if !seen.contains(seed) {
                        return Err(ScenarioError::UnknownOrder { index, seed: *seed });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BASIC: &str = r#"
name = "stake-and-reward"
start_time = "2025-03-01T12:00:00Z"

[vault]
vault_account = "vault"
reference_token = "USDC"
rebalance_threshold_bps = 7500
order_revert_buffer_secs = 600
max_order_time_secs = 3600
revert_fee_keep_bps = 5000

[[accounts]]
account = "alice"
token = "USDC"
balance = 1000

[[steps]]
action = { kind = "stake", staker = "alice", amount = 500 }

[[steps]]
action = { kind = "advance_time", secs = 60 }

[[steps]]
action = { kind = "stake", staker = "alice", amount = 0 }
expect = "error"
"#;

    #[test]
    fn parses_basic_scenario() {
        let scenario = Scenario::from_toml_str(BASIC).unwrap();
        assert_eq!(scenario.name, "stake-and-reward");
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[2].expect, Expectation::Error);
        assert!(matches!(
            scenario.steps[0].action,
            Action::Stake { amount: 500, .. }
        ));
    }

    #[test]
    fn rejects_fill_of_unknown_seed() {
        let toml = r#"
name = "bad"
start_time = "2025-03-01T12:00:00Z"

[vault]
vault_account = "vault"
reference_token = "USDC"
rebalance_threshold_bps = 7500
order_revert_buffer_secs = 600
max_order_time_secs = 3600
revert_fee_keep_bps = 5000

[[steps]]
action = { kind = "revert_order", seed = 9 }
"#;
        assert!(matches!(
            Scenario::from_toml_str(toml),
            Err(ScenarioError::UnknownOrder { index: 0, seed: 9 })
        ));
    }

    #[test]
    fn rejects_empty_scenario() {
        let toml = r#"
name = "empty"
start_time = "2025-03-01T12:00:00Z"
steps = []

[vault]
vault_account = "vault"
reference_token = "USDC"
rebalance_threshold_bps = 7500
order_revert_buffer_secs = 600
max_order_time_secs = 3600
revert_fee_keep_bps = 5000
"#;
        assert!(matches!(
            Scenario::from_toml_str(toml),
            Err(ScenarioError::Empty)
        ));
    }

    #[test]
    fn order_spec_deadline_is_relative() {
        let spec = OrderSpec {
            seed: 1,
            amount_in: 100,
            trader: AccountId::new("t"),
            receiver: AccountId::new("r"),
            src_chain_id: 10,
            dest_chain_id: 1,
            token_in: TokenId::new("USDC"),
            token_out: TokenId::new("USDC"),
            fee: 1,
            deadline_secs: 1800,
            min_amount_out: 99,
        };
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let order = spec.materialize(now);
        assert_eq!(order.fill_deadline, now + Duration::seconds(1800));
    }
}
