//! Scripted call forwarder: plays back a queue of behaviors, one per
//! external call, so scenarios can exercise honest deliveries, partial
//! deliveries, outright failures, and adapters that try to take more than
//! they were authorized.

use liquivault_core::domain::{AccountId, Amount, TokenId};
use liquivault_core::errors::{VaultError, VaultResult};
use liquivault_core::external::{CallForwarder, CallOutcome, ExternalCall, TokenEnv};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One scripted behavior for the next external call.
///
/// `Pull` legs act as the call target and spend the vault's bounded
/// approval; `Send` legs move tokens from the target's own balance. A
/// `Rogue` leg bypasses the approval entirely by transferring straight off
/// the vault address, which the vault must detect and reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallScript {
    /// Pull `pull` from the vault through the approval, then credit
    /// `deliver` to `receiver` out of the pulled funds (plus the target's
    /// own balance if `deliver > pull`).
    Deliver {
        token: TokenId,
        pull: Amount,
        deliver: Amount,
        receiver: AccountId,
    },
    /// Pull from the vault and keep it at the target: a bridge-out leg.
    PullOnly { token: TokenId, amount: Amount },
    /// Send the target's own funds to the vault: a bridge-in leg.
    SendToVault {
        token: TokenId,
        amount: Amount,
        vault: AccountId,
    },
    /// Fail without touching the environment.
    Fail { message: String },
    /// Drain the vault directly, ignoring the approval.
    Rogue {
        token: TokenId,
        amount: Amount,
        vault: AccountId,
        sink: AccountId,
    },
}

/// Replays scripts in order; an exhausted queue fails the call.
#[derive(Debug, Clone, Default)]
pub struct ScriptedForwarder {
    queue: VecDeque<CallScript>,
    /// Account the vault's approval was granted to on the last pull leg.
    vault_hint: Option<AccountId>,
}

impl ScriptedForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, script: CallScript) {
        self.queue.push_back(script);
    }

    pub fn with(mut self, script: CallScript) -> Self {
        self.push(script);
        self
    }

    /// Tells pull legs which address to pull from. Scenario harnesses set
    /// this once from the vault config.
    pub fn set_vault(&mut self, vault: AccountId) {
        self.vault_hint = Some(vault);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl CallForwarder for ScriptedForwarder {
    fn execute(&mut self, call: &ExternalCall, env: &mut dyn TokenEnv) -> VaultResult<CallOutcome> {
        let script = self.queue.pop_front().ok_or_else(|| {
            VaultError::ExternalCallFailed(format!("no script queued for call to {}", call.target))
        })?;
        let vault = self.vault_hint.clone().ok_or_else(|| {
            VaultError::ExternalCallFailed("forwarder has no vault address configured".into())
        })?;

        match script {
            CallScript::Deliver {
                token,
                pull,
                deliver,
                receiver,
            } => {
                if pull > 0 {
                    env.transfer_from(&token, &call.target, &vault, &call.target, pull)?;
                }
                if deliver > 0 {
                    env.transfer(&token, &call.target, &receiver, deliver)?;
                }
                Ok(CallOutcome {
                    output_token: Some(token),
                    output_amount: deliver,
                })
            }
            CallScript::PullOnly { token, amount } => {
                env.transfer_from(&token, &call.target, &vault, &call.target, amount)?;
                Ok(CallOutcome {
                    output_token: Some(token),
                    output_amount: 0,
                })
            }
            CallScript::SendToVault {
                token,
                amount,
                vault: vault_account,
            } => {
                env.transfer(&token, &call.target, &vault_account, amount)?;
                Ok(CallOutcome {
                    output_token: Some(token),
                    output_amount: amount,
                })
            }
            CallScript::Fail { message } => Err(VaultError::ExternalCallFailed(message)),
            CallScript::Rogue {
                token,
                amount,
                vault: vault_account,
                sink,
            } => {
                env.transfer(&token, &vault_account, &sink, amount)?;
                Ok(CallOutcome {
                    output_token: None,
                    output_amount: 0,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::InMemoryBank;

    fn usdc() -> TokenId {
        TokenId::new("USDC")
    }

    #[test]
    fn deliver_pulls_through_allowance() {
        let vault = AccountId::new("vault");
        let target = AccountId::new("adapter");
        let receiver = AccountId::new("alice");
        let mut bank = InMemoryBank::new();
        bank.mint(&usdc(), &vault, 1_000);
        bank.approve(&usdc(), &vault, &target, 500).unwrap();

        let mut fwd = ScriptedForwarder::new().with(CallScript::Deliver {
            token: usdc(),
            pull: 500,
            deliver: 500,
            receiver: receiver.clone(),
        });
        fwd.set_vault(vault.clone());

        let call = ExternalCall {
            target,
            payload: "deliver".into(),
        };
        let outcome = fwd.execute(&call, &mut bank).unwrap();
        assert_eq!(outcome.output_amount, 500);
        assert_eq!(bank.balance_of(&usdc(), &receiver), 500);
        assert_eq!(bank.balance_of(&usdc(), &vault), 500);
    }

    #[test]
    fn pull_beyond_allowance_fails_cleanly() {
        let vault = AccountId::new("vault");
        let target = AccountId::new("adapter");
        let mut bank = InMemoryBank::new();
        bank.mint(&usdc(), &vault, 1_000);
        bank.approve(&usdc(), &vault, &target, 100).unwrap();

        let mut fwd = ScriptedForwarder::new().with(CallScript::PullOnly {
            token: usdc(),
            amount: 200,
        });
        fwd.set_vault(vault.clone());

        let call = ExternalCall {
            target,
            payload: "bridge".into(),
        };
        assert!(matches!(
            fwd.execute(&call, &mut bank),
            Err(VaultError::InsufficientAllowance { .. })
        ));
        assert_eq!(bank.balance_of(&usdc(), &vault), 1_000);
    }

    #[test]
    fn exhausted_queue_fails() {
        let mut fwd = ScriptedForwarder::new();
        fwd.set_vault(AccountId::new("vault"));
        let mut bank = InMemoryBank::new();
        let call = ExternalCall {
            target: AccountId::new("adapter"),
            payload: "x".into(),
        };
        assert!(matches!(
            fwd.execute(&call, &mut bank),
            Err(VaultError::ExternalCallFailed(_))
        ));
    }

    #[test]
    fn scripts_round_trip_through_serde() {
        let script = CallScript::Fail {
            message: "bridge timeout".into(),
        };
        let json = serde_json::to_string(&script).unwrap();
        assert!(json.contains("\"kind\":\"fail\""));
        let back: CallScript = serde_json::from_str(&json).unwrap();
        assert_eq!(script, back);
    }
}
