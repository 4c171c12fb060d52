//! In-memory token environment backing scenario runs.
//!
//! Standard transfer/approve semantics over plain maps. The whole bank is
//! `Clone`, which is what the harness uses to emulate transaction revert:
//! snapshot before a vault call, restore if the call fails.

use liquivault_core::domain::{AccountId, Amount, TokenId};
use liquivault_core::errors::{VaultError, VaultResult};
use liquivault_core::external::TokenEnv;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    balances: BTreeMap<(TokenId, AccountId), Amount>,
    allowances: BTreeMap<(TokenId, AccountId, AccountId), Amount>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, token: &TokenId, account: &AccountId, amount: Amount) {
        *self
            .balances
            .entry((token.clone(), account.clone()))
            .or_insert(0) += amount;
    }

    /// Mint straight onto an address with no approval or transfer: the
    /// "someone sent tokens directly to the vault" case.
    pub fn donate(&mut self, token: &TokenId, to: &AccountId, amount: Amount) {
        self.mint(token, to, amount);
    }

    pub fn total_in_circulation(&self, token: &TokenId) -> Amount {
        self.balances
            .iter()
            .filter(|((t, _), _)| t == token)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl TokenEnv for InMemoryBank {
    fn balance_of(&self, token: &TokenId, holder: &AccountId) -> Amount {
        self.balances
            .get(&(token.clone(), holder.clone()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> VaultResult<()> {
        let held = self.balance_of(token, from);
        if amount > held {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available: held,
            });
        }
        self.balances
            .insert((token.clone(), from.clone()), held - amount);
        *self
            .balances
            .entry((token.clone(), to.clone()))
            .or_insert(0) += amount;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> VaultResult<()> {
        if spender != from {
            let key = (token.clone(), from.clone(), spender.clone());
            let allowed = self.allowances.get(&key).copied().unwrap_or(0);
            if amount > allowed {
                return Err(VaultError::InsufficientAllowance {
                    requested: amount,
                    available: allowed,
                });
            }
            // Saturating allowances stand in for the common unlimited grant.
            if allowed != Amount::MAX {
                self.allowances.insert(key, allowed - amount);
            }
        }
        self.transfer(token, from, to, amount)
    }

    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> VaultResult<()> {
        self.allowances
            .insert((token.clone(), owner.clone(), spender.clone()), amount);
        Ok(())
    }

    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(token.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }
}
