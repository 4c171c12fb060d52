//! Auto-compounding share pool.
//!
//! One pool value object: raw internal share units per holder plus the total
//! pool asset value, with pure unit/asset conversions. Holder balances and
//! total supply are derived live from the share:asset ratio, never stored in
//! asset terms, so the round-trip invariant is structural. Yield credited
//! without minting units (rewards, donations) raises every holder's
//! asset-denominated claim proportionally.

use crate::domain::{AccountId, Amount};
use crate::errors::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePool {
    units: BTreeMap<AccountId, u128>,
    total_units: u128,
    pool_assets: Amount,
    /// owner -> spender -> asset-denominated allowance.
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
}

impl SharePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assets -> internal units at the current pool ratio. 1:1 when the pool
    /// has no units yet (or its assets were fully drained), so the first
    /// depositor after an unclaimed inflow captures it.
    pub fn to_share_units(&self, assets: Amount) -> u128 {
        if self.total_units == 0 || self.pool_assets == 0 {
            assets as u128
        } else {
            assets as u128 * self.total_units / self.pool_assets as u128
        }
    }

    /// Internal units -> assets at the current pool ratio.
    pub fn to_assets(&self, units: u128) -> Amount {
        if self.total_units == 0 {
            0
        } else {
            (units * self.pool_assets as u128 / self.total_units) as Amount
        }
    }

    /// Mint units to `receiver` for `amount` of incoming assets. Returns the
    /// units minted.
    pub fn deposit(&mut self, receiver: &AccountId, amount: Amount) -> VaultResult<u128> {
        let minted = self.to_share_units(amount);
        if minted == 0 {
            return Err(VaultError::InvalidAmount);
        }
        self.pool_assets = self
            .pool_assets
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        self.total_units += minted;
        *self.units.entry(receiver.clone()).or_insert(0) += minted;
        Ok(minted)
    }

    /// Burn units from `owner` worth `assets`. Burns round up so a
    /// withdrawal can never take out more value than the units surrendered;
    /// a full withdrawal burns every unit to avoid dust.
    pub fn withdraw_assets(&mut self, owner: &AccountId, assets: Amount) -> VaultResult<()> {
        let held = self.units.get(owner).copied().unwrap_or(0);
        let balance = self.to_assets(held);
        if assets > balance {
            return Err(VaultError::InsufficientBalance {
                requested: assets,
                available: balance,
            });
        }
        let burned = if assets == balance {
            held
        } else {
            let numer = assets as u128 * self.total_units;
            let denom = self.pool_assets as u128;
            numer.div_ceil(denom).min(held)
        };
        self.pool_assets -= assets;
        self.total_units -= burned;
        match held - burned {
            0 => {
                self.units.remove(owner);
            }
            rest => {
                self.units.insert(owner.clone(), rest);
            }
        }
        Ok(())
    }

    /// Raise the pool value without minting units: rewards and donations.
    pub fn credit_yield(&mut self, amount: Amount) -> VaultResult<()> {
        self.pool_assets = self
            .pool_assets
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Asset-denominated holder balance, derived live.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.to_assets(self.units.get(account).copied().unwrap_or(0))
    }

    /// Total supply in asset terms equals the pool value by construction.
    pub fn total_supply(&self) -> Amount {
        self.pool_assets
    }

    /// Move `assets` worth of units between holders. Touches neither the
    /// pool value nor any token balance.
    pub fn transfer(&mut self, from: &AccountId, to: &AccountId, assets: Amount) -> VaultResult<()> {
        let held = self.units.get(from).copied().unwrap_or(0);
        let balance = self.to_assets(held);
        if assets > balance {
            return Err(VaultError::InsufficientBalance {
                requested: assets,
                available: balance,
            });
        }
        let moved = if assets == balance {
            held
        } else {
            self.to_share_units(assets)
        };
        if moved == 0 {
            return Err(VaultError::InvalidAmount);
        }
        match held - moved {
            0 => {
                self.units.remove(from);
            }
            rest => {
                self.units.insert(from.clone(), rest);
            }
        }
        *self.units.entry(to.clone()).or_insert(0) += moved;
        Ok(())
    }

    pub fn approve(&mut self, owner: &AccountId, spender: &AccountId, assets: Amount) {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), assets);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn spend_allowance(
        &mut self,
        owner: &AccountId,
        spender: &AccountId,
        assets: Amount,
    ) -> VaultResult<()> {
        let current = self.allowance(owner, spender);
        if assets > current {
            return Err(VaultError::InsufficientAllowance {
                requested: assets,
                available: current,
            });
        }
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), current - assets);
        Ok(())
    }

    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &u128)> {
        self.units.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    fn bob() -> AccountId {
        AccountId::new("bob")
    }

    #[test]
    fn sole_staker_one_to_one() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        assert_eq!(pool.balance_of(&alice()), 100);
        assert_eq!(pool.total_supply(), 100);
    }

    #[test]
    fn donation_raises_claim_before_second_staker() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        pool.credit_yield(50).unwrap();
        assert_eq!(pool.balance_of(&alice()), 150);

        // Second depositor of 50 gets units worth 50/150 of the prior pool,
        // not 1:1.
        let minted = pool.deposit(&bob(), 50).unwrap();
        assert_eq!(minted, 100 * 50 / 150);
        assert_eq!(pool.balance_of(&bob()), 50);
        // Alice keeps her 150 claim within rounding.
        assert!(pool.balance_of(&alice()) >= 149);
    }

    #[test]
    fn early_depositor_captures_unclaimed_inflow() {
        let mut pool = SharePool::new();
        pool.credit_yield(50).unwrap();
        pool.deposit(&alice(), 50).unwrap();
        assert_eq!(pool.balance_of(&alice()), 100);
    }

    #[test]
    fn withdraw_reduces_balance_and_pool() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        pool.withdraw_assets(&alice(), 40).unwrap();
        assert_eq!(pool.balance_of(&alice()), 60);
        assert_eq!(pool.total_supply(), 60);
    }

    #[test]
    fn full_withdraw_leaves_no_dust() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        pool.credit_yield(33).unwrap();
        let all = pool.balance_of(&alice());
        pool.withdraw_assets(&alice(), all).unwrap();
        assert_eq!(pool.balance_of(&alice()), 0);
        assert_eq!(pool.holders().count(), 0);
    }

    #[test]
    fn withdraw_beyond_balance_fails() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        assert!(matches!(
            pool.withdraw_assets(&alice(), 101),
            Err(VaultError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn transfer_moves_value_not_pool_assets() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        pool.transfer(&alice(), &bob(), 30).unwrap();
        assert_eq!(pool.balance_of(&alice()), 70);
        assert_eq!(pool.balance_of(&bob()), 30);
        assert_eq!(pool.total_supply(), 100);
    }

    #[test]
    fn allowance_lifecycle() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 100).unwrap();
        pool.approve(&alice(), &bob(), 60);
        assert_eq!(pool.allowance(&alice(), &bob()), 60);
        pool.spend_allowance(&alice(), &bob(), 40).unwrap();
        assert_eq!(pool.allowance(&alice(), &bob()), 20);
        assert!(matches!(
            pool.spend_allowance(&alice(), &bob(), 21),
            Err(VaultError::InsufficientAllowance { .. })
        ));
    }

    #[test]
    fn conversion_roundtrip_within_rounding() {
        let mut pool = SharePool::new();
        pool.deposit(&alice(), 1_000).unwrap();
        pool.credit_yield(333).unwrap();
        for assets in [1u64, 7, 100, 999] {
            let units = pool.to_share_units(assets);
            let back = pool.to_assets(units);
            assert!(back <= assets);
            assert!(assets - back <= 1, "assets={assets} back={back}");
        }
    }
}
