//! Per-token balance and fee counters.

use crate::domain::{Amount, TokenId};
use crate::errors::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters for one supported token.
///
/// `balance` mirrors the vault's real holdings of the token and is
/// reconciled against the token environment after every mutating call.
/// The fee invariant `fees_accrued + fees_reserved <= balance` must hold at
/// all times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    pub balance: Amount,
    /// Claimable by the fee collector.
    pub fees_accrued: Amount,
    /// Escrowed for in-flight orders.
    pub fees_reserved: Amount,
    /// Net amount moved out through the bridge and not yet returned.
    pub bridge_outstanding: Amount,
}

impl TokenLedger {
    pub fn credit(&mut self, amount: Amount) -> VaultResult<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: Amount) -> VaultResult<()> {
        if amount > self.balance {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub fn reserve_fee(&mut self, fee: Amount) -> VaultResult<()> {
        self.fees_reserved = self
            .fees_reserved
            .checked_add(fee)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Resolve a reserved fee: release the full reservation and accrue
    /// `keep` of it. Fill keeps everything; revert keeps the penalty.
    pub fn resolve_fee(&mut self, reserved: Amount, keep: Amount) -> VaultResult<()> {
        debug_assert!(keep <= reserved);
        if reserved > self.fees_reserved {
            return Err(VaultError::InsufficientBalance {
                requested: reserved,
                available: self.fees_reserved,
            });
        }
        self.fees_reserved -= reserved;
        self.fees_accrued = self
            .fees_accrued
            .checked_add(keep)
            .ok_or(VaultError::MathOverflow)?;
        Ok(())
    }

    /// Zero the accrued counter and return the claimable amount.
    pub fn take_accrued(&mut self) -> Amount {
        std::mem::take(&mut self.fees_accrued)
    }

    /// Balance not earmarked for fees.
    pub fn unencumbered(&self) -> Amount {
        self.balance.saturating_sub(self.fee_total())
    }

    pub fn fee_total(&self) -> Amount {
        self.fees_accrued.saturating_add(self.fees_reserved)
    }

    /// Fee invariant check, audited after every mutating vault call.
    pub fn fees_covered(&self) -> bool {
        self.fee_total() <= self.balance
    }
}

/// All token ledgers plus the supported-token registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBook {
    ledgers: BTreeMap<TokenId, TokenLedger>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, token: TokenId) -> VaultResult<()> {
        if self.ledgers.contains_key(&token) {
            return Err(VaultError::DuplicateToken(token));
        }
        self.ledgers.insert(token, TokenLedger::default());
        Ok(())
    }

    pub fn is_supported(&self, token: &TokenId) -> bool {
        self.ledgers.contains_key(token)
    }

    pub fn get(&self, token: &TokenId) -> VaultResult<&TokenLedger> {
        self.ledgers
            .get(token)
            .ok_or_else(|| VaultError::InvalidToken(token.clone()))
    }

    pub fn get_mut(&mut self, token: &TokenId) -> VaultResult<&mut TokenLedger> {
        self.ledgers
            .get_mut(token)
            .ok_or_else(|| VaultError::InvalidToken(token.clone()))
    }

    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.ledgers.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TokenId, &TokenLedger)> {
        self.ledgers.iter()
    }
}
