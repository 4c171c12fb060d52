//! Collaborator traits: the seams between the vault core and the outside
//! world.
//!
//! The vault treats all of these as opaque capabilities. In particular it
//! never trusts a `CallOutcome` without re-reading its own balances from the
//! `TokenEnv` afterwards — the environment, not the collaborator, is the one
//! source of physical truth.

use crate::domain::{AccountId, Amount, Nonce, TokenId};
use crate::errors::{VaultError, VaultResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The real token world: standard transfer/approve semantics.
///
/// `transfer_from` must fail unless `from` granted `spender` a sufficient
/// allowance. Implementations may host non-standard tokens; the vault
/// tolerates them by resetting approvals to zero after every external call.
pub trait TokenEnv {
    fn balance_of(&self, token: &TokenId, holder: &AccountId) -> Amount;

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> VaultResult<()>;

    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> VaultResult<()>;

    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> VaultResult<()>;

    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount;
}

/// An opaque call to be routed through the forwarding collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalCall {
    pub target: AccountId,
    /// Opaque payload; only the forwarder interprets it.
    pub payload: String,
}

/// Self-reported result of an external call. Untrusted: the vault verifies
/// every amount against its own balance reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub output_token: Option<TokenId>,
    pub output_amount: Amount,
}

/// Role-gated call forwarding.
///
/// Contract: on `Err` the forwarder must leave no effects in the
/// environment, mirroring transaction revert semantics.
pub trait CallForwarder {
    fn execute(&mut self, call: &ExternalCall, env: &mut dyn TokenEnv) -> VaultResult<CallOutcome>;
}

/// One price observation from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Price in feed base units (e.g. 1e8 fixed point).
    pub price: u64,
    pub updated_at: DateTime<Utc>,
}

/// Read-only price dependency in the `latestRoundData` style.
pub trait PriceFeed {
    fn latest_round(&self) -> RoundData;
}

/// Optional guard over deposits and fills: rejects when the reference price
/// leaves the configured band or the feed goes stale beyond the heartbeat.
pub struct CircuitBreaker {
    feed: Box<dyn PriceFeed + Send + Sync>,
    min_price: u64,
    max_price: u64,
    heartbeat: Duration,
}

impl CircuitBreaker {
    pub fn new(
        feed: Box<dyn PriceFeed + Send + Sync>,
        min_price: u64,
        max_price: u64,
        heartbeat: Duration,
    ) -> Self {
        Self {
            feed,
            min_price,
            max_price,
            heartbeat,
        }
    }

    pub fn check(&self, now: DateTime<Utc>) -> VaultResult<()> {
        let round = self.feed.latest_round();
        if now.signed_duration_since(round.updated_at) > self.heartbeat {
            return Err(VaultError::StalePrice);
        }
        if round.price < self.min_price || round.price > self.max_price {
            return Err(VaultError::PriceOutOfBounds);
        }
        Ok(())
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("min_price", &self.min_price)
            .field("max_price", &self.max_price)
            .field("heartbeat", &self.heartbeat)
            .finish_non_exhaustive()
    }
}

/// A nonce-guarded off-chain authorization. Signature verification itself is
/// external; the core only consumes the capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
    pub signer: AccountId,
    pub nonce: Nonce,
    /// Opaque signature blob, checked by the verifier.
    pub signature: String,
}

/// "Verify and consume nonce" capability. A permit verifies at most once;
/// replay must fail with `InvalidSignature`.
pub trait PermitVerifier {
    fn verify_and_consume(&mut self, permit: &Permit) -> VaultResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedFeed(RoundData);

    impl PriceFeed for FixedFeed {
        fn latest_round(&self) -> RoundData {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn breaker(price: u64, age_secs: i64) -> CircuitBreaker {
        CircuitBreaker::new(
            Box::new(FixedFeed(RoundData {
                price,
                updated_at: now() - Duration::seconds(age_secs),
            })),
            99_000_000,
            101_000_000,
            Duration::seconds(3_600),
        )
    }

    #[test]
    fn fresh_in_band_price_passes() {
        assert!(breaker(100_000_000, 60).check(now()).is_ok());
    }

    #[test]
    fn stale_round_fails() {
        assert_eq!(
            breaker(100_000_000, 3_601).check(now()),
            Err(VaultError::StalePrice)
        );
    }

    #[test]
    fn depeg_fails() {
        assert_eq!(
            breaker(95_000_000, 60).check(now()),
            Err(VaultError::PriceOutOfBounds)
        );
        assert_eq!(
            breaker(102_000_000, 60).check(now()),
            Err(VaultError::PriceOutOfBounds)
        );
    }
}
