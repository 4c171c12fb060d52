//! Permit verification and permit-gated order creation.
//!
//! The verifier models an off-chain signature scheme deterministically: a
//! permit's signature must be the BLAKE3 hex of `"{signer}:{nonce}"`, and
//! each (signer, nonce) pair verifies at most once. The gateway lets an
//! unprivileged relayer create orders on a signer's behalf by spending a
//! permit instead of holding the executor role itself.

use chrono::{DateTime, Utc};
use liquivault_core::auth::{AuthContext, Role};
use liquivault_core::domain::{AccountId, Order, OrderHash};
use liquivault_core::errors::{VaultError, VaultResult};
use liquivault_core::external::{Permit, PermitVerifier, TokenEnv};
use liquivault_core::vault::Vault;
use std::collections::{BTreeSet, HashMap};

pub fn sign_permit(signer: &AccountId, nonce: u64) -> Permit {
    Permit {
        signer: signer.clone(),
        nonce: liquivault_core::domain::Nonce(nonce),
        signature: expected_signature(signer, nonce),
    }
}

fn expected_signature(signer: &AccountId, nonce: u64) -> String {
    blake3::hash(format!("{signer}:{nonce}").as_bytes())
        .to_hex()
        .to_string()
}

/// Consume-once nonce registry.
#[derive(Debug, Clone, Default)]
pub struct NonceRegistry {
    consumed: HashMap<AccountId, BTreeSet<u64>>,
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermitVerifier for NonceRegistry {
    fn verify_and_consume(&mut self, permit: &Permit) -> VaultResult<()> {
        if permit.signature != expected_signature(&permit.signer, permit.nonce.0) {
            return Err(VaultError::InvalidSignature);
        }
        let consumed = self.consumed.entry(permit.signer.clone()).or_default();
        if !consumed.insert(permit.nonce.0) {
            return Err(VaultError::InvalidSignature);
        }
        Ok(())
    }
}

/// Permit-gated entry into `create_order`.
///
/// Holds an executor-role context of its own; a relayer presenting a valid
/// permit for the order's trader gets the order created under that
/// capability. The permit is consumed even when order creation then fails,
/// matching nonce semantics.
pub struct PermitGateway<V: PermitVerifier> {
    ctx: AuthContext,
    verifier: V,
}

impl<V: PermitVerifier> PermitGateway<V> {
    pub fn new(gateway_account: AccountId, verifier: V) -> Self {
        Self {
            ctx: AuthContext::new(gateway_account, vec![Role::Executor]),
            verifier,
        }
    }

    pub fn create_order_with_permit(
        &mut self,
        vault: &mut Vault,
        permit: &Permit,
        order: Order,
        now: DateTime<Utc>,
        env: &mut dyn TokenEnv,
    ) -> VaultResult<OrderHash> {
        if permit.signer != order.trader {
            return Err(VaultError::InvalidSignature);
        }
        self.verifier.verify_and_consume(permit)?;
        vault.create_order(&self.ctx, order, now, env)
    }
}
