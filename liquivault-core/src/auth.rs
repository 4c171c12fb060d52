//! Explicit authorization context and pause mode.
//!
//! Instead of ambient role storage, every operation receives an
//! `AuthContext` naming the caller and the roles it holds, and the pause
//! flag is an explicit `Mode` checked by a pure guard. Role assignment is
//! the embedding application's concern.

use crate::domain::AccountId;
use crate::errors::{VaultError, VaultResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Configuration, pause, fee claims.
    Admin,
    /// Fill/revert orders, rebalance bridge liquidity.
    Orchestrator,
    /// Trusted deposit/order-creation caller.
    Executor,
}

/// Capability object passed into every vault operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub account: AccountId,
    pub roles: Vec<Role>,
}

impl AuthContext {
    pub fn new(account: AccountId, roles: Vec<Role>) -> Self {
        Self { account, roles }
    }

    /// A context with no roles: an ordinary LP or trader.
    pub fn user(account: AccountId) -> Self {
        Self { account, roles: Vec::new() }
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Vault operating mode. The one piece of process-wide mutable state the
/// core exposes; settable only through the admin-gated vault operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Active,
    Paused,
}

/// Guard: fails with `Paused` unless the vault is active.
pub fn ensure_active(mode: Mode) -> VaultResult<()> {
    match mode {
        Mode::Active => Ok(()),
        Mode::Paused => Err(VaultError::Paused),
    }
}

/// Guard: fails unless the context holds the role. Admin failures get their
/// own error variant for precise diagnosis.
pub fn ensure_role(ctx: &AuthContext, role: Role) -> VaultResult<()> {
    if ctx.has(role) {
        Ok(())
    } else if role == Role::Admin {
        Err(VaultError::IsNotAdmin)
    } else {
        Err(VaultError::InvalidCaller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_mode_rejects() {
        assert_eq!(ensure_active(Mode::Active), Ok(()));
        assert_eq!(ensure_active(Mode::Paused), Err(VaultError::Paused));
    }

    #[test]
    fn role_guard() {
        let orch = AuthContext::new(AccountId::new("orch"), vec![Role::Orchestrator]);
        assert!(ensure_role(&orch, Role::Orchestrator).is_ok());
        assert_eq!(ensure_role(&orch, Role::Admin), Err(VaultError::IsNotAdmin));
        assert_eq!(
            ensure_role(&orch, Role::Executor),
            Err(VaultError::InvalidCaller)
        );
    }

    #[test]
    fn user_context_has_no_roles() {
        let user = AuthContext::user(AccountId::new("lp"));
        assert!(!user.has(Role::Admin));
        assert!(!user.has(Role::Orchestrator));
    }
}
