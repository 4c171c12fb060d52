//! Vault error taxonomy.
//!
//! Every failure is a typed, parameterized error. There is no in-crate retry:
//! a failed guard or a failed external call surfaces immediately and the
//! operation commits nothing.

use crate::domain::{Amount, OrderHash, OrderStatus, TokenId};
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("token {0:?} is not supported")]
    InvalidToken(TokenId),

    #[error("token {0:?} is already registered")]
    DuplicateToken(TokenId),

    #[error("order {0} already exists")]
    DuplicateOrder(OrderHash),

    #[error("order {0} does not exist")]
    OrderNotFound(OrderHash),

    #[error("order {0} cannot be acted on in status {1:?}")]
    InvalidStatus(OrderHash, OrderStatus),

    #[error("requested {requested} exceeds available liquidity {available}")]
    InsufficientLiquidity { requested: Amount, available: Amount },

    #[error("requested {requested} exceeds balance {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("requested {requested} exceeds allowance {available}")]
    InsufficientAllowance { requested: Amount, available: Amount },

    #[error("fill deadline is outside the allowed window")]
    InvalidDeadline,

    #[error("revert buffer has not elapsed past the fill deadline")]
    DeadlineNotPassed,

    #[error("fill deadline has passed")]
    DeadlinePassed,

    #[error("invalid external call target: {0}")]
    InvalidTarget(String),

    #[error("external call failed: {0}")]
    ExternalCallFailed(String),

    #[error("swap underdelivered: minimum {min}, realized {actual}")]
    InvalidAmountOut { min: Amount, actual: Amount },

    #[error("threshold {0} exceeds the basis-point denominator")]
    InvalidThreshold(u64),

    #[error("caller does not hold the admin role")]
    IsNotAdmin,

    #[error("caller is not authorized for this operation")]
    InvalidCaller,

    #[error("vault is paused")]
    Paused,

    #[error("authorization signature is invalid or its nonce was already consumed")]
    InvalidSignature,

    #[error("price feed round is stale beyond the heartbeat")]
    StalePrice,

    #[error("price is outside the configured bounds")]
    PriceOutOfBounds,

    #[error("arithmetic overflow in ledger computation")]
    MathOverflow,

    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshotVersion(u32),

    #[error("snapshot could not be decoded: {0}")]
    SnapshotCorrupt(String),
}
