//! Versioned persistent snapshot of vault state.
//!
//! There is no in-place upgrade of a running vault; state is exported as a
//! `VaultSnapshot` carrying an explicit version, and older snapshots are
//! brought forward through explicit migration functions before decoding.
//! The event log is not part of the snapshot; callers drain and persist it
//! separately.

use crate::auth::Mode;
use crate::domain::Amount;
use crate::errors::{VaultError, VaultResult};
use crate::ledger::{LedgerBook, SharePool};
use crate::orders::OrderBook;
use crate::vault::{Vault, VaultConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current snapshot schema version.
///
/// v1 predates per-token `bridge_outstanding`; migration backfills zero.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub version: u32,
    pub config: VaultConfig,
    pub mode: Mode,
    pub total_staked_assets: Amount,
    pub ledgers: LedgerBook,
    pub pool: SharePool,
    pub orders: OrderBook,
}

impl VaultSnapshot {
    pub fn capture(vault: &Vault) -> Self {
        let (config, mode, total_staked_assets, ledgers, pool, orders) = vault.snapshot_parts();
        Self {
            version: SNAPSHOT_VERSION,
            config: config.clone(),
            mode,
            total_staked_assets,
            ledgers: ledgers.clone(),
            pool: pool.clone(),
            orders: orders.clone(),
        }
    }

    /// Rebuild a vault from the snapshot. Collaborators (circuit breaker)
    /// are not persisted and must be reattached.
    pub fn restore(self) -> VaultResult<Vault> {
        Vault::from_parts(
            self.config,
            self.mode,
            self.total_staked_assets,
            self.ledgers,
            self.pool,
            self.orders,
        )
    }
}

pub fn encode_snapshot(snapshot: &VaultSnapshot) -> VaultResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(|e| VaultError::SnapshotCorrupt(e.to_string()))
}

/// Decode a snapshot of any supported version, migrating to the latest
/// schema first. Unknown versions fail typed.
pub fn decode_snapshot(json: &str) -> VaultResult<VaultSnapshot> {
    let mut value: Value =
        serde_json::from_str(json).map_err(|e| VaultError::SnapshotCorrupt(e.to_string()))?;
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| VaultError::SnapshotCorrupt("missing version field".into()))?
        as u32;
    match version {
        1 => migrate_v1_to_v2(&mut value)?,
        SNAPSHOT_VERSION => {}
        other => return Err(VaultError::UnsupportedSnapshotVersion(other)),
    }
    serde_json::from_value(value).map_err(|e| VaultError::SnapshotCorrupt(e.to_string()))
}

/// v1 -> v2: per-token ledgers gain `bridge_outstanding`, backfilled to zero.
fn migrate_v1_to_v2(value: &mut Value) -> VaultResult<()> {
    let ledgers = value
        .get_mut("ledgers")
        .and_then(|l| l.get_mut("ledgers"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| VaultError::SnapshotCorrupt("v1 snapshot missing ledgers map".into()))?;
    for ledger in ledgers.values_mut() {
        let obj = ledger
            .as_object_mut()
            .ok_or_else(|| VaultError::SnapshotCorrupt("v1 ledger entry is not an object".into()))?;
        obj.entry("bridge_outstanding").or_insert(Value::from(0u64));
    }
    value["version"] = Value::from(SNAPSHOT_VERSION);
    Ok(())
}
