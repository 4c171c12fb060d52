//! Vault snapshot persistence on top of the core schema.

use anyhow::{Context, Result};
use liquivault_core::schema::{decode_snapshot, encode_snapshot, VaultSnapshot};
use liquivault_core::vault::Vault;
use std::path::Path;

pub fn save_snapshot(vault: &Vault, path: &Path) -> Result<()> {
    let json = encode_snapshot(&VaultSnapshot::capture(vault))
        .context("failed to encode vault snapshot")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_snapshot(path: &Path) -> Result<Vault> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = decode_snapshot(&json).context("failed to decode vault snapshot")?;
    snapshot.restore().context("failed to restore vault")
}
