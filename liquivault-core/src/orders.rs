//! Order book: hash-keyed records and the Created -> {Filled | Reverted}
//! state machine.
//!
//! The status field is the sole concurrency-control primitive: every
//! transition is a check-then-act within one atomic vault call, so an order
//! can never be filled twice, reverted twice, or filled after a revert.

use crate::domain::{Order, OrderAuditEntry, OrderHash, OrderRecord, OrderStatus};
use crate::errors::{VaultError, VaultResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    orders: BTreeMap<OrderHash, OrderRecord>,
    audit: Vec<OrderAuditEntry>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new order as Created. Fails if the hash already exists.
    pub fn insert(&mut self, order: Order, now: DateTime<Utc>) -> VaultResult<OrderHash> {
        let hash = order.hash();
        if self.orders.contains_key(&hash) {
            return Err(VaultError::DuplicateOrder(hash));
        }
        self.orders.insert(
            hash.clone(),
            OrderRecord {
                order,
                status: OrderStatus::Created,
                created_at: now,
            },
        );
        Ok(hash)
    }

    pub fn contains(&self, hash: &OrderHash) -> bool {
        self.orders.contains_key(hash)
    }

    pub fn get(&self, hash: &OrderHash) -> VaultResult<&OrderRecord> {
        self.orders
            .get(hash)
            .ok_or_else(|| VaultError::OrderNotFound(hash.clone()))
    }

    /// The record if and only if the order is still Created.
    pub fn expect_created(&self, hash: &OrderHash) -> VaultResult<&OrderRecord> {
        let record = self.get(hash)?;
        if record.status != OrderStatus::Created {
            return Err(VaultError::InvalidStatus(hash.clone(), record.status));
        }
        Ok(record)
    }

    pub fn mark_filled(&mut self, hash: &OrderHash, now: DateTime<Utc>) -> VaultResult<()> {
        self.transition(hash, OrderStatus::Filled, now)
    }

    pub fn mark_reverted(&mut self, hash: &OrderHash, now: DateTime<Utc>) -> VaultResult<()> {
        self.transition(hash, OrderStatus::Reverted, now)
    }

    fn transition(
        &mut self,
        hash: &OrderHash,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> VaultResult<()> {
        let record = self
            .orders
            .get_mut(hash)
            .ok_or_else(|| VaultError::OrderNotFound(hash.clone()))?;
        if record.status != OrderStatus::Created {
            return Err(VaultError::InvalidStatus(hash.clone(), record.status));
        }
        self.audit.push(OrderAuditEntry {
            order_hash: hash.clone(),
            at: now,
            from: record.status,
            to,
        });
        record.status = to;
        Ok(())
    }

    pub fn audit_trail(&self) -> &[OrderAuditEntry] {
        &self.audit
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OrderHash, &OrderRecord)> {
        self.orders.iter()
    }
}
