//! Shared price feed handle for driving the circuit breaker in scenarios.

use chrono::{DateTime, Utc};
use liquivault_core::external::{PriceFeed, RoundData};
use std::sync::{Arc, Mutex};

/// A feed whose latest round can be updated from outside the vault while a
/// `CircuitBreaker` holds the reading end. Cloning shares the same round.
#[derive(Debug, Clone)]
pub struct SharedFeed {
    round: Arc<Mutex<RoundData>>,
}

impl SharedFeed {
    pub fn new(price: u64, updated_at: DateTime<Utc>) -> Self {
        Self {
            round: Arc::new(Mutex::new(RoundData { price, updated_at })),
        }
    }

    pub fn set(&self, price: u64, updated_at: DateTime<Utc>) {
        let mut round = self.round.lock().expect("feed lock poisoned");
        round.price = price;
        round.updated_at = updated_at;
    }
}

impl PriceFeed for SharedFeed {
    fn latest_round(&self) -> RoundData {
        *self.round.lock().expect("feed lock poisoned")
    }
}
