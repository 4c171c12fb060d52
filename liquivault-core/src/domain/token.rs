use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset quantity in token base units.
pub type Amount = u64;

/// Basis-point denominator used by the threshold and fee-split math.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Token identifier, e.g. "USDC".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `amount * bps / 10_000` with a widened intermediate so the product cannot
/// overflow. The result is always <= amount for bps <= 10_000.
pub fn bps_share(amount: Amount, bps: u64) -> Amount {
    debug_assert!(bps <= BPS_DENOMINATOR);
    ((amount as u128 * bps as u128) / BPS_DENOMINATOR as u128) as Amount
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bps_share_basic() {
        assert_eq!(bps_share(10_000, 7_500), 7_500);
        assert_eq!(bps_share(100, 5_000), 50);
        assert_eq!(bps_share(1, 5_000), 0); // floor division
        assert_eq!(bps_share(0, 10_000), 0);
    }

    #[test]
    fn bps_share_no_overflow_at_max() {
        // u64::MAX * 10_000 overflows u64 but not the u128 intermediate.
        assert_eq!(bps_share(Amount::MAX, 10_000), Amount::MAX);
    }
}
