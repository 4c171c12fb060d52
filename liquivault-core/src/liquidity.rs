//! Liquidity availability calculator.
//!
//! Pure functions of current state, recomputed on every read and never
//! cached. A threshold change takes effect on the next read because nothing
//! is stored pre-derived.

use crate::domain::{bps_share, Amount, BPS_DENOMINATOR};
use crate::errors::{VaultError, VaultResult};

pub fn validate_threshold(bps: u64) -> VaultResult<()> {
    if bps > BPS_DENOMINATOR {
        return Err(VaultError::InvalidThreshold(bps));
    }
    Ok(())
}

/// The redemption buffer: the portion of staked principal that must remain
/// in the vault regardless of off-chain settlement state.
///
/// `total_staked * (10_000 - threshold_bps) / 10_000`
pub fn min_asset_balance(total_staked: Amount, threshold_bps: u64) -> Amount {
    bps_share(total_staked, BPS_DENOMINATOR - threshold_bps)
}

/// How much may safely leave right now: the balance above the floor, clamped
/// so it can never read negative (and never above the real balance).
pub fn available_assets(balance: Amount, floor: Amount) -> Amount {
    balance.saturating_sub(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_bounds() {
        assert!(validate_threshold(0).is_ok());
        assert!(validate_threshold(10_000).is_ok());
        assert_eq!(
            validate_threshold(10_001),
            Err(VaultError::InvalidThreshold(10_001))
        );
    }

    #[test]
    fn threshold_is_the_withdrawable_fraction() {
        // staked 100, threshold 7500 -> 75 available, 25 floor
        assert_eq!(min_asset_balance(100, 7_500), 25);
        assert_eq!(available_assets(100, min_asset_balance(100, 7_500)), 75);

        // lowering the threshold to 1000 raises the floor to 90
        assert_eq!(min_asset_balance(100, 1_000), 90);
        assert_eq!(available_assets(100, min_asset_balance(100, 1_000)), 10);
    }

    #[test]
    fn availability_clamps_at_zero() {
        // balance below the floor (capital still in flight off-chain)
        assert_eq!(available_assets(20, 25), 0);
    }

    #[test]
    fn full_threshold_frees_everything() {
        assert_eq!(min_asset_balance(1_000, 10_000), 0);
        assert_eq!(available_assets(1_000, 0), 1_000);
    }
}
