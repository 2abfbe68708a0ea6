//! Exact arithmetic over on-chain amounts.
//!
//! Amounts stay in `U256` base units until they are rendered; nothing here
//! goes through floating point.

use ethereum_types::{U256, U512};

/// Decimal places of the chain's smallest unit.
pub const DECIMALS: usize = 18;

/// Sum of two amounts. Saturates instead of wrapping.
pub fn total(locked: U256, unlocked: U256) -> U256 {
    locked.saturating_add(unlocked)
}

/// Renders a base-unit amount in display units, rounded half-up to two
/// decimals.
pub fn format_units(amount: U256) -> String {
    let cent = U256::exp10(DECIMALS - 2);
    let half_cent = cent / U256::from(2u64);
    let cents = amount.saturating_add(half_cent) / cent;
    let hundred = U256::from(100u64);
    let whole = cents / hundred;
    let fraction = (cents % hundred).low_u64();
    format!("{whole}.{fraction:02}")
}

/// A decrease between two totals that crossed the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDrop {
    pub previous: U256,
    pub current: U256,
    pub change: U256,
}

impl BalanceDrop {
    /// Percentage of `previous` lost, rounded half-up to two decimals.
    pub fn percent(&self) -> String {
        let previous = U512::from(self.previous);
        if previous.is_zero() {
            return "0.00".to_owned();
        }
        let numerator = self.change.full_mul(U256::from(20_000u64)) + previous;
        let hundredths = (numerator / (previous * U512::from(2u64))).low_u64();
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
    }
}

/// Returns the drop when `current` is below `previous` by strictly more than
/// `threshold_percent` of `previous`. A zero `previous` never reports.
pub fn decrease_exceeding(
    previous: U256,
    current: U256,
    threshold_percent: u64,
) -> Option<BalanceDrop> {
    if previous.is_zero() || current >= previous {
        return None;
    }

    let change = previous - current;
    let scaled_change = change.full_mul(U256::from(100u64));
    let allowed = previous.full_mul(U256::from(threshold_percent));
    if scaled_change <= allowed {
        return None;
    }

    Some(BalanceDrop {
        previous,
        current,
        change,
    })
}
