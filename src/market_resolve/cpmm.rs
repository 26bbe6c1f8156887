use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::ledger::Amount;

// ============================================================================
// CPMM CONSTANTS
// ============================================================================

/// Constant Product Market Maker (CPMM) for binary markets
///
/// Formula: x * y = k (constant product)
///
/// - x = YES shares in the pool
/// - y = NO shares in the pool
/// - k = x * y, held fixed across a swap (grows only by fees)
///
/// Price calculation:
/// - Price(YES) = y / (x + y)
/// - Price(NO) = 1 - Price(YES)
/// - Prices always sum to exactly SCALE

/// Fixed-point scale of spot prices (1e18)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Basis point denominator
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Trading fee applied when no other rate is configured (0%)
pub const DEFAULT_FEE_BPS: u32 = 0;

/// Highest fee a registry may configure (10%)
pub const MAX_FEE_BPS: u32 = 1_000;

/// Quote for swapping `amount_in` of one side into the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount_in: Amount,
    /// Input left after the fee, used in the constant-product computation
    pub effective_in: Amount,
    pub fee: Amount,
    pub amount_out: Amount,
    /// Pool reserve of the input side after the swap (full input, fee included)
    pub new_reserve_in: Amount,
    /// Pool reserve of the output side after the swap
    pub new_reserve_out: Amount,
}

/// Constant product of two reserves
pub fn invariant_k(yes_reserve: Amount, no_reserve: Amount) -> MarketResult<Amount> {
    yes_reserve
        .checked_mul(no_reserve)
        .ok_or(MarketError::ArithmeticFault)
}

/// Quote a swap against the pool
///
/// # Arguments
/// * `reserve_in` - Pool reserve of the side being paid in
/// * `reserve_out` - Pool reserve of the side being paid out
/// * `amount_in` - Shares the trader gives up
/// * `fee_bps` - Fee in basis points, deducted from the input
///
/// # Returns
/// The quote, with `new_reserve_out = floor(k / (reserve_in + effective_in))`
/// and `amount_out = reserve_out - new_reserve_out`
pub fn quote_swap(
    reserve_in: Amount,
    reserve_out: Amount,
    amount_in: Amount,
    fee_bps: u32,
) -> MarketResult<SwapQuote> {
    if amount_in == 0 {
        return Err(MarketError::ZeroAmount);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(MarketError::PoolEmpty);
    }

    let fee_bps = fee_bps.min(BPS_DENOMINATOR);
    let effective_in = amount_in
        .checked_mul(Amount::from(BPS_DENOMINATOR - fee_bps))
        .ok_or(MarketError::ArithmeticFault)?
        / Amount::from(BPS_DENOMINATOR);
    let fee = amount_in - effective_in;

    let k = invariant_k(reserve_out, reserve_in)?;
    let denominator = reserve_in
        .checked_add(effective_in)
        .ok_or(MarketError::ArithmeticFault)?;
    let new_reserve_out = k / denominator;
    let amount_out = reserve_out
        .checked_sub(new_reserve_out)
        .ok_or(MarketError::ArithmeticFault)?;

    if amount_out == 0 {
        return Err(MarketError::ZeroAmount);
    }

    let new_reserve_in = reserve_in
        .checked_add(amount_in)
        .ok_or(MarketError::ArithmeticFault)?;

    Ok(SwapQuote {
        amount_in,
        effective_in,
        fee,
        amount_out,
        new_reserve_in,
        new_reserve_out,
    })
}

/// Spot prices scaled by SCALE: `(price_yes, price_no)`
///
/// Price(YES) = no_reserve * SCALE / (yes_reserve + no_reserve), Price(NO) is
/// the complement so the pair always sums to SCALE.
pub fn spot_prices(yes_reserve: Amount, no_reserve: Amount) -> MarketResult<(u128, u128)> {
    let total = yes_reserve
        .checked_add(no_reserve)
        .ok_or(MarketError::ArithmeticFault)?;
    if total == 0 {
        return Err(MarketError::PoolEmpty);
    }

    let price_yes = no_reserve
        .checked_mul(SCALE)
        .ok_or(MarketError::ArithmeticFault)?
        / total;

    Ok((price_yes, SCALE - price_yes))
}

// ============================================================================
// UNIT TESTS
// ============================================================================
