// ============================================================================
// Units - smallest-unit integers <-> human decimals
// ============================================================================
//
// The engine only ever sees integer amounts in the collateral's smallest unit.
// These helpers exist for the edges: logs, API views and parsing user input.
// mUSDC uses 6 decimals; spot prices are fixed-point with 18.
//
// ============================================================================

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Decimals of the mock USDC collateral
pub const COLLATERAL_DECIMALS: u32 = 6;

/// Decimals of the fixed-point spot prices
pub const PRICE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("Invalid number: {0}")]
    Invalid(String),

    #[error("Negative amounts are not allowed")]
    Negative,

    #[error("Too many decimal places: {found} (max {max})")]
    TooPrecise { found: u32, max: u32 },

    #[error("Amount out of range")]
    Overflow,
}

/// Convert a smallest-unit integer into a decimal value
pub fn to_decimal(amount: u128, decimals: u32) -> Result<Decimal, UnitsError> {
    let signed = i128::try_from(amount).map_err(|_| UnitsError::Overflow)?;
    Decimal::try_from_i128_with_scale(signed, decimals)
        .map(|d| d.normalize())
        .map_err(|_| UnitsError::Overflow)
}

/// Format a smallest-unit integer, e.g. `1_500_000` with 6 decimals -> `"1.5"`
pub fn format_units(amount: u128, decimals: u32) -> Result<String, UnitsError> {
    to_decimal(amount, decimals).map(|d| d.to_string())
}

/// Log-friendly formatting of collateral amounts; falls back to the raw integer
pub fn display_collateral(amount: u128) -> String {
    format_units(amount, COLLATERAL_DECIMALS).unwrap_or_else(|_| amount.to_string())
}

/// Parse user input into smallest units. Empty input parses as zero.
pub fn parse_units(input: &str, decimals: u32) -> Result<u128, UnitsError> {
    let text = input.trim();
    if text.is_empty() {
        return Ok(0);
    }

    let value = Decimal::from_str(text).map_err(|_| UnitsError::Invalid(text.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(UnitsError::Negative);
    }

    let value = value.normalize();
    let scale = value.scale();
    if scale > decimals {
        return Err(UnitsError::TooPrecise { found: scale, max: decimals });
    }

    let mantissa = u128::try_from(value.mantissa().abs()).map_err(|_| UnitsError::Overflow)?;
    let factor = 10u128
        .checked_pow(decimals - scale)
        .ok_or(UnitsError::Overflow)?;

    mantissa.checked_mul(factor).ok_or(UnitsError::Overflow)
}
