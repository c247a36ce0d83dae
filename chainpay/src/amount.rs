//! Conversion between human-readable decimal amounts and integer base units.
//!
//! Chain-native assets are accounted for in their smallest indivisible unit
//! (wei for ETH). Amounts entered by people or derived from a USD price are
//! decimals. Both directions go through [`Decimal`] and [`U256`] so no value
//! ever passes through binary floating point.

use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};

/// Errors produced while converting between decimal and base-unit amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The amount is below zero.
    #[error("amount must not be negative")]
    Negative,
    /// The scaled amount does not fit in 256 bits.
    #[error("amount overflows 256-bit base units")]
    Overflow,
    /// The base-unit value cannot be expressed as a decimal at this precision.
    #[error("base-unit amount cannot be represented as a decimal")]
    Unrepresentable,
}

/// Converts a decimal amount into integer base units.
///
/// The amount is first rounded to `decimals` fractional digits (midpoint away
/// from zero), then scaled by `10^decimals`.
///
/// # Errors
///
/// Returns [`AmountError::Negative`] for amounts below zero and
/// [`AmountError::Overflow`] if the result exceeds [`U256::MAX`].
///
/// # Example
///
/// ```rust
/// use chainpay::amount::to_base_units;
/// use rust_decimal::Decimal;
///
/// let wei = to_base_units(Decimal::new(5, 2), 18).unwrap();
/// assert_eq!(wei.to_string(), "50000000000000000");
/// ```
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256, AmountError> {
    let rounded = round_amount(amount, decimals);
    let mantissa = u128::try_from(rounded.mantissa()).map_err(|_| AmountError::Negative)?;
    // After rounding the scale never exceeds `decimals`.
    let shift = u32::from(decimals).saturating_sub(rounded.scale());
    let factor = U256::from(10u8)
        .checked_pow(U256::from(shift))
        .ok_or(AmountError::Overflow)?;
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or(AmountError::Overflow)
}

/// Converts integer base units back into a decimal amount.
///
/// # Errors
///
/// Returns [`AmountError::Unrepresentable`] if the value exceeds the
/// 96-bit mantissa of [`Decimal`] or `decimals` is above its maximum scale.
pub fn from_base_units(units: U256, decimals: u8) -> Result<Decimal, AmountError> {
    let raw = u128::try_from(units).map_err(|_| AmountError::Unrepresentable)?;
    let raw = i128::try_from(raw).map_err(|_| AmountError::Unrepresentable)?;
    Decimal::try_from_i128_with_scale(raw, u32::from(decimals))
        .map(|d| d.normalize())
        .map_err(|_| AmountError::Unrepresentable)
}

/// Rounds a decimal to the given number of fractional digits, midpoint away
/// from zero.
#[must_use]
pub fn round_amount(amount: Decimal, decimals: u8) -> Decimal {
    amount.round_dp_with_strategy(u32::from(decimals), RoundingStrategy::MidpointAwayFromZero)
}
