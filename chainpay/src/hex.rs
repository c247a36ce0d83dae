//! Best-effort parsing of the hex-encoded fields returned by EVM nodes.
//!
//! Everything here is lenient: a node answering with an empty or malformed
//! field must not abort a verification, so parsers fall back to zero and
//! matchers fall back to "no match".

use alloy_primitives::{U256, hex};

/// Strips a single leading `0x` / `0X` prefix.
fn strip_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Parses a hex-encoded integer of up to 256 bits.
///
/// Empty or malformed input yields zero.
#[must_use]
pub fn parse_hex_integer(input: &str) -> U256 {
    let digits = strip_prefix(input.trim());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return U256::ZERO;
    }
    U256::from_str_radix(digits, 16).unwrap_or(U256::ZERO)
}

/// Parses a hex-encoded `u64` such as a block number.
///
/// Empty, malformed or out-of-range input yields zero.
#[must_use]
pub fn parse_hex_u64(input: &str) -> u64 {
    let digits = strip_prefix(input.trim());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return 0;
    }
    u64::from_str_radix(digits, 16).unwrap_or(0)
}

/// Normalizes an address to lowercase with exactly one `0x` prefix.
///
/// Empty input stays empty, which callers treat as "no match".
#[must_use]
pub fn normalize_address(raw: &str) -> String {
    let body = strip_prefix(raw.trim());
    if body.is_empty() {
        return String::new();
    }
    format!("0x{}", body.to_ascii_lowercase())
}

/// Returns `true` if the UTF-8 bytes of `memo` appear in the hex payload.
///
/// The payload must be valid hex. The comparison runs over the hex encodings
/// of both sides, ignoring case, and is not anchored to any position.
#[must_use]
pub fn contains_memo(payload_hex: &str, memo: &str) -> bool {
    let payload = strip_prefix(payload_hex.trim());
    if payload.is_empty() || memo.is_empty() {
        return false;
    }
    if hex::decode(payload).is_err() {
        return false;
    }
    let needle = hex::encode(memo.as_bytes());
    payload.to_ascii_lowercase().contains(&needle)
}
