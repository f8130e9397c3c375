//! Order-preserving encoding of `f64` values.
//!
//! Sorted-set score keys embed the score so that a plain forward scan over the
//! backend walks members in ascending score order. The encoding is the
//! big-endian IEEE-754 representation with the sign bit flipped for
//! non-negative values and every bit flipped for negative values, which makes
//! unsigned byte comparison agree with numeric comparison.

const SIGN_BIT: u64 = 1 << 63;

/// Width of an encoded score.
pub const ENCODED_LEN: usize = 8;

/// Encodes `value` so that byte order matches numeric order.
///
/// NaN has no position in that order; callers reject it before encoding.
/// Negative zero is stored as positive zero so that equal scores produce equal
/// keys.
pub fn encode(value: f64) -> [u8; ENCODED_LEN] {
    debug_assert!(!value.is_nan(), "NaN scores must be rejected by callers");

    let value = if value == 0.0 { 0.0 } else { value };
    let bits = value.to_bits();
    let bits = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT
    };

    bits.to_be_bytes()
}

/// Reverses [`encode`].
pub fn decode(encoded: [u8; ENCODED_LEN]) -> f64 {
    let bits = u64::from_be_bytes(encoded);
    // A set high bit means the original value was non-negative.
    let bits = if bits & SIGN_BIT != 0 {
        bits ^ SIGN_BIT
    } else {
        !bits
    };

    f64::from_bits(bits)
}

/// Decodes the score stored at the start of `bytes`, if there are enough of them.
pub fn decode_prefix(bytes: &[u8]) -> Option<f64> {
    let encoded: [u8; ENCODED_LEN] = bytes.get(..ENCODED_LEN)?.try_into().ok()?;
    Some(decode(encoded))
}
