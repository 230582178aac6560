//! Byte-order and text transcoding helpers.
//!
//! The companion app speaks in base64-wrapped binary blobs whose integer
//! fields are little-endian. Historically these blobs were assembled as hex
//! strings of byte-swapped integers; the helpers here cover both views so a
//! payload can be built from raw bytes and still be logged or compared in
//! its hex form.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{DecodeError, DecodeResult};

/// Reverse the byte order of a 16-bit value.
///
/// ```
/// assert_eq!(evehist_types::codec::swap16(0x1234), 0x3412);
/// ```
#[must_use]
pub const fn swap16(value: u16) -> u16 {
    value.swap_bytes()
}

/// Reverse the byte order of a 32-bit value.
///
/// ```
/// assert_eq!(evehist_types::codec::swap32(0x1234_5678), 0x7856_3412);
/// ```
#[must_use]
pub const fn swap32(value: u32) -> u32 {
    value.swap_bytes()
}

/// Format `value` as lower-case hex, left-padded with zeros to `width` digits.
///
/// Digits beyond `width` are cut from the left, so the result is always the
/// low `width` digits. A `width` of zero pads only to an even digit count.
///
/// ```
/// use evehist_types::codec::hex_encode;
///
/// assert_eq!(hex_encode(0xab, 4), "00ab");
/// assert_eq!(hex_encode(0x12345, 4), "2345");
/// assert_eq!(hex_encode(0xabc, 0), "0abc");
/// ```
#[must_use]
pub fn hex_encode(value: u32, width: usize) -> String {
    let mut digits = format!("{:x}", value);
    if digits.len() % 2 != 0 {
        digits.insert(0, '0');
    }
    if width == 0 {
        return digits;
    }
    if digits.len() >= width {
        digits.split_off(digits.len() - width)
    } else {
        format!("{:0>width$}", digits, width = width)
    }
}

/// Render bytes as a contiguous lower-case hex string.
#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse hex digits into bytes, ignoring every non-hex character.
///
/// Separators such as spaces, commas and dashes are allowed anywhere.
pub fn hex_to_bytes(hex: &str) -> DecodeResult<Vec<u8>> {
    let digits: Vec<u8> = hex
        .chars()
        .filter_map(|c| c.to_digit(16).map(|d| d as u8))
        .collect();

    if digits.len() % 2 != 0 {
        return Err(DecodeError::OddLength(digits.len()));
    }

    Ok(digits
        .chunks_exact(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

/// Base64 text form of raw bytes.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Raw bytes from base64 text.
pub fn decode_base64(text: &str) -> DecodeResult<Vec<u8>> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Strip non-hex characters from `hex`, reinterpret as bytes and wrap in base64.
///
/// ```
/// use evehist_types::codec::hex_to_base64;
///
/// assert_eq!(hex_to_base64("00").unwrap(), "AA==");
/// assert_eq!(hex_to_base64("01 0601").unwrap(), "AQYB");
/// ```
pub fn hex_to_base64(hex: &str) -> DecodeResult<String> {
    Ok(encode_base64(&hex_to_bytes(hex)?))
}

/// Inverse of [`hex_to_base64`]: decode base64 text and render it as hex.
pub fn base64_to_hex(text: &str) -> DecodeResult<String> {
    Ok(bytes_to_hex(&decode_base64(text)?))
}


/// Property-based tests for the codec.
///
/// Run with: `cargo test -p evehist-types codec::proptests`
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn swap32_is_an_involution(v in any::<u32>()) {
            prop_assert_eq!(swap32(swap32(v)), v);
        }

        #[test]
        fn swap16_is_an_involution(v in any::<u16>()) {
            prop_assert_eq!(swap16(swap16(v)), v);
        }

        #[test]
        fn base64_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let hex = bytes_to_hex(&bytes);
            let wrapped = hex_to_base64(&hex).unwrap();
            prop_assert_eq!(base64_to_hex(&wrapped).unwrap(), hex);
        }

        #[test]
        fn hex_encode_has_requested_width(v in any::<u32>(), width in 1usize..=8) {
            let hex = hex_encode(v, width);
            prop_assert_eq!(hex.len(), width);
            let parsed = u64::from_str_radix(&hex, 16).unwrap();
            prop_assert_eq!(parsed, u64::from(v) % (1u64 << (4 * width)));
        }
    }
}
