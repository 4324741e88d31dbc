//! Base-36 codec between numeric identifiers and their textual short codes.
//!
//! Encodings use the lowercase alphabet `0-9a-z` with no padding. String order
//! does not follow numeric order (`"z" > "10"`), so anything that iterates
//! codes must do so by their decoded value.

use crate::error::{CoreError, Result};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RADIX: u64 = 36;

/// Length of the longest encoding, `encode(u64::MAX) == "3w5e11264sgsf"`.
pub const MAX_LEN: usize = 13;

/// Encodes `id` as a lowercase base-36 string.
pub fn encode(mut id: u64) -> String {
    if id == 0 {
        return "0".to_string();
    }

    let mut buf = [0u8; MAX_LEN];
    let mut pos = MAX_LEN;
    while id > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(id % RADIX) as usize];
        id /= RADIX;
    }

    buf[pos..].iter().map(|&b| b as char).collect()
}

/// Decodes a canonical base-36 code back into its identifier.
///
/// Only the exact output of [`encode`] is accepted: uppercase letters, leading
/// zeros and values that overflow a `u64` are rejected with
/// [`CoreError::InvalidCode`].
pub fn decode(code: &str) -> Result<u64> {
    if code.is_empty() {
        return Err(CoreError::InvalidCode("code cannot be empty".to_string()));
    }

    if let Some(c) = code
        .chars()
        .find(|c| !matches!(c, '0'..='9' | 'a'..='z'))
    {
        return Err(CoreError::InvalidCode(format!(
            "'{code}' contains '{c}', which is outside the base-36 alphabet"
        )));
    }

    if code.len() > 1 && code.starts_with('0') {
        return Err(CoreError::InvalidCode(format!(
            "'{code}' has a leading zero"
        )));
    }

    u64::from_str_radix(code, 36)
        .map_err(|e| CoreError::InvalidCode(format!("'{code}' is out of range: {e}")))
}
