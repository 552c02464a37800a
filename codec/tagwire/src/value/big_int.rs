//! An arbitrary-precision integer carried as raw two's-complement bytes.

use std::{cmp::Ordering, fmt::Display};

/// An integer of arbitrary width.
///
/// The codec does not do arithmetic on big integers; it only needs to carry
/// them losslessly. The value is kept as its minimal big-endian
/// two's-complement byte representation, which makes equality numeric
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    bytes: Vec<u8>,
}

impl BigInt {
    /// Creates a big integer from big-endian two's-complement bytes.
    ///
    /// Redundant sign bytes are stripped; an empty slice is zero.
    #[must_use]
    pub fn from_signed_bytes_be(bytes: &[u8]) -> Self {
        let mut start = 0;

        while start + 1 < bytes.len() {
            let (current, next) = (bytes[start], bytes[start + 1]);

            let redundant = (current == 0x00 && next & 0x80 == 0)
                || (current == 0xFF && next & 0x80 != 0);
            if !redundant {
                break;
            }

            start += 1;
        }

        if bytes.is_empty() {
            return Self { bytes: vec![0] };
        }

        Self { bytes: bytes[start..].to_vec() }
    }

    /// The minimal big-endian two's-complement representation.
    #[must_use]
    pub fn to_signed_bytes_be(&self) -> &[u8] { &self.bytes }

    /// Returns `true` if the integer is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool { self.bytes[0] & 0x80 != 0 }

    /// Converts to an `i128` if the value fits.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        if self.bytes.len() > 16 {
            return None;
        }

        let fill = if self.is_negative() { 0xFF } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.bytes.len()..].copy_from_slice(&self.bytes);

        Some(i128::from_be_bytes(buf))
    }

    /// Converts to an `i64` if the value fits.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|value| i64::try_from(value).ok())
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,

            // with minimal encodings a longer positive number is larger and
            // a longer negative number is smaller; equal lengths compare
            // bytewise
            (false, false) => self
                .bytes
                .len()
                .cmp(&other.bytes.len())
                .then_with(|| self.bytes.cmp(&other.bytes)),
            (true, true) => other
                .bytes
                .len()
                .cmp(&self.bytes.len())
                .then_with(|| self.bytes.cmp(&other.bytes)),
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for BigInt {
    fn from(value: i64) -> Self { Self::from(i128::from(value)) }
}

impl From<u64> for BigInt {
    fn from(value: u64) -> Self { Self::from(i128::from(value)) }
}

impl From<i128> for BigInt {
    fn from(value: i128) -> Self {
        Self::from_signed_bytes_be(&value.to_be_bytes())
    }
}

impl From<u128> for BigInt {
    fn from(value: u128) -> Self {
        let mut bytes = vec![0];
        bytes.extend_from_slice(&value.to_be_bytes());

        Self::from_signed_bytes_be(&bytes)
    }
}

impl Display for BigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(value) = self.to_i128() {
            return write!(f, "{value}");
        }

        f.write_str("0x")?;
        for byte in &self.bytes {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}
