//! Square bit-grid fingerprints and their hex encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::FingerprintParseError;

/// A `side x side` bit matrix stored row-major, most significant bit first.
///
/// The hex form treats the whole row-major bit string as one big-endian
/// number: one digit per 4 bits, left-padded with zero bits when `side²` is
/// not a multiple of 4. A 32x32 fingerprint is 256 hex digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    side: u32,
    words: Vec<u64>,
}

impl Fingerprint {
    /// All-zero fingerprint.
    pub fn zeros(side: u32) -> Self {
        let bits = (side as usize) * (side as usize);
        Self {
            side,
            words: vec![0; bits.div_ceil(64)],
        }
    }

    /// Build from row-major bits; extra bits are ignored, missing bits are 0.
    pub fn from_bits<I: IntoIterator<Item = bool>>(side: u32, bits: I) -> Self {
        let mut fp = Self::zeros(side);
        let n = fp.bit_len();
        for (i, bit) in bits.into_iter().take(n).enumerate() {
            if bit {
                fp.words[i / 64] |= 1 << (63 - i % 64);
            }
        }
        fp
    }

    /// Grid side length (the hash size).
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    pub fn bit_len(&self) -> usize {
        (self.side as usize) * (self.side as usize)
    }

    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        index < self.bit_len() && (self.words[index / 64] >> (63 - index % 64)) & 1 == 1
    }

    #[inline]
    pub fn get(&self, row: u32, col: u32) -> bool {
        row < self.side && col < self.side && self.bit((row * self.side + col) as usize)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Number of differing bits, or `None` when the grid sizes differ.
    pub fn hamming(&self, other: &Fingerprint) -> Option<u32> {
        (self.side == other.side).then(|| self.hamming_unchecked(other))
    }

    /// Hamming distance assuming equal sizes.
    #[inline]
    pub(crate) fn hamming_unchecked(&self, other: &Fingerprint) -> u32 {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn to_hex(&self) -> String {
        let n = self.bit_len();
        let digits = n.div_ceil(4);
        let pad = digits * 4 - n;
        let mut out = String::with_capacity(digits);
        for d in 0..digits {
            let mut nibble = 0u32;
            for k in 0..4 {
                let pos = d * 4 + k;
                let bit = pos >= pad && self.bit(pos - pad);
                nibble = (nibble << 1) | bit as u32;
            }
            out.push(char::from_digit(nibble, 16).unwrap_or('0'));
        }
        out
    }

    pub fn from_hex(hex: &str) -> Result<Self, FingerprintParseError> {
        let hex = hex.trim();
        if hex.is_empty() {
            return Err(FingerprintParseError::Empty);
        }
        let nibbles = hex
            .chars()
            .enumerate()
            .map(|(position, digit)| {
                digit
                    .to_digit(16)
                    .ok_or(FingerprintParseError::InvalidDigit { position, digit })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let digits = nibbles.len();
        let total = digits * 4;
        let side = total.isqrt();
        let n = side * side;
        if n.div_ceil(4) != digits || side > u32::MAX as usize {
            return Err(FingerprintParseError::NotSquare { digits });
        }
        let side = side as u32;
        let pad = total - n;

        let bit_at = |pos: usize| (nibbles[pos / 4] >> (3 - pos % 4)) & 1 == 1;
        if (0..pad).any(bit_at) {
            return Err(FingerprintParseError::NonZeroPadding { side });
        }
        Ok(Self::from_bits(side, (pad..total).map(bit_at)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_row_major_msb_first() {
        // 2x2 grid [[1, 0], [1, 1]] -> 0b1011.
        let fp = Fingerprint::from_bits(2, [true, false, true, true]);
        assert_eq!(fp.to_hex(), "b");
        assert!(fp.get(0, 0));
        assert!(!fp.get(0, 1));
        assert!(fp.get(1, 1));
    }

    #[test]
    fn odd_sides_are_left_padded() {
        // 9 bits, 3 digits, 3 padding bits in front.
        let fp = Fingerprint::from_bits(3, [true; 9]);
        assert_eq!(fp.to_hex(), "1ff");
        assert_eq!(Fingerprint::from_hex("1ff"), Ok(fp));
        assert_eq!(
            Fingerprint::from_hex("3ff"),
            Err(FingerprintParseError::NonZeroPadding { side: 3 })
        );
    }

    #[test]
    fn full_size_hex_parses() {
        let hex = "8f".repeat(128);
        let fp = Fingerprint::from_hex(&hex).expect("parse");
        assert_eq!(fp.side(), 32);
        assert_eq!(fp.count_ones(), 128 * 5);
        assert_eq!(fp.to_hex(), hex);
        assert_eq!(fp.to_string().parse::<Fingerprint>(), Ok(fp));
    }

    #[test]
    fn uppercase_digits_are_accepted() {
        assert_eq!(
            Fingerprint::from_hex("FFFF").expect("parse"),
            Fingerprint::from_hex("ffff").expect("parse")
        );
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert_eq!(Fingerprint::from_hex(""), Err(FingerprintParseError::Empty));
        assert_eq!(
            Fingerprint::from_hex("12g4"),
            Err(FingerprintParseError::InvalidDigit {
                position: 2,
                digit: 'g'
            })
        );
        // 5 digits = 20 bits; 4x4 needs 4 digits and 5x5 needs 7.
        assert_eq!(
            Fingerprint::from_hex("12345"),
            Err(FingerprintParseError::NotSquare { digits: 5 })
        );
    }

    #[test]
    fn hamming_counts_differing_bits() {
        let a = Fingerprint::from_hex(&"0".repeat(256)).expect("parse");
        let mut hex = "0".repeat(255);
        hex.push('7');
        let b = Fingerprint::from_hex(&hex).expect("parse");
        assert_eq!(a.hamming(&b), Some(3));
        assert_eq!(b.hamming(&b), Some(0));
        assert_eq!(a.hamming(&Fingerprint::zeros(8)), None);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let fp = Fingerprint::from_bits(4, (0..16).map(|i| i % 3 == 0));
        let json = serde_json::to_string(&fp).expect("serialize");
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        let back: Fingerprint = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, fp);
    }
}
