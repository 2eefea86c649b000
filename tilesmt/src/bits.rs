// SPDX-License-Identifier: Apache-2.0

//! Fixed-width bit-vector literal values.
//!
//! Bit 0 is the least significant bit. Values are arbitrary width so that
//! constants in elaborated word-level models (which can be several hundred
//! bits wide after concatenation) survive unchanged.

use std::fmt;

use bitvec::prelude::{BitVec, Lsb0};

use crate::error::{CompileError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bits {
    bits: BitVec<u64, Lsb0>,
}

impl Bits {
    pub fn zero(width: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, width),
        }
    }

    pub fn ones(width: usize) -> Self {
        Self {
            bits: BitVec::repeat(true, width),
        }
    }

    /// Truncates `value` to `width` bits (zero-extending when wider than 64).
    pub fn from_u64(width: usize, value: u64) -> Self {
        let mut bits = BitVec::repeat(false, width);
        for i in 0..width.min(64) {
            bits.set(i, (value >> i) & 1 == 1);
        }
        Self { bits }
    }

    pub fn from_lsb_bools(values: &[bool]) -> Self {
        let mut bits = BitVec::with_capacity(values.len());
        for v in values {
            bits.push(*v);
        }
        Self { bits }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn iter_lsb_to_msb(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().by_vals()
    }

    pub fn is_zero(&self) -> bool {
        self.bits.not_any()
    }

    /// Returns the value if it fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        let mut value = 0u64;
        for (i, b) in self.iter_lsb_to_msb().enumerate() {
            if !b {
                continue;
            }
            if i >= 64 {
                return None;
            }
            value |= 1 << i;
        }
        Some(value)
    }

    /// MSB-first binary digits, no prefix.
    pub fn to_binary_string(&self) -> String {
        (0..self.width())
            .rev()
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// Parses MSB-first binary digits; the digit count must equal `width`.
    pub fn parse_binary(width: usize, digits: &str) -> Result<Self> {
        if digits.len() != width {
            return Err(CompileError::sort(format!(
                "binary literal '{}' has {} digits, expected {}",
                digits,
                digits.len(),
                width
            )));
        }
        let mut out = Self::zero(width);
        for (i, c) in digits.chars().rev().enumerate() {
            match c {
                '0' => {}
                '1' => out.set(i, true),
                _ => {
                    return Err(CompileError::sort(format!(
                        "invalid binary digit '{}' in '{}'",
                        c, digits
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Parses an optionally negative decimal literal, wrapping modulo
    /// `2^width`.
    pub fn parse_decimal(width: usize, text: &str) -> Result<Self> {
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if digits.is_empty() {
            return Err(CompileError::sort("empty decimal literal"));
        }
        let mut acc = Self::zero(width);
        for c in digits.chars() {
            let d = c.to_digit(10).ok_or_else(|| {
                CompileError::sort(format!("invalid decimal digit '{}' in '{}'", c, text))
            })?;
            // acc * 10 == (acc << 3) + (acc << 1)
            let times8 = acc.shl(3);
            let times2 = acc.shl(1);
            acc = times8.wrapping_add(&times2);
            acc = acc.wrapping_add(&Self::from_u64(width, d as u64));
        }
        if negative {
            acc = acc.wrapping_neg();
        }
        Ok(acc)
    }

    /// Parses hexadecimal digits (MSB first), wrapping modulo `2^width`.
    pub fn parse_hex(width: usize, digits: &str) -> Result<Self> {
        let mut out = Self::zero(width);
        for (nibble_index, c) in digits.chars().rev().enumerate() {
            let nibble = c.to_digit(16).ok_or_else(|| {
                CompileError::sort(format!("invalid hex digit '{}' in '{}'", c, digits))
            })?;
            for b in 0..4 {
                let i = nibble_index * 4 + b;
                if i < width && (nibble >> b) & 1 == 1 {
                    out.set(i, true);
                }
            }
        }
        Ok(out)
    }

    fn shl(&self, amount: usize) -> Self {
        let mut out = Self::zero(self.width());
        for i in amount..self.width() {
            out.set(i, self.get(i - amount));
        }
        out
    }

    fn wrapping_add(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.width(), rhs.width());
        let mut out = Self::zero(self.width());
        let mut carry = false;
        for i in 0..self.width() {
            let (a, b) = (self.get(i), rhs.get(i));
            out.set(i, a ^ b ^ carry);
            carry = (a && b) || (carry && (a ^ b));
        }
        out
    }

    fn wrapping_neg(&self) -> Self {
        let mut inverted = self.clone();
        for i in 0..self.width() {
            inverted.set(i, !self.get(i));
        }
        inverted.wrapping_add(&Self::from_u64(self.width(), 1))
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u64() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "#b{}", self.to_binary_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_from_u64_truncates() {
        let b = Bits::from_u64(4, 0x1f);
        assert_eq!(b.to_u64(), Some(0xf));
        assert_eq!(b.to_binary_string(), "1111");
    }

    #[test_case(8, "5", 5)]
    #[test_case(8, "255", 255)]
    #[test_case(8, "256", 0)]
    #[test_case(8, "-1", 255)]
    #[test_case(16, "-2", 0xfffe)]
    fn test_parse_decimal(width: usize, text: &str, expected: u64) {
        assert_eq!(Bits::parse_decimal(width, text).unwrap().to_u64(), Some(expected));
    }

    #[test]
    fn test_parse_hex_and_binary() {
        assert_eq!(Bits::parse_hex(12, "a5f").unwrap().to_u64(), Some(0xa5f));
        assert_eq!(Bits::parse_binary(3, "101").unwrap().to_u64(), Some(5));
        assert!(Bits::parse_binary(3, "10").is_err());
        assert!(Bits::parse_binary(2, "12").is_err());
    }

    #[test]
    fn test_wide_value_display() {
        let mut b = Bits::zero(70);
        b.set(69, true);
        assert_eq!(b.to_u64(), None);
        assert!(format!("{}", b).starts_with("#b1"));
    }
}
