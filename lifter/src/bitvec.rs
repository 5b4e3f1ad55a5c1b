//! Width-tagged immutable bit-vector values.
//!
//! Every IR constant is a [`BitVector`]: a non-negative integer together
//! with its width in bits. The stored integer is always masked to the
//! declared width, so two values are equal exactly when both the width and
//! the masked integer agree. Values of width 64 or less live in a plain
//! `u64`; wider values (80, 128, 256, 512 bits) are backed by a `BigUint`.
//!
//! Arithmetic is modular: overflow simply truncates to the width. Operand
//! widths must match; mixing widths is a programming error reported as
//! [`LiftError::ArithTypeMismatch`]. Comparison operators return 1-bit
//! values (`T`/`F`) rather than booleans so they can be embedded in IR.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::LiftError;

/// Legal widths: 1, 2, 4, then any multiple of 8 up to 512 (which covers
/// 8, 16, 32, 64, 80, 128, 256, 512 and byte-array widths).
#[must_use]
pub const fn is_valid_width(width: u32) -> bool {
    matches!(width, 1 | 2 | 4) || (width >= 8 && width <= 512 && width % 8 == 0)
}

const fn mask64(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn big_mask(width: u32) -> BigUint {
    (BigUint::from(1u8) << width) - 1u8
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Repr {
    Small(u64),
    Big(BigUint),
}

/// An immutable integer value of a declared bit width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVector {
    width: u32,
    repr: Repr,
}

impl BitVector {
    fn check_width(width: u32) -> Result<(), LiftError> {
        if is_valid_width(width) {
            Ok(())
        } else {
            Err(LiftError::InvalidBitWidth(width))
        }
    }

    fn check_same_width(&self, rhs: &Self) -> Result<(), LiftError> {
        if self.width == rhs.width {
            Ok(())
        } else {
            Err(LiftError::ArithTypeMismatch {
                lhs: self.width,
                rhs: rhs.width,
            })
        }
    }

    /// Canonical constructor from an already-computed wide value.
    fn from_big(value: BigUint, width: u32) -> Self {
        if width <= 64 {
            let masked = value & big_mask(width);
            let digits = masked.to_u64_digits();
            let small = if digits.is_empty() { 0 } else { digits[0] };
            Self {
                width,
                repr: Repr::Small(small),
            }
        } else {
            Self {
                width,
                repr: Repr::Big(value & big_mask(width)),
            }
        }
    }

    fn from_small(value: u64, width: u32) -> Self {
        debug_assert!(width <= 64);
        Self {
            width,
            repr: Repr::Small(value & mask64(width)),
        }
    }

    /// Builds a value of `width` bits from the low bits of `value`.
    pub fn of_u64(value: u64, width: u32) -> Result<Self, LiftError> {
        Self::check_width(width)?;
        if width <= 64 {
            Ok(Self::from_small(value, width))
        } else {
            Ok(Self::from_big(BigUint::from(value), width))
        }
    }

    /// Builds a value of `width` bits by sign-extending `value` into the
    /// width.
    pub fn of_i64(value: i64, width: u32) -> Result<Self, LiftError> {
        Self::check_width(width)?;
        if width <= 64 {
            #[allow(clippy::cast_sign_loss)]
            Ok(Self::from_small(value as u64, width))
        } else if value >= 0 {
            #[allow(clippy::cast_sign_loss)]
            Ok(Self::from_big(BigUint::from(value as u64), width))
        } else {
            let modulus = BigUint::from(1u8) << width;
            Ok(Self::from_big(
                modulus - BigUint::from(value.unsigned_abs()),
                width,
            ))
        }
    }

    /// Builds a value from little-endian bytes; the width is `8 * len`.
    pub fn of_bytes(bytes: &[u8]) -> Result<Self, LiftError> {
        let width = u32::try_from(bytes.len())
            .ok()
            .and_then(|n| n.checked_mul(8))
            .ok_or(LiftError::InvalidBitWidth(u32::MAX))?;
        Self::check_width(width)?;
        Ok(Self::from_big(BigUint::from_bytes_le(bytes), width))
    }

    pub fn of_biguint(value: BigUint, width: u32) -> Result<Self, LiftError> {
        Self::check_width(width)?;
        Ok(Self::from_big(value, width))
    }

    /// The 1-bit true value.
    #[must_use]
    pub fn t() -> Self {
        Self::from_small(1, 1)
    }

    /// The 1-bit false value.
    #[must_use]
    pub fn f() -> Self {
        Self::from_small(0, 1)
    }

    #[must_use]
    pub fn of_bool(b: bool) -> Self {
        if b { Self::t() } else { Self::f() }
    }

    pub fn zero(width: u32) -> Result<Self, LiftError> {
        Self::of_u64(0, width)
    }

    pub fn one(width: u32) -> Result<Self, LiftError> {
        Self::of_u64(1, width)
    }

    /// `2^(width-1)`, defined for the widths 8, 16, 32 and 64.
    pub fn mid_num(width: u32) -> Result<Self, LiftError> {
        match width {
            8 | 16 | 32 | 64 => Ok(Self::from_small(1u64 << (width - 1), width)),
            w => Err(LiftError::InvalidBitWidth(w)),
        }
    }

    /// `2^width - 1`, the all-ones value of the width.
    pub fn max_num(width: u32) -> Result<Self, LiftError> {
        Self::check_width(width)?;
        if width <= 64 {
            Ok(Self::from_small(u64::MAX, width))
        } else {
            Ok(Self::from_big(big_mask(width), width))
        }
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// The low 64 bits of the value.
    #[must_use]
    pub fn to_u64(&self) -> u64 {
        match &self.repr {
            Repr::Small(v) => *v,
            Repr::Big(v) => {
                let digits = v.to_u64_digits();
                if digits.is_empty() { 0 } else { digits[0] }
            }
        }
    }

    #[must_use]
    pub fn to_biguint(&self) -> BigUint {
        match &self.repr {
            Repr::Small(v) => BigUint::from(*v),
            Repr::Big(v) => v.clone(),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match &self.repr {
            Repr::Small(v) => *v == 0,
            Repr::Big(v) => *v == BigUint::ZERO,
        }
    }

    /// The top bit of the value at its declared width.
    #[must_use]
    pub fn msb(&self) -> bool {
        match &self.repr {
            Repr::Small(v) => (v >> (self.width - 1)) & 1 == 1,
            Repr::Big(v) => v.bit(u64::from(self.width) - 1),
        }
    }

    /// True when the top bit is clear.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        !self.msb()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.msb()
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        self.width == 1 && !self.is_zero()
    }

    fn binop<FS, FB>(&self, rhs: &Self, fs: FS, fb: FB) -> Result<Self, LiftError>
    where
        FS: FnOnce(u64, u64) -> u64,
        FB: FnOnce(&BigUint, &BigUint) -> BigUint,
    {
        self.check_same_width(rhs)?;
        match (&self.repr, &rhs.repr) {
            (Repr::Small(a), Repr::Small(b)) => Ok(Self::from_small(fs(*a, *b), self.width)),
            _ => Ok(Self::from_big(
                fb(&self.to_biguint(), &rhs.to_biguint()),
                self.width,
            )),
        }
    }

    pub fn add(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.binop(rhs, u64::wrapping_add, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self, LiftError> {
        let width = self.width;
        self.binop(rhs, u64::wrapping_sub, |a, b| {
            // Stay non-negative: a - b == a + (2^w - b) (mod 2^w).
            a + ((BigUint::from(1u8) << width) - b)
        })
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.binop(rhs, u64::wrapping_mul, |a, b| a * b)
    }

    pub fn band(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.binop(rhs, |a, b| a & b, |a, b| a & b)
    }

    pub fn bor(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.binop(rhs, |a, b| a | b, |a, b| a | b)
    }

    pub fn bxor(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.binop(rhs, |a, b| a ^ b, |a, b| a ^ b)
    }

    /// Left shift. The amount has the same width as `self`; amounts at or
    /// beyond the width produce zero.
    pub fn shl(&self, amount: &Self) -> Result<Self, LiftError> {
        self.check_same_width(amount)?;
        let width = self.width;
        if amount.to_biguint() >= BigUint::from(width) {
            return Self::zero(width);
        }
        let sh = u32::try_from(amount.to_u64()).unwrap_or(u32::MAX);
        match &self.repr {
            Repr::Small(v) => Ok(Self::from_small(v << sh, width)),
            Repr::Big(v) => Ok(Self::from_big(v.clone() << sh, width)),
        }
    }

    /// Logical right shift.
    pub fn shr(&self, amount: &Self) -> Result<Self, LiftError> {
        self.check_same_width(amount)?;
        let width = self.width;
        if amount.to_biguint() >= BigUint::from(width) {
            return Self::zero(width);
        }
        let sh = u32::try_from(amount.to_u64()).unwrap_or(u32::MAX);
        match &self.repr {
            Repr::Small(v) => Ok(Self::from_small(v >> sh, width)),
            Repr::Big(v) => Ok(Self::from_big(v.clone() >> sh, width)),
        }
    }

    /// Arithmetic right shift preserving the sign bit. Above 64 bits the
    /// sign fill is simulated by OR-ing in a mask of high-order ones.
    pub fn sar(&self, amount: &Self) -> Result<Self, LiftError> {
        self.check_same_width(amount)?;
        let width = self.width;
        let negative = self.is_negative();
        if amount.to_biguint() >= BigUint::from(width) {
            return if negative {
                Self::max_num(width)
            } else {
                Self::zero(width)
            };
        }
        let sh = u32::try_from(amount.to_u64()).unwrap_or(u32::MAX);
        if sh == 0 {
            return Ok(self.clone());
        }
        let shifted = self.shr(amount)?;
        if !negative {
            return Ok(shifted);
        }
        match &shifted.repr {
            Repr::Small(v) => {
                let fill = mask64(width) & !(mask64(width) >> sh);
                Ok(Self::from_small(v | fill, width))
            }
            Repr::Big(v) => {
                let fill = big_mask(width) ^ (big_mask(width) >> sh);
                Ok(Self::from_big(v | fill, width))
            }
        }
    }

    /// Two's-complement negation: `(2^width - x) mod 2^width`.
    #[must_use]
    pub fn neg(&self) -> Self {
        let width = self.width;
        match &self.repr {
            Repr::Small(v) => Self::from_small(v.wrapping_neg(), width),
            Repr::Big(v) => {
                if *v == BigUint::ZERO {
                    self.clone()
                } else {
                    Self::from_big((BigUint::from(1u8) << width) - v, width)
                }
            }
        }
    }

    /// Bitwise complement within the width.
    #[must_use]
    pub fn bnot(&self) -> Self {
        let width = self.width;
        match &self.repr {
            Repr::Small(v) => Self::from_small(!v, width),
            Repr::Big(v) => Self::from_big(big_mask(width) ^ v, width),
        }
    }

    pub fn udiv(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        if rhs.is_zero() {
            return Err(LiftError::DivByZero);
        }
        self.binop(rhs, |a, b| a / b, |a, b| a / b)
    }

    pub fn urem(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        if rhs.is_zero() {
            return Err(LiftError::DivByZero);
        }
        self.binop(rhs, |a, b| a % b, |a, b| a % b)
    }

    /// Splits into (is-negative, magnitude) under the two's-complement
    /// reading at the declared width.
    fn signed_magnitude(&self) -> (bool, Self) {
        if self.is_negative() {
            (true, self.neg())
        } else {
            (false, self.clone())
        }
    }

    /// Signed division: divide magnitudes, re-negate from the sign
    /// combination of the operands.
    pub fn sdiv(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        let (neg_a, ua) = self.signed_magnitude();
        let (neg_b, ub) = rhs.signed_magnitude();
        let quotient = ua.udiv(&ub)?;
        if neg_a == neg_b {
            Ok(quotient)
        } else {
            Ok(quotient.neg())
        }
    }

    /// Signed remainder; takes the sign of the dividend.
    pub fn srem(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        let (neg_a, ua) = self.signed_magnitude();
        let (_, ub) = rhs.signed_magnitude();
        let rem = ua.urem(&ub)?;
        if neg_a { Ok(rem.neg()) } else { Ok(rem) }
    }

    /// `(hi << width(lo)) | lo` at width `width(hi) + width(lo)`.
    pub fn concat(&self, lo: &Self) -> Result<Self, LiftError> {
        let width = self.width + lo.width;
        Self::check_width(width)?;
        if width <= 64 {
            Ok(Self::from_small(
                (self.to_u64() << lo.width) | lo.to_u64(),
                width,
            ))
        } else {
            Ok(Self::from_big(
                (self.to_biguint() << lo.width) | lo.to_biguint(),
                width,
            ))
        }
    }

    /// `(x >> pos)` masked to `new_width`.
    pub fn extract(&self, new_width: u32, pos: u32) -> Result<Self, LiftError> {
        Self::check_width(new_width)?;
        Ok(Self::from_big(self.to_biguint() >> pos, new_width))
    }

    /// Zero-extends or truncates to `new_width`.
    pub fn cast(&self, new_width: u32) -> Result<Self, LiftError> {
        Self::check_width(new_width)?;
        Ok(Self::from_big(self.to_biguint(), new_width))
    }

    /// Sign-extends to `new_width`: zero-extend, then add
    /// `mask(new) - mask(old)` when the value is negative at its original
    /// width. Widths at or below the original truncate.
    pub fn sext(&self, new_width: u32) -> Result<Self, LiftError> {
        Self::check_width(new_width)?;
        if new_width <= self.width || self.is_positive() {
            return self.cast(new_width);
        }
        let fill = big_mask(new_width) - big_mask(self.width);
        Ok(Self::from_big(self.to_biguint() + fill, new_width))
    }

    fn cmp_result(b: bool) -> Self {
        Self::of_bool(b)
    }

    pub fn eq(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        Ok(Self::cmp_result(self == rhs))
    }

    pub fn neq(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        Ok(Self::cmp_result(self != rhs))
    }

    pub fn ult(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        Ok(Self::cmp_result(self.to_biguint() < rhs.to_biguint()))
    }

    pub fn ule(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.check_same_width(rhs)?;
        Ok(Self::cmp_result(self.to_biguint() <= rhs.to_biguint()))
    }

    pub fn ugt(&self, rhs: &Self) -> Result<Self, LiftError> {
        rhs.ult(self)
    }

    pub fn uge(&self, rhs: &Self) -> Result<Self, LiftError> {
        rhs.ule(self)
    }

    /// Flips the sign bit so that signed comparison reduces to unsigned
    /// comparison of the flipped values.
    fn flip_sign(&self) -> Self {
        let width = self.width;
        match &self.repr {
            Repr::Small(v) => Self::from_small(v ^ (1u64 << (width - 1)), width),
            Repr::Big(v) => {
                let bit = BigUint::from(1u8) << (width - 1);
                Self::from_big(v ^ bit, width)
            }
        }
    }

    pub fn slt(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.flip_sign().ult(&rhs.flip_sign())
    }

    pub fn sle(&self, rhs: &Self) -> Result<Self, LiftError> {
        self.flip_sign().ule(&rhs.flip_sign())
    }

    pub fn sgt(&self, rhs: &Self) -> Result<Self, LiftError> {
        rhs.slt(self)
    }

    pub fn sge(&self, rhs: &Self) -> Result<Self, LiftError> {
        rhs.sle(self)
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Small(v) => write!(f, "0x{v:x}:I{}", self.width),
            Repr::Big(v) => write!(f, "0x{v:x}:I{}", self.width),
        }
    }
}
