//! Minimal 64-bit prime field, used for canonical encodings of quantized
//! values inside digests and commitments.

use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Goldilocks prime `p = 2^64 - 2^32 + 1`.
pub const GOLDILOCKS: u64 = 0xFFFF_FFFF_0000_0001;

/// Prime field element modulo a const-generic 64-bit prime `P`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fp64<const P: u64>(pub u64);

/// The field the engine encodes quantized values into.
pub type Fq = Fp64<GOLDILOCKS>;

impl<const P: u64> Fp64<P> {
    /// Zero.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// One.
    #[inline]
    #[must_use]
    pub const fn one() -> Self {
        Self(1 % P)
    }

    /// From `u64` reduced mod `P`.
    #[inline]
    #[must_use]
    pub const fn from_u64(x: u64) -> Self {
        Self(x % P)
    }

    /// From signed `i64`: negative values map to their additive inverse.
    #[inline]
    #[must_use]
    pub fn from_i64(x: i64) -> Self {
        Self((x as i128).rem_euclid(P as i128) as u64)
    }

    /// Canonical little-endian encoding.
    #[inline]
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Exponentiation by squaring.
    #[must_use]
    pub fn pow(self, mut e: u64) -> Self {
        let mut base = self;
        let mut acc = Self::one();
        while e > 0 {
            if e & 1 == 1 {
                acc *= base;
            }
            base *= base;
            e >>= 1;
        }
        acc
    }

    /// Multiplicative inverse (`P` assumed prime; zero maps to zero).
    #[inline]
    #[must_use]
    pub fn inv(self) -> Self {
        self.pow(P - 2)
    }

    #[inline]
    fn add_raw(a: u64, b: u64) -> u64 {
        let s = (a as u128) + (b as u128);
        let s = if s >= (P as u128) { s - (P as u128) } else { s };
        s as u64
    }

    #[inline]
    fn sub_raw(a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            ((a as u128) + (P as u128) - (b as u128)) as u64
        }
    }

    #[inline]
    fn mul_raw(a: u64, b: u64) -> u64 {
        (((a as u128) * (b as u128)) % (P as u128)) as u64
    }
}

impl<const P: u64> Add for Fp64<P> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(Self::add_raw(self.0, rhs.0))
    }
}

impl<const P: u64> AddAssign for Fp64<P> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = Self::add_raw(self.0, rhs.0);
    }
}

impl<const P: u64> Sub for Fp64<P> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(Self::sub_raw(self.0, rhs.0))
    }
}

impl<const P: u64> SubAssign for Fp64<P> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = Self::sub_raw(self.0, rhs.0);
    }
}

impl<const P: u64> Mul for Fp64<P> {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(Self::mul_raw(self.0, rhs.0))
    }
}

impl<const P: u64> MulAssign for Fp64<P> {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        self.0 = Self::mul_raw(self.0, rhs.0);
    }
}

impl<const P: u64> Neg for Fp64<P> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(Self::sub_raw(0, self.0))
    }
}
