//! Fixed-point arithmetic over 256-bit unsigned integers
//!
//! The on-chain protocol works in integer token units with 18 decimals and
//! truncating division. Everything here reproduces that behavior exactly:
//! intermediate products are widened to 512 bits so `a * b / c` never
//! overflows, and the final division always truncates toward zero.
//!
//! # Bases
//!
//! - [`BASE`] = 10^18: prices, issuance rates, boost and allowed-inflation scalars
//! - [`RETURN_BASE`] = 10^25: portfolio returns (extra precision so repeated
//!   return computations do not compound truncation error)

use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 10^18 as a `U256`
pub const BASE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// 10^25 as a `U256` (does not fit in one limb)
pub const RETURN_BASE: U256 = U256([0x1614_0148_4a00_0000, 0x8_4595, 0, 0]);

/// One whole token (18 decimals)
pub const ONE_TOKEN: U256 = BASE;

/// `n` whole tokens
///
/// # Example
/// ```
/// use token_lock_sim_core::core::fixed::{tokens, BASE};
/// use primitive_types::U256;
///
/// assert_eq!(tokens(3), U256::from(3u64) * BASE);
/// ```
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * ONE_TOKEN
}

/// `a * b / denominator`, truncating, with a 512-bit intermediate product
///
/// Returns zero when `denominator` is zero. Callers that need a division by
/// zero to be an error check before calling.
///
/// # Panics
/// Panics if the truncated quotient does not fit in 256 bits. That can only
/// happen with a denominator far smaller than either factor, which never
/// occurs for values produced by the engine.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let product = a.full_mul(b);
    let quotient = product / U512::from(denominator);
    U256::try_from(quotient).expect("mul_div result exceeds 256 bits")
}

/// Signed fixed-point quantity: a magnitude plus a sign flag
///
/// Zero is always positive, so `SignedValue::zero() == -SignedValue::zero()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedValue {
    pub magnitude: U256,
    pub is_positive: bool,
}

impl SignedValue {
    pub fn new(magnitude: U256, is_positive: bool) -> Self {
        Self {
            magnitude,
            is_positive: is_positive || magnitude.is_zero(),
        }
    }

    pub fn zero() -> Self {
        Self::positive(U256::zero())
    }

    pub fn positive(magnitude: U256) -> Self {
        Self::new(magnitude, true)
    }

    pub fn negative(magnitude: U256) -> Self {
        Self::new(magnitude, false)
    }

    /// Signed difference `a - b` of two unsigned values
    pub fn difference(a: U256, b: U256) -> Self {
        if a >= b {
            Self::positive(a - b)
        } else {
            Self::negative(b - a)
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    /// Signed subtraction `self - other`
    ///
    /// # Example
    /// ```
    /// use token_lock_sim_core::core::fixed::SignedValue;
    /// use primitive_types::U256;
    ///
    /// let a = SignedValue::positive(U256::from(5u64));
    /// let b = SignedValue::positive(U256::from(8u64));
    /// assert_eq!(a.sub(b), SignedValue::negative(U256::from(3u64)));
    /// ```
    pub fn sub(self, other: SignedValue) -> SignedValue {
        self.add(other.neg())
    }

    /// Signed addition
    pub fn add(self, other: SignedValue) -> SignedValue {
        if self.is_positive == other.is_positive {
            return SignedValue::new(self.magnitude + other.magnitude, self.is_positive);
        }
        match self.magnitude.cmp(&other.magnitude) {
            Ordering::Greater | Ordering::Equal => {
                SignedValue::new(self.magnitude - other.magnitude, self.is_positive)
            }
            Ordering::Less => SignedValue::new(other.magnitude - self.magnitude, other.is_positive),
        }
    }

    pub fn neg(self) -> SignedValue {
        SignedValue::new(self.magnitude, !self.is_positive)
    }

    /// Scale the magnitude by `numerator / denominator`, keeping the sign
    pub fn scale(self, numerator: U256, denominator: U256) -> SignedValue {
        SignedValue::new(mul_div(self.magnitude, numerator, denominator), self.is_positive)
    }

    /// Clamp negative values to zero
    pub fn clamp_to_unsigned(self) -> U256 {
        if self.is_positive {
            self.magnitude
        } else {
            U256::zero()
        }
    }
}

impl Default for SignedValue {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for SignedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_positive {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "-{}", self.magnitude)
        }
    }
}
