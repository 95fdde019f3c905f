//! Exact 32-bit rational numbers, plus a wrapper whose arithmetic degrades to
//! floating point instead of failing when a result leaves the 32-bit range.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CoverageError;

/// Largest denominator considered when approximating a float.
const MAX_APPROXIMATION_DENOMINATOR: i64 = 10_000;
const MAX_APPROXIMATION_STEPS: u32 = 25;

/// A reduced fraction with a positive denominator. Both parts fit in `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    numerator: i32,
    denominator: i32,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction {
        numerator: 0,
        denominator: 1,
    };
    pub const ONE: Fraction = Fraction {
        numerator: 1,
        denominator: 1,
    };

    /// Build a reduced fraction. Returns `None` for a zero denominator or when
    /// the reduced parts do not fit in 32 bits.
    pub fn new(numerator: i64, denominator: i64) -> Option<Self> {
        Self::reduced(i128::from(numerator), i128::from(denominator))
    }

    pub fn whole(value: i32) -> Self {
        Fraction {
            numerator: value,
            denominator: 1,
        }
    }

    /// Exact `numerator / denominator` when representable, otherwise the
    /// closest approximation of the quotient.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return Fraction::ZERO;
        }
        Self::reduced(i128::from(numerator), i128::from(denominator))
            .unwrap_or_else(|| Fraction::from_f64(numerator as f64 / denominator as f64))
    }

    fn reduced(numerator: i128, denominator: i128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let divisor = gcd(numerator.unsigned_abs(), denominator.unsigned_abs()) as i128;
        let (mut numerator, mut denominator) = (numerator / divisor, denominator / divisor);
        if denominator < 0 {
            numerator = -numerator;
            denominator = -denominator;
        }
        Some(Fraction {
            numerator: i32::try_from(numerator).ok()?,
            denominator: i32::try_from(denominator).ok()?,
        })
    }

    /// Continued-fraction approximation of `value` with a denominator of at
    /// most 10000. Values outside the `i32` range saturate; NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Fraction::ZERO;
        }
        let sign: i64 = if value < 0.0 { -1 } else { 1 };
        let mut value = value.abs();
        if value >= f64::from(i32::MAX) {
            return Fraction::whole(if sign < 0 { -i32::MAX } else { i32::MAX });
        }
        let whole = value.trunc() as i64;
        value -= whole as f64;

        let (mut numer0, mut denom0, mut numer1, mut denom1) = (0_i64, 1_i64, 1_i64, 0_i64);
        let mut a1 = value.trunc() as i64;
        let mut x1 = 1.0_f64;
        let mut y1 = value - a1 as f64;
        let mut delta2 = f64::MAX;
        let mut steps = 1;
        loop {
            let delta1 = delta2;
            let a2 = if y1 == 0.0 {
                i64::from(i32::MAX)
            } else {
                (x1 / y1).trunc().min(f64::from(i32::MAX)) as i64
            };
            let x2 = y1;
            let y2 = x1 - a2 as f64 * y1;
            let numer2 = a1 * numer1 + numer0;
            let denom2 = a1 * denom1 + denom0;
            delta2 = (value - numer2 as f64 / denom2 as f64).abs();

            a1 = a2;
            x1 = x2;
            y1 = y2;
            numer0 = numer1;
            denom0 = denom1;
            numer1 = numer2;
            denom1 = denom2;
            steps += 1;

            let keep_going = delta1 > delta2
                && denom2 <= MAX_APPROXIMATION_DENOMINATOR
                && denom2 > 0
                && steps < MAX_APPROXIMATION_STEPS;
            if !keep_going {
                break;
            }
        }

        let numerator = (numer0 + whole * denom0) * sign;
        Fraction::new(numerator, denom0).unwrap_or_else(|| {
            let rounded = (value + whole as f64).round().min(f64::from(i32::MAX)) as i32;
            Fraction::whole(rounded * sign as i32)
        })
    }

    pub fn numerator(self) -> i32 {
        self.numerator
    }

    pub fn denominator(self) -> i32 {
        self.denominator
    }

    pub fn to_f64(self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }

    pub fn is_zero(self) -> bool {
        self.numerator == 0
    }

    pub fn checked_add(self, other: Fraction) -> Option<Fraction> {
        let (a, b) = self.wide();
        let (c, d) = other.wide();
        Self::reduced(a * d + c * b, b * d)
    }

    pub fn checked_sub(self, other: Fraction) -> Option<Fraction> {
        let (a, b) = self.wide();
        let (c, d) = other.wide();
        Self::reduced(a * d - c * b, b * d)
    }

    pub fn checked_mul(self, other: Fraction) -> Option<Fraction> {
        let (a, b) = self.wide();
        let (c, d) = other.wide();
        Self::reduced(a * c, b * d)
    }

    fn wide(self) -> (i128, i128) {
        (i128::from(self.numerator), i128::from(self.denominator))
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::ZERO
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = i64::from(self.numerator) * i64::from(other.denominator);
        let right = i64::from(other.numerator) * i64::from(self.denominator);
        left.cmp(&right)
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Fraction {
    type Err = CoverageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || CoverageError::InvalidValue(s.to_string());
        let (numerator, denominator) = match s.trim().split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s.trim(), "1"),
        };
        let numerator: i64 = numerator.parse().map_err(|_| invalid())?;
        let denominator: i64 = denominator.parse().map_err(|_| invalid())?;
        Fraction::new(numerator, denominator).ok_or_else(invalid)
    }
}

impl Serialize for Fraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fraction arithmetic that never fails: on 32-bit overflow the operation is
/// recomputed in `f64` and approximated back into a [`Fraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeFraction(Fraction);

impl SafeFraction {
    pub fn new(fraction: Fraction) -> Self {
        SafeFraction(fraction)
    }

    pub fn whole(value: i32) -> Self {
        SafeFraction(Fraction::whole(value))
    }

    pub fn fraction(self) -> Fraction {
        self.0
    }

    pub fn add(self, summand: Fraction) -> Fraction {
        self.0.checked_add(summand).unwrap_or_else(|| {
            log::debug!("fraction overflow in {} + {}, approximating", self.0, summand);
            Fraction::from_f64(self.0.to_f64() + summand.to_f64())
        })
    }

    pub fn subtract(self, subtrahend: Fraction) -> Fraction {
        self.0.checked_sub(subtrahend).unwrap_or_else(|| {
            log::debug!("fraction overflow in {} - {}, approximating", self.0, subtrahend);
            Fraction::from_f64(self.0.to_f64() - subtrahend.to_f64())
        })
    }

    pub fn multiply_by(self, multiplier: Fraction) -> Fraction {
        self.0.checked_mul(multiplier).unwrap_or_else(|| {
            log::debug!("fraction overflow in {} * {}, approximating", self.0, multiplier);
            Fraction::from_f64(self.0.to_f64() * multiplier.to_f64())
        })
    }
}

impl From<Fraction> for SafeFraction {
    fn from(fraction: Fraction) -> Self {
        SafeFraction(fraction)
    }
}
