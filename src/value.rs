//! Measurements attached to tree nodes.
//!
//! A [`Value`] is one of three closed variants, each tagged with a [`Metric`].
//! Two values combine only when both the metric and the variant agree.

use std::fmt;
use std::mem;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{CoverageError, Result};
use crate::fraction::{Fraction, SafeFraction};
use crate::metric::{Metric, Tendency};

/// Covered versus missed items (lines, branches, instructions, mutations, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coverage {
    metric: Metric,
    covered: u64,
    missed: u64,
}

impl Coverage {
    pub fn new(metric: Metric, covered: u64, missed: u64) -> Self {
        Self {
            metric,
            covered,
            missed,
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn missed(&self) -> u64 {
        self.missed
    }

    pub fn total(&self) -> u64 {
        self.covered.saturating_add(self.missed)
    }

    /// Whether any item was counted at all.
    pub fn is_set(&self) -> bool {
        self.total() > 0
    }

    /// Covered items relative to all items; zero when nothing was counted.
    pub fn covered_fraction(&self) -> Fraction {
        Fraction::from_ratio(self.covered, self.total())
    }

    pub fn covered_percentage(&self) -> Percentage {
        Percentage(self.covered_fraction())
    }
}

/// A fraction shown on the 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Percentage(Fraction);

impl Percentage {
    pub fn from_fraction(fraction: Fraction) -> Self {
        Percentage(fraction)
    }

    pub fn value(&self) -> f64 {
        self.0.to_f64() * 100.0
    }

    pub fn fraction(&self) -> Fraction {
        self.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.value())
    }
}

/// A plain count such as cyclomatic complexity or lines of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntegerValue {
    metric: Metric,
    value: u64,
}

impl IntegerValue {
    pub fn new(metric: Metric, value: u64) -> Self {
        Self { metric, value }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// A rational measurement, e.g. complexity density.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FractionValue {
    metric: Metric,
    fraction: Fraction,
}

impl FractionValue {
    pub fn new(metric: Metric, fraction: Fraction) -> Self {
        Self { metric, fraction }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn fraction(&self) -> Fraction {
        self.fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Value {
    Coverage(Coverage),
    Integer(IntegerValue),
    Fraction(FractionValue),
}

impl Value {
    pub fn coverage(metric: Metric, covered: u64, missed: u64) -> Self {
        Value::Coverage(Coverage::new(metric, covered, missed))
    }

    pub fn integer(metric: Metric, value: u64) -> Self {
        Value::Integer(IntegerValue::new(metric, value))
    }

    pub fn fraction(metric: Metric, fraction: Fraction) -> Self {
        Value::Fraction(FractionValue::new(metric, fraction))
    }

    pub fn metric(&self) -> Metric {
        match self {
            Value::Coverage(c) => c.metric,
            Value::Integer(i) => i.metric,
            Value::Fraction(f) => f.metric,
        }
    }

    pub fn as_coverage(&self) -> Option<&Coverage> {
        match self {
            Value::Coverage(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => Some(i.value),
            _ => None,
        }
    }

    pub fn as_fraction(&self) -> Option<Fraction> {
        match self {
            Value::Fraction(f) => Some(f.fraction),
            _ => None,
        }
    }

    fn ensure_compatible(&self, other: &Value) -> Result<()> {
        if self.metric() == other.metric() && mem::discriminant(self) == mem::discriminant(other) {
            Ok(())
        } else {
            Err(self.incompatible(other))
        }
    }

    fn incompatible(&self, other: &Value) -> CoverageError {
        CoverageError::IncompatibleValues {
            left: self.to_string(),
            right: other.to_string(),
        }
    }

    /// Sum of two values of the same metric and variant.
    pub fn add(&self, other: &Value) -> Result<Value> {
        self.ensure_compatible(other)?;
        Ok(match (self, other) {
            (Value::Coverage(a), Value::Coverage(b)) => Value::coverage(
                a.metric,
                a.covered.saturating_add(b.covered),
                a.missed.saturating_add(b.missed),
            ),
            (Value::Integer(a), Value::Integer(b)) => {
                Value::integer(a.metric, a.value.saturating_add(b.value))
            }
            (Value::Fraction(a), Value::Fraction(b)) => {
                Value::fraction(a.metric, SafeFraction::new(a.fraction).add(b.fraction))
            }
            _ => return Err(self.incompatible(other)),
        })
    }

    /// The better-covered (or larger) of two values; ties keep `self`.
    pub fn max(&self, other: &Value) -> Result<Value> {
        self.ensure_compatible(other)?;
        Ok(match (self, other) {
            (Value::Coverage(a), Value::Coverage(b)) => {
                if b.covered_fraction() > a.covered_fraction() {
                    *other
                } else {
                    *self
                }
            }
            (Value::Integer(a), Value::Integer(b)) => {
                if b.value > a.value {
                    *other
                } else {
                    *self
                }
            }
            (Value::Fraction(a), Value::Fraction(b)) => {
                if b.fraction > a.fraction {
                    *other
                } else {
                    *self
                }
            }
            _ => return Err(self.incompatible(other)),
        })
    }

    /// `self - other` as a rational number. Coverage values compare their
    /// covered fractions.
    pub fn delta(&self, other: &Value) -> Result<Fraction> {
        self.ensure_compatible(other)?;
        Ok(match (self, other) {
            (Value::Coverage(a), Value::Coverage(b)) => {
                SafeFraction::new(a.covered_fraction()).subtract(b.covered_fraction())
            }
            (Value::Integer(a), Value::Integer(b)) => {
                let difference = i128::from(a.value) - i128::from(b.value);
                i64::try_from(difference)
                    .ok()
                    .and_then(|d| Fraction::new(d, 1))
                    .unwrap_or_else(|| Fraction::from_f64(difference as f64))
            }
            (Value::Fraction(a), Value::Fraction(b)) => {
                SafeFraction::new(a.fraction).subtract(b.fraction)
            }
            _ => return Err(self.incompatible(other)),
        })
    }

    /// The number a threshold is checked against.
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Coverage(c) => c.covered_fraction().to_f64(),
            Value::Integer(i) => i.value as f64,
            Value::Fraction(f) => f.fraction.to_f64(),
        }
    }

    /// Whether this value violates `threshold` given the metric's tendency.
    pub fn is_out_of_valid_range(&self, threshold: f64) -> bool {
        match self.metric().tendency() {
            Tendency::LargerIsBetter => self.to_f64() < threshold,
            Tendency::SmallerIsBetter => self.to_f64() > threshold,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Coverage(c) => write!(f, "{}: {}/{}", c.metric, c.covered, c.total()),
            Value::Integer(i) => write!(f, "{}: {}", i.metric, i.value),
            Value::Fraction(v) => write!(f, "{}: {}", v.metric, v.fraction),
        }
    }
}

impl FromStr for Value {
    type Err = CoverageError;

    /// Reads the [`Display`](fmt::Display) form back, e.g. `LINE: 6/8`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || CoverageError::InvalidValue(s.to_string());
        let (key, number) = s.split_once(':').ok_or_else(invalid)?;
        let metric: Metric = key.parse()?;
        let number = number.trim();
        match metric {
            Metric::Complexity | Metric::Loc => {
                let value = number.parse().map_err(|_| invalid())?;
                Ok(Value::integer(metric, value))
            }
            Metric::ComplexityDensity => Ok(Value::fraction(metric, number.parse()?)),
            _ => {
                let (covered, total) = number.split_once('/').ok_or_else(invalid)?;
                let covered: u64 = covered.trim().parse().map_err(|_| invalid())?;
                let total: u64 = total.trim().parse().map_err(|_| invalid())?;
                let missed = total.checked_sub(covered).ok_or_else(invalid)?;
                Ok(Value::coverage(metric, covered, missed))
            }
        }
    }
}
