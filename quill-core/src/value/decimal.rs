//! Arbitrary-precision decimal: an unscaled [`BigInt`] plus a base-10 scale.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

impl Decimal {
    pub fn new(unscaled: BigInt, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn from_i64(v: i64) -> Self {
        Self {
            unscaled: BigInt::from(v),
            scale: 0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        let scale = frac_part.len() as u32;
        let digits = format!("{int_part}{frac_part}");
        let unscaled: BigInt = digits.parse().ok()?;
        Some(Self { unscaled, scale })
    }

    fn rescale_pair(a: &Decimal, b: &Decimal) -> (BigInt, BigInt, u32) {
        let scale = a.scale.max(b.scale);
        let ua = &a.unscaled * BigInt::from(10u32).pow(scale - a.scale);
        let ub = &b.unscaled * BigInt::from(10u32).pow(scale - b.scale);
        (ua, ub, scale)
    }

    pub fn add(&self, other: &Decimal) -> Decimal {
        let (a, b, scale) = Self::rescale_pair(self, other);
        Decimal::new(a + b, scale)
    }

    pub fn sub(&self, other: &Decimal) -> Decimal {
        let (a, b, scale) = Self::rescale_pair(self, other);
        Decimal::new(a - b, scale)
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal::new(&self.unscaled * &other.unscaled, self.scale + other.scale)
    }

    pub fn neg(&self) -> Decimal {
        Decimal::new(-&self.unscaled, self.scale)
    }

    pub fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled.is_negative()
    }

    /// The canonical `(unscaled, scale)` pair with trailing fractional
    /// zeros stripped, used for equality and hashing so `1.0` and `1.00`
    /// compare equal.
    fn canonical(&self) -> (BigInt, u32) {
        let mut unscaled = self.unscaled.clone();
        let mut scale = self.scale;
        let ten = BigInt::from(10);
        while scale > 0 && (&unscaled % &ten).is_zero() {
            unscaled /= &ten;
            scale -= 1;
        }
        (unscaled, scale)
    }

    pub fn to_f64(&self) -> f64 {
        let unscaled_f: f64 = self.unscaled.to_string().parse().unwrap_or(0.0);
        unscaled_f / 10f64.powi(self.scale as i32)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}
impl Eq for Decimal {}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = Self::rescale_pair(self, other);
        a.cmp(&b)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let neg = self.unscaled.is_negative();
        let digits = self.unscaled.abs().to_string();
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let split = padded.len() - scale;
        write!(
            f,
            "{}{}.{}",
            if neg { "-" } else { "" },
            &padded[..split],
            &padded[split..]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let d = Decimal::parse("12.340").unwrap();
        assert_eq!(d.to_string(), "12.340");
    }

    #[test]
    fn trailing_zeros_compare_equal() {
        let a = Decimal::parse("1.0").unwrap();
        let b = Decimal::parse("1.00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn add_rescales() {
        let a = Decimal::parse("1.5").unwrap();
        let b = Decimal::parse("0.25").unwrap();
        assert_eq!(a.add(&b).to_string(), "1.75");
    }
}
