//! Exact non-negative integers for storage addresses and array strides.
//!
//! Offsets and coefficients routinely exceed 2^128 (an unsized array is
//! 2^256 - 1 elements long), so everything is kept as an arbitrary-precision
//! integer and rendered in base 10.

use crate::CoreError;
use num_bigint::BigUint;
use num_traits::{Num, One, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(BigUint);

impl Decimal {
    pub fn zero() -> Self {
        Decimal(BigUint::zero())
    }

    pub fn one() -> Self {
        Decimal(BigUint::one())
    }

    pub fn from_u64(value: u64) -> Self {
        Decimal(BigUint::from(value))
    }

    pub fn two_pow(exponent: u32) -> Self {
        Decimal(BigUint::one() << exponent)
    }

    /// Footprints at or above this bound denote dynamically sized regions.
    pub fn tt176() -> Self {
        Self::two_pow(176)
    }

    pub fn tt256() -> Self {
        Self::two_pow(256)
    }

    /// Implicit length of an unsized array dimension.
    pub fn tt256m1() -> Self {
        Decimal(Self::tt256().0 - BigUint::one())
    }

    /// Accepts base-10 digits or a `0x`-prefixed hexadecimal literal.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidNumber(text.to_string());
        let (digits, radix) = match text.strip_prefix("0x") {
            Some(hex) => (hex, 16),
            None => (text, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(invalid());
        }
        BigUint::from_str_radix(digits, radix)
            .map(Decimal)
            .map_err(|_| invalid())
    }

    pub fn is_number_like(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    pub fn add(&self, other: &Decimal) -> Decimal {
        Decimal(&self.0 + &other.0)
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        Decimal(&self.0 * &other.0)
    }

    pub fn gt(&self, other: &Decimal) -> bool {
        self > other
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn to_u64(&self) -> Option<u64> {
        num_traits::ToPrimitive::to_u64(&self.0)
    }
}

impl From<BigUint> for Decimal {
    fn from(value: BigUint) -> Self {
        Decimal(value)
    }
}

impl From<u64> for Decimal {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl FromStr for Decimal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Decimal::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_and_hex() {
        assert_eq!(Decimal::parse("42").unwrap(), Decimal::from_u64(42));
        assert_eq!(Decimal::parse("0xff").unwrap(), Decimal::from_u64(255));
        assert!(Decimal::parse("").is_err());
        assert!(Decimal::parse("0x").is_err());
        assert!(Decimal::parse("-1").is_err());
        assert!(Decimal::parse("12a").is_err());
        assert!(!Decimal::is_number_like("len"));
    }

    #[test]
    fn test_arithmetic_is_exact_past_u128() {
        let big = Decimal::two_pow(200);
        let product = big.mul(&Decimal::from_u64(3));
        assert_eq!(
            product.to_string(),
            "4820814132776970826625886277023487807566608981348378505904128"
        );
        assert_eq!(big.add(&big), Decimal::two_pow(201));
    }

    #[test]
    fn test_sentinels() {
        assert!(Decimal::tt256m1().gt(&Decimal::tt176()));
        assert!(Decimal::tt176().gt(&Decimal::from_u64(u64::MAX)));
        assert_eq!(Decimal::tt256m1().add(&Decimal::one()), Decimal::tt256());
        assert_eq!(
            Decimal::tt176().to_string(),
            "95780971304118053647396689196894323976171195136475136"
        );
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Decimal::from_u64(5)).unwrap();
        assert_eq!(json, "\"5\"");
        let back: Decimal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Decimal::from_u64(5));
    }
}
