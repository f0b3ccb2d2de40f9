use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric payload shared by native and interpretable values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Lossy view as `f64`, used by evaluators that only do floating arithmetic.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(value) => value as f64,
            Number::UInt(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Exact signed view, if the value fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int(value) => Some(value),
            Number::UInt(value) => i64::try_from(value).ok(),
            Number::Float(_) => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, Number::Float(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            Number::UInt(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

macro_rules! number_from_signed {
    ($($source:ty),*) => {
        $(impl From<$source> for Number {
            fn from(value: $source) -> Self {
                Number::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! number_from_unsigned {
    ($($source:ty),*) => {
        $(impl From<$source> for Number {
            fn from(value: $source) -> Self {
                Number::UInt(u64::from(value))
            }
        })*
    };
}

number_from_signed!(i8, i16, i32, i64);
number_from_unsigned!(u8, u16, u32, u64);

/// Falls back to `Float` when the value does not fit 64 bits.
impl From<i128> for Number {
    fn from(value: i128) -> Self {
        match i64::try_from(value) {
            Ok(value) => Number::Int(value),
            Err(_) => match u64::try_from(value) {
                Ok(value) => Number::UInt(value),
                Err(_) => Number::Float(value as f64),
            },
        }
    }
}

impl From<u128> for Number {
    fn from(value: u128) -> Self {
        u64::try_from(value).map_or(Number::Float(value as f64), Number::UInt)
    }
}

impl From<isize> for Number {
    fn from(value: isize) -> Self {
        Number::from(value as i128)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from(value as u128)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Float(f64::from(value))
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_values_convert_to_signed_only_when_they_fit() {
        assert_eq!(Number::UInt(42).as_i64(), Some(42));
        assert_eq!(Number::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Number::Float(1.5).as_i64(), None);
    }

    #[test]
    fn display_matches_the_underlying_representation() {
        assert_eq!(Number::from(-7i32).to_string(), "-7");
        assert_eq!(Number::from(7u8).to_string(), "7");
        assert_eq!(Number::from(2.5f64).to_string(), "2.5");
    }

    #[test]
    fn wide_integers_stay_exact_when_they_fit() {
        assert_eq!(Number::from(5usize), Number::UInt(5));
        assert_eq!(Number::from(-3isize), Number::Int(-3));
        assert_eq!(Number::from(i128::from(u64::MAX)), Number::UInt(u64::MAX));
        assert_eq!(Number::from(1u128 << 70), Number::Float((1u128 << 70) as f64));
        assert_eq!(Number::from(i128::MIN), Number::Float(i128::MIN as f64));
    }
}
