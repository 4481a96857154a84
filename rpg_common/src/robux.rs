use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const ROBUX_CURRENCY_CODE: &str = "RBX";

//--------------------------------------      Robux       ------------------------------------------------------------
/// A whole number of Robux. Fractional Robux do not exist, and no storefront operation ever produces a negative
/// quantity, so the inner value is a plain `u64`.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Robux(u64);

op!(binary Robux, Add, add);
op!(binary Robux, Sub, sub);
op!(inplace Robux, AddAssign, add_assign);
op!(inplace Robux, SubAssign, sub_assign);

impl Sum for Robux {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a Robux amount: {0}")]
pub struct RobuxConversionError(String);

impl From<u64> for Robux {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for Robux {
    type Error = RobuxConversionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            Err(RobuxConversionError(format!("{value} is negative")))
        } else {
            #[allow(clippy::cast_sign_loss)]
            Ok(Self(value as u64))
        }
    }
}

impl FromStr for Robux {
    type Err = RobuxConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self).map_err(|e| RobuxConversionError(format!("{s}: {e}")))
    }
}

impl Display for Robux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {ROBUX_CURRENCY_CODE}", self.0)
    }
}

impl Robux {
    pub fn value(&self) -> u64 {
        self.0
    }
}
