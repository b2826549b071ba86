//! Signed token amounts with a 256-bit magnitude.
//!
//! Delegator summaries go negative when indexing starts after the
//! delegation was made.

use primitive_types::U256;
use serde_derive::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    ops::Neg,
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount arithmetic overflowed")]
    Overflow,
}

/// Stored and rendered as a decimal string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount {
    negative: bool,
    magnitude: U256,
}

impl Amount {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse an unsigned base-10 integer as found in coins and module
    /// query responses
    pub fn from_dec_str(digits: &str) -> Result<Self, AmountError> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(digits.to_string()));
        }
        let magnitude = U256::from_dec_str(digits).map_err(|_| AmountError::Overflow)?;
        Ok(Self {
            negative: false,
            magnitude,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.negative == other.negative {
            let magnitude = self.magnitude.checked_add(other.magnitude)?;
            return Some(Self::signed(self.negative, magnitude));
        }
        Some(match self.magnitude.cmp(&other.magnitude) {
            Ordering::Less => Self::signed(other.negative, other.magnitude - self.magnitude),
            _ => Self::signed(self.negative, self.magnitude - other.magnitude),
        })
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(-other)
    }

    fn signed(negative: bool, magnitude: U256) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self::signed(false, U256::from(units))
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self::signed(!self.negative, self.magnitude)
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
        }
    }
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "{}", self.magnitude)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('-') {
            Some(digits) => Self::from_dec_str(digits).map(Neg::neg),
            None => Self::from_dec_str(s),
        }
        .map_err(|e| match e {
            AmountError::Invalid(_) => AmountError::Invalid(s.to_string()),
            overflow => overflow,
        })
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}
