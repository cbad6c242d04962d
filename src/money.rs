//! Integer money type used for every amount in the ledger

use std::{fmt::Display, str::FromStr};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::Error;

/// The number of decimals a minor unit represents (cents)
pub const MINOR_UNIT_SCALE: u32 = 2;

/// An amount of money as a whole number of minor currency units.
///
/// All arithmetic in this crate happens on [`Cents`]; [`Decimal`] is only used when
/// reading amounts from, or writing them to, the outside world. Arithmetic is checked and
/// fails with [`Error::Overflow`] instead of wrapping or panicking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(i64);

impl Cents {
    /// Zero minor units
    pub const ZERO: Cents = Cents(0);

    /// Returns the raw number of minor units
    #[must_use]
    #[inline]
    pub fn value(self) -> i64 {
        self.0
    }

    /// Returns whether the amount is below zero
    #[must_use]
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns the amount as a [`Decimal`] in major units, e.g. `1234` becomes `12.34`
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    /// Adds two amounts.
    /// # Errors
    /// [`Error::Overflow`] if the sum does not fit
    pub fn try_add(self, rhs: Cents) -> Result<Cents, Error> {
        self.0.checked_add(rhs.0).map(Cents).ok_or(Error::Overflow)
    }

    /// Subtracts `rhs` from the amount.
    /// # Errors
    /// [`Error::Overflow`] if the difference does not fit
    pub fn try_sub(self, rhs: Cents) -> Result<Cents, Error> {
        self.0.checked_sub(rhs.0).map(Cents).ok_or(Error::Overflow)
    }

    /// Multiplies the amount by a whole factor.
    /// # Errors
    /// [`Error::Overflow`] if the product does not fit
    pub fn try_mul(self, factor: i64) -> Result<Cents, Error> {
        self.0.checked_mul(factor).map(Cents).ok_or(Error::Overflow)
    }

    /// Sums a sequence of amounts.
    /// # Errors
    /// [`Error::Overflow`] as soon as a partial sum does not fit
    pub fn try_sum<I>(amounts: I) -> Result<Cents, Error>
    where
        I: IntoIterator<Item = Cents>,
    {
        amounts
            .into_iter()
            .try_fold(Cents::ZERO, |total, amount| total.try_add(amount))
    }

    /// Converts a decimal that already has at most [`MINOR_UNIT_SCALE`] significant decimal
    /// places. Used for amounts typed by people or read from files, where rounding would hide a
    /// mistake.
    /// # Errors
    /// [`Error::InvalidArgument`] for more decimal places, [`Error::AmountOutOfRange`] if the
    /// value does not fit
    pub fn from_decimal_exact(amount: Decimal) -> Result<Cents, Error> {
        if amount.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(Error::InvalidArgument(format!(
                "amount {amount} has more than {MINOR_UNIT_SCALE} decimal places"
            )));
        }
        Cents::try_from(amount)
    }

    /// Formats the amount as Brazilian reais, e.g. `R$ 1.234,56`.
    #[must_use]
    pub fn brl(self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let minor = self.0.unsigned_abs();
        let major = (minor / 100).to_string();
        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (position, digit) in major.chars().enumerate() {
            if position > 0 && (major.len() - position) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }
        format!("{sign}R$ {grouped},{:02}", minor % 100)
    }
}

impl From<i64> for Cents {
    fn from(minor_units: i64) -> Self {
        Self(minor_units)
    }
}

impl TryFrom<Decimal> for Cents {
    type Error = Error;

    /// Rounds to [`MINOR_UNIT_SCALE`] places (midpoint away from zero) and converts.
    /// # Errors
    /// [`Error::AmountOutOfRange`] if the result does not fit in an `i64`
    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        amount
            .round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.to_i64())
            .map(Cents)
            .ok_or(Error::AmountOutOfRange(amount))
    }
}

impl FromStr for Cents {
    type Err = Error;

    /// Accepts plain decimals (`1234.56`) as well as the Brazilian notation
    /// (`1.234,56`, optionally prefixed by `R$`).
    ///
    /// Without a comma the dot is a decimal point. Inputs with more than two decimal places
    /// are rejected rather than rounded, which also rejects `1.234`: it is either R$ 1.234,00
    /// written without the cents or a mistyped 1.23, and guessing would store the wrong amount.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("R$").trim();
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_string()
        };
        let amount = Decimal::from_str_exact(&normalized)
            .map_err(|err| Error::InvalidArgument(format!("cannot parse amount {s:?}: {err}")))?;
        Cents::from_decimal_exact(amount)
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Written as a decimal string in major units, so ledgers stay readable
impl Serialize for Cents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::str::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = rust_decimal::serde::str::deserialize(deserializer)?;
        Cents::from_decimal_exact(amount).map_err(serde::de::Error::custom)
    }
}
