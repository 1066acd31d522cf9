//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql as _, ToSql as _};
use rust_decimal::Decimal;

use crate::define_kind;

/// Exact amount of money in some [`Currency`].
///
/// Backed by a [`Decimal`], so stored totals never accumulate binary
/// floating point representation errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Indicates whether this [`Money`] amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        write!(f, "{}{currency}", amount.normalize())
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(split) = s.len().checked_sub(3).filter(|n| *n > 0) else {
            return Err("too short");
        };
        if !s.is_char_boundary(split) {
            return Err("invalid currency");
        }

        let (amount, currency) = s.split_at(split);
        Ok(Self {
            amount: Decimal::from_str(amount).map_err(|_| "invalid amount")?,
            currency: Currency::from_str(currency)
                .map_err(|_| "invalid currency")?,
        })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Pound Sterling."]
        Gbp = 3,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}{currency}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer;
    /// - `currency` is a three-letter currency code.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}
