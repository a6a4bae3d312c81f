//! Credit arithmetic definitions.
//!
//! Credits are the integer internal currency of the platform: a session is
//! priced in a positive [`Amount`], every ledger entry carries a signed
//! [`Delta`], and a user's cached [`Balance`] is the running sum of their
//! ledger [`Delta`]s.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Positive amount of credits.
///
/// Used wherever a strictly positive quantity is required: session prices,
/// transfer sizes, refunds.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Amount(i64);

impl Amount {
    /// Creates a new [`Amount`] if the given `value` is positive.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Creates a new [`Amount`] without performing any validation.
    ///
    /// # Safety
    ///
    /// The provided `value` must be positive.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(value: i64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of this [`Amount`].
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns the given `percent` of this [`Amount`], rounded down.
    ///
    /// [`None`] is returned when the rounded-down share is zero.
    #[must_use]
    pub fn percent(self, percent: u8) -> Option<Self> {
        Self::new(self.0.checked_mul(i64::from(percent))? / 100)
    }
}

impl FromStr for Amount {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `credits::Amount`")
    }
}

/// Signed change of a [`Balance`].
///
/// A positive [`Delta`] credits the user, a negative one debits them. Zero
/// is unrepresentable: every ledger entry moves the balance.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Delta(i64);

impl Delta {
    /// Creates a [`Delta`] crediting the given [`Amount`].
    #[must_use]
    pub const fn credit(amount: Amount) -> Self {
        Self(amount.get())
    }

    /// Creates a [`Delta`] debiting the given [`Amount`].
    #[must_use]
    pub const fn debit(amount: Amount) -> Self {
        Self(-amount.get())
    }

    /// Returns the numeric value of this [`Delta`].
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Indicates whether this [`Delta`] credits the user.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        self.0 > 0
    }
}

impl FromStr for Delta {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .ok()
            .filter(|v| *v != 0)
            .map(Self)
            .ok_or("invalid `credits::Delta`")
    }
}

/// Non-negative cached balance of a user.
///
/// A [`Balance`] is a projection of the user's ledger and is only ever
/// mutated together with a ledger entry carrying the matching [`Delta`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Balance(i64);

impl Balance {
    /// A [`Balance`] of zero credits.
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Balance`] if the given `value` is not negative.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        (value >= 0).then_some(Self(value))
    }

    /// Returns the numeric value of this [`Balance`].
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Indicates whether this [`Balance`] covers the given [`Amount`].
    #[must_use]
    pub const fn covers(self, amount: Amount) -> bool {
        self.0 >= amount.get()
    }

    /// Applies the given [`Delta`] to this [`Balance`].
    ///
    /// [`None`] is returned when the resulting balance would be negative.
    #[must_use]
    pub fn apply(self, delta: Delta) -> Option<Self> {
        Self::new(self.0.checked_add(delta.get())?)
    }

    /// Returns this [`Balance`] grown by the given [`Amount`], saturating
    /// on overflow.
    #[must_use]
    pub const fn credited(self, amount: Amount) -> Self {
        Self(self.0.saturating_add(amount.get()))
    }
}

impl FromStr for Balance {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `credits::Balance`")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Positive amount of credits, serialized as a decimal string.
    #[graphql_scalar(name = "CreditsAmount", with = Self, parse_token(String))]
    type Amount = super::Amount;

    impl Amount {
        fn to_output<S: ScalarValue>(amount: &Amount) -> Value<S> {
            Value::scalar(amount.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `CreditsAmount` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!(
                            "Cannot parse `CreditsAmount` input scalar: {e}",
                        )
                    })
                })
        }
    }

    /// Signed balance change, serialized as a decimal string.
    #[graphql_scalar(name = "CreditsDelta", with = Self, parse_token(String))]
    type Delta = super::Delta;

    impl Delta {
        fn to_output<S: ScalarValue>(delta: &Delta) -> Value<S> {
            Value::scalar(delta.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `CreditsDelta` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!(
                            "Cannot parse `CreditsDelta` input scalar: {e}",
                        )
                    })
                })
        }
    }

    /// Non-negative credit balance, serialized as a decimal string.
    #[graphql_scalar(name = "CreditsBalance", with = Self, parse_token(String))]
    type Balance = super::Balance;

    impl Balance {
        fn to_output<S: ScalarValue>(balance: &Balance) -> Value<S> {
            Value::scalar(balance.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `CreditsBalance` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!(
                            "Cannot parse `CreditsBalance` input scalar: {e}",
                        )
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{Amount, Balance, Delta};

    fn amount(v: i64) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn amount_rejects_non_positive() {
        assert!(Amount::new(0).is_none());
        assert!(Amount::new(-5).is_none());
        assert_eq!(Amount::new(1).unwrap().get(), 1);
    }

    #[test]
    fn percent_rounds_down() {
        assert_eq!(amount(20).percent(20), Some(amount(4)));
        assert_eq!(amount(20).percent(50), Some(amount(10)));
        assert_eq!(amount(25).percent(50), Some(amount(12)));
        assert_eq!(amount(7).percent(20), Some(amount(1)));

        // A floored-to-zero share is no share at all.
        assert_eq!(amount(4).percent(20), None);
    }

    #[test]
    fn balance_never_goes_negative() {
        let balance = Balance::new(10).unwrap();

        assert_eq!(
            balance.apply(Delta::debit(amount(10))),
            Some(Balance::ZERO),
        );
        assert_eq!(balance.apply(Delta::debit(amount(11))), None);
        assert_eq!(
            balance.apply(Delta::credit(amount(5))),
            Balance::new(15),
        );
    }

    #[test]
    fn covers_is_inclusive() {
        let balance = Balance::new(10).unwrap();

        assert!(balance.covers(amount(10)));
        assert!(!balance.covers(amount(11)));
        assert!(!Balance::ZERO.covers(amount(1)));
    }

    #[test]
    fn from_str() {
        assert_eq!("42".parse::<Amount>().unwrap(), amount(42));
        assert!("0".parse::<Amount>().is_err());
        assert!("-3".parse::<Amount>().is_err());
        assert!("credits".parse::<Amount>().is_err());

        assert_eq!("0".parse::<Balance>().unwrap(), Balance::ZERO);
        assert!("-1".parse::<Balance>().is_err());

        assert_eq!("-3".parse::<Delta>().unwrap(), Delta::debit(amount(3)));
        assert_eq!("3".parse::<Delta>().unwrap(), Delta::credit(amount(3)));
        assert!("0".parse::<Delta>().is_err());
    }
}
