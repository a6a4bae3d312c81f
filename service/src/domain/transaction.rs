//! [`Transaction`] definitions.

use common::{credits, define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::{session, user};

/// Immutable record of a single credit movement on a [`User`]'s balance.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: Id,

    /// ID of the [`User`] whose balance this [`Transaction`] moved.
    pub user_id: user::Id,

    /// Signed credit movement of this [`Transaction`].
    pub amount: credits::Delta,

    /// [`Kind`] of this [`Transaction`].
    pub kind: Kind,

    /// Human-readable [`Description`] of this [`Transaction`].
    pub description: Option<Description>,

    /// ID of the [`Session`] this [`Transaction`] relates to, if any.
    ///
    /// [`Session`]: crate::domain::Session
    pub session_id: Option<session::Id>,

    /// [`DateTime`] when this [`Transaction`] was recorded.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

/// ID of a [`Transaction`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Kind of a [`Transaction`]."]
    enum Kind {
        #[doc = "Credits earned by teaching a `Session`."]
        Earned = 1,

        #[doc = "Credits spent on booking a `Session`."]
        Spent = 2,

        #[doc = "Credits purchased or granted from outside."]
        Purchased = 3,

        #[doc = "Credits refunded for a cancelled `Session`."]
        Refunded = 4,
    }
}

/// Description of a [`Transaction`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is a valid [`Description`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.len() <= 512
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// [`DateTime`] when a [`Transaction`] was recorded.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Transaction, unit::Creation)>;
