//! [`Match`] definitions.

use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{skill, user};

/// Pairing of a teacher and a student over a skill, produced by the
/// matching flow.
///
/// Only an [`Status::Accepted`] [`Match`] may have [`Session`]s booked
/// against it.
///
/// [`Session`]: crate::domain::Session
#[derive(Clone, Debug)]
pub struct Match {
    /// ID of this [`Match`].
    pub id: Id,

    /// ID of the teaching [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub teacher_id: user::Id,

    /// ID of the learning [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub student_id: user::Id,

    /// ID of the skill to be exchanged.
    pub skill_id: skill::Id,

    /// Current [`Status`] of this [`Match`].
    pub status: Status,

    /// [`DateTime`] when this [`Match`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,
}

impl Match {
    /// Returns whether this [`Match`] has been accepted by both sides.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == Status::Accepted
    }
}

/// ID of a [`Match`].
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
    #[doc = "Status of a [`Match`]."]
    enum Status {
        #[doc = "The [`Match`] awaits a decision."]
        Pending = 1,

        #[doc = "The [`Match`] was accepted and is bookable."]
        Accepted = 2,

        #[doc = "The [`Match`] was rejected."]
        Rejected = 3,
    }
}

/// [`DateTime`] when a [`Match`] was created.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Match, unit::Creation)>;
