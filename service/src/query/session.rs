//! [`Query`] collection related to [`Session`]s.

use common::operations::By;

use crate::{
    domain::{session, Session},
    read,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Session`] by its [`session::Id`].
pub type ById = DatabaseQuery<By<Option<Session>, session::Id>>;

/// Queries upcoming [`Session`]s of a [`User`], ascending by their
/// scheduled start.
///
/// [`User`]: crate::domain::User
pub type Upcoming = DatabaseQuery<By<Vec<Session>, read::session::Upcoming>>;

/// Queries finished [`Session`]s of a [`User`], newest first.
///
/// [`User`]: crate::domain::User
pub type History = DatabaseQuery<By<Vec<Session>, read::session::History>>;

/// Queries non-terminal [`Session`]s of a [`User`] conflicting with a
/// half-open time window.
///
/// An empty result means the window is bookable for that [`User`].
///
/// [`User`]: crate::domain::User
pub type Conflicts =
    DatabaseQuery<By<Vec<Session>, read::session::Overlapping>>;
