//! [`Session`] read model definitions.

use crate::domain::{session, user};
#[cfg(doc)]
use crate::domain::Session;

/// Selector of non-terminal [`Session`]s of a [`User`] (in either role)
/// whose scheduled window overlaps the provided half-open `[start, end)`
/// window.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct Overlapping {
    /// ID of the [`User`] whose [`Session`]s are checked.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// Start of the checked window (inclusive).
    pub start: session::ScheduledStartDateTime,

    /// End of the checked window (exclusive).
    pub end: session::ScheduledEndDateTime,

    /// ID of a [`Session`] to leave out of the check (when rescheduling).
    pub exclude: Option<session::Id>,
}

/// Selector of [`Session`]s of a [`User`] (in either role) that are still
/// ahead: non-terminal with `scheduled_start` after the provided moment,
/// ascending by `scheduled_start`.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct Upcoming {
    /// ID of the [`User`] whose [`Session`]s are listed.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// Moment the listed [`Session`]s must start after.
    pub after: session::ScheduledStartDateTime,
}

/// Selector of finished [`Session`]s (Completed or Cancelled) of a [`User`]
/// (in either role), descending by creation time.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct History {
    /// ID of the [`User`] whose [`Session`]s are listed.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,
}
