//! [`Transaction`] read model definitions.

use crate::domain::user;
#[cfg(doc)]
use crate::domain::Transaction;

/// Selector of [`Transaction`]s of a [`User`], newest first.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct History {
    /// ID of the [`User`] whose [`Transaction`]s are listed.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// Maximum number of [`Transaction`]s to return.
    pub limit: Option<u32>,
}
