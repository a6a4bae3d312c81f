//! [`Query`] collection related to [`Transaction`]s.

use common::operations::By;

use crate::{domain::Transaction, read};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the ledger [`Transaction`]s of a [`User`], newest first.
///
/// [`User`]: crate::domain::User
pub type History =
    DatabaseQuery<By<Vec<Transaction>, read::transaction::History>>;
