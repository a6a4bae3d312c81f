//! [`Query`] collection related to a single [`User`].

use common::{
    credits,
    operations::{By, Select},
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::Query;

use super::{DatabaseQuery, Query as QueryTrait};

/// Queries a [`User`] by its [`user::Id`].
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

/// [`Query`] of the current credit [`Balance`] of a [`User`].
///
/// [`Balance`]: credits::Balance
#[derive(Clone, Copy, Debug)]
pub struct Balance {
    /// ID of the [`User`] whose balance is queried.
    pub user_id: user::Id,
}

impl<Db> QueryTrait<Balance> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = credits::Balance;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Balance { user_id }: Balance,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|user| user.balance)
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`Balance`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
