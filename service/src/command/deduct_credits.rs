//! [`Command`] for deducting credits from a [`User`]'s balance.

use common::{
    credits,
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{transaction, user, Transaction, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for deducting credits from a [`User`]'s balance.
///
/// Fails without any state change when the balance doesn't cover the
/// deduction.
#[derive(Clone, Debug)]
pub struct DeductCredits {
    /// ID of the [`User`] to debit.
    pub user_id: user::Id,

    /// Credits to deduct.
    pub amount: credits::Amount,

    /// Description of the resulting ledger [`Transaction`].
    pub description: Option<transaction::Description>,
}

impl<Db> Command<DeductCredits> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeductCredits {
            user_id,
            amount,
            description,
        }: DeductCredits,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent balance mutations of the same `User`.
        tx.execute(Lock(By::<User, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let debit = credits::Delta::debit(amount);
        let balance = user
            .balance
            .apply(debit)
            .ok_or(E::InsufficientCredits {
                required: amount,
                available: user.balance,
            })
            .map_err(tracerr::wrap!())?;

        tx.execute(Insert(Transaction {
            id: transaction::Id::new(),
            user_id,
            amount: debit,
            kind: transaction::Kind::Spent,
            description,
            session_id: None,
            created_at: DateTime::now().coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let user = User { balance, ..user };
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`DeductCredits`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`]'s balance doesn't cover the deduction.
    #[display(
        "insufficient credits: {required} required, {available} available"
    )]
    InsufficientCredits {
        /// Credits required for the deduction.
        required: credits::Amount,

        /// Credits actually available on the balance.
        available: credits::Balance,
    },

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
