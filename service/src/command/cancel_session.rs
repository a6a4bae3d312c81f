//! [`Command`] for cancelling a scheduled [`Session`].

use std::{collections::HashMap, sync::Arc};

use common::{
    credits,
    operations::{
        By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{session, transaction, user, Session, Transaction, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a scheduled [`Session`] with a tiered refund
/// of its escrow.
///
/// Only a `Scheduled` [`Session`] may be cancelled: an in-progress one must
/// be ended instead.
#[derive(Clone, Debug)]
pub struct CancelSession {
    /// ID of the [`Session`] to cancel.
    pub session_id: session::Id,

    /// Reason of the cancellation.
    pub reason: Option<session::Notes>,
}

impl<Db> Command<CancelSession> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Session>, session::Id>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Session, session::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<User, user::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Session>, session::Id>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<user::Id, User>, [user::Id; 2]>>,
            Ok = HashMap<user::Id, User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Update<Session>, Err = Traced<database::Error>>
        + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CancelSession { session_id, reason }: CancelSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let check = |session: &Session| {
            if session.status == session::Status::Scheduled {
                Ok(())
            } else {
                Err(E::WrongStatus {
                    expected: session::Status::Scheduled,
                    actual: session.status,
                })
            }
        };

        let session = self
            .database()
            .execute(Select(By::<Option<Session>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())?;
        check(&session).map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Stable order prevents lock cycles with concurrent bookings.
        let mut participants = session.participants();
        participants.sort_unstable();
        for id in participants {
            tx.execute(Lock(By::<User, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Lock(By::<Session, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut session = tx
            .execute(Select(By::<Option<Session>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())?;
        check(&session).map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        let notice = session.scheduled_start.signed_since(now);
        let tier = session::RefundTier::on_notice(notice);

        if let Some(refund) = tier.refund(session.credits) {
            let users = tx
                .execute(Select(By::new(session.participants())))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            let student = users
                .get(&session.student_id)
                .ok_or(E::UserNotExists(session.student_id))
                .map_err(tracerr::wrap!())?;

            tx.execute(Insert(Transaction {
                id: transaction::Id::new(),
                user_id: student.id,
                amount: credits::Delta::credit(refund),
                kind: transaction::Kind::Refunded,
                description: transaction::Description::new(format!(
                    "Refund for cancelled session {}",
                    session.id,
                )),
                session_id: Some(session.id),
                created_at: now.coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

            tx.execute(Update(User {
                balance: student.balance.credited(refund),
                ..student.clone()
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        }

        session.status = session::Status::Cancelled;
        if let Some(reason) = reason {
            session.append_note(reason);
        }

        tx.execute(Update(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let reminders = Arc::clone(self.reminders());
        let cancelled = session.clone();
        drop(tokio::spawn(async move {
            if let Err(e) = reminders.session_cancelled(&cancelled).await {
                log::warn!(
                    session_id = %cancelled.id,
                    "failed to dispatch cancellation notice: {e}",
                );
            }
        }));

        Ok(session)
    }
}

/// Error of [`CancelSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Session`] with the provided ID does not exist.
    #[display("`Session(id: {_0})` does not exist")]
    SessionNotExists(#[error(not(source))] session::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`Session`] is not in the expected [`session::Status`].
    #[display("`Session` is {actual}, while {expected} is expected")]
    WrongStatus {
        /// [`session::Status`] the [`Session`] was expected to be in.
        expected: session::Status,

        /// [`session::Status`] the [`Session`] is actually in.
        actual: session::Status,
    },
}
