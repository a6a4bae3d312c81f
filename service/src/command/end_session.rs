//! [`Command`] for ending an in-progress [`Session`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{database, Database},
    Service,
};

use super::{settle_session, Command, SettleSession};

/// [`Command`] for ending an in-progress [`Session`] and settling its
/// escrow.
#[derive(Clone, Debug)]
pub struct EndSession {
    /// ID of the [`Session`] to end.
    pub session_id: session::Id,

    /// Notes to append to the [`Session`].
    pub notes: Option<session::Notes>,
}

impl<Db> Command<EndSession> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Session, session::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Session>, session::Id>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<Update<Session>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
            SettleSession,
            Ok = Session,
            Err = Traced<settle_session::ExecutionError>,
        >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        EndSession { session_id, notes }: EndSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes concurrent transitions of the same `Session`.
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
        if session.status != session::Status::InProgress {
            return Err(tracerr::new!(E::WrongStatus {
                expected: session::Status::InProgress,
                actual: session.status,
            }));
        }

        session.status = session::Status::Completed;
        session.actual_end = Some(DateTime::now().coerce());
        if let Some(notes) = notes {
            session.append_note(notes);
        }

        tx.execute(Update(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        drop(tx);

        // Settlement runs in its own transaction once the completion is
        // durable, and may be retried on its own if it fails here.
        self.execute(SettleSession { session_id })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`EndSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Session`] with the provided ID does not exist.
    #[display("`Session(id: {_0})` does not exist")]
    SessionNotExists(#[error(not(source))] session::Id),

    /// Settlement of the ended [`Session`] failed.
    #[display("failed to settle the `Session`: {_0}")]
    #[from]
    Settlement(settle_session::ExecutionError),

    /// [`Session`] is not in the expected [`session::Status`].
    #[display("`Session` is {actual}, while {expected} is expected")]
    WrongStatus {
        /// [`session::Status`] the [`Session`] was expected to be in.
        expected: session::Status,

        /// [`session::Status`] the [`Session`] is actually in.
        actual: session::Status,
    },
}
