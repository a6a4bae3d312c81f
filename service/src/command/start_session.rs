//! [`Command`] for starting a [`Session`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{database, video, Database},
    Service,
};

use super::Command;

/// [`Command`] for starting a [`Session`], allocating its video room and
/// access tokens for both participants.
///
/// Allowed only within the configured window around the scheduled start.
#[derive(Clone, Copy, Debug)]
pub struct StartSession {
    /// ID of the [`Session`] to start.
    pub session_id: session::Id,
}

/// Output of the [`StartSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Started [`Session`].
    pub session: Session,

    /// Token for the teacher to join the video room.
    pub teacher_token: session::AccessToken,

    /// Token for the student to join the video room.
    pub student_token: session::AccessToken,
}

impl<Db> Command<StartSession> for Service<Db>
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
        > + Database<
            Select<By<Option<Session>, session::Id>>,
            Ok = Option<Session>,
            Err = Traced<database::Error>,
        > + Database<Update<Session>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        StartSession { session_id }: StartSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let check = |session: &Session, now: DateTime| {
            if session.status != session::Status::Scheduled {
                return Err(E::WrongStatus {
                    expected: session::Status::Scheduled,
                    actual: session.status,
                });
            }
            if !self
                .config()
                .start_window
                .contains(session.scheduled_start, now)
            {
                return Err(E::OutsideStartWindow(session_id));
            }
            Ok(())
        };

        let session = self
            .database()
            .execute(Select(By::<Option<Session>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())?;
        check(&session, DateTime::now()).map_err(tracerr::wrap!())?;

        // Room allocation talks to an external provider, so it stays
        // outside the transaction.
        let room = self
            .rooms()
            .create_room(session_id)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let teacher_token = self
            .rooms()
            .issue_token(&room, session.teacher_id)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let student_token = self
            .rooms()
            .issue_token(&room, session.student_id)
            .await
            .map_err(tracerr::from_and_wrap!(=> E))?;

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

        let now = DateTime::now();
        let mut session = tx
            .execute(Select(By::<Option<Session>, _>::new(session_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SessionNotExists(session_id))
            .map_err(tracerr::wrap!())?;
        check(&session, now).map_err(tracerr::wrap!())?;

        session.status = session::Status::InProgress;
        session.actual_start = Some(now.coerce());
        session.video_room = Some(room);

        tx.execute(Update(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(Output {
            session,
            teacher_token,
            student_token,
        })
    }
}

/// Error of [`StartSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Current moment is outside the allowed start window.
    #[display("`Session(id: {_0})` cannot be started at this time")]
    OutsideStartWindow(#[error(not(source))] session::Id),

    /// [`Session`] with the provided ID does not exist.
    #[display("`Session(id: {_0})` does not exist")]
    SessionNotExists(#[error(not(source))] session::Id),

    /// [`VideoRooms`] provider error.
    ///
    /// [`VideoRooms`]: crate::infra::VideoRooms
    #[display("failed to allocate a video room: {_0}")]
    #[from]
    VideoRooms(video::Error),

    /// [`Session`] is not in the expected [`session::Status`].
    #[display("`Session` is {actual}, while {expected} is expected")]
    WrongStatus {
        /// [`session::Status`] the [`Session`] was expected to be in.
        expected: session::Status,

        /// [`session::Status`] the [`Session`] is actually in.
        actual: session::Status,
    },
}
