//! [`Command`] for settling the escrow of a completed [`Session`].

use std::collections::HashMap;

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
    domain::{session, transaction, user, Session, Transaction, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// Share of the escrow granted to the student as a completion bonus,
/// in percent.
const STUDENT_BONUS_PERCENT: u8 = 20;

/// [`Command`] for settling the escrow of a completed [`Session`]: the
/// teacher earns the full escrowed amount, the student earns a
/// [`STUDENT_BONUS_PERCENT`] bonus (rounded down), and both participants'
/// counters and skill points grow by their credited amounts.
///
/// Idempotent: settling an already settled [`Session`] is a no-op.
#[derive(Clone, Copy, Debug)]
pub struct SettleSession {
    /// ID of the [`Session`] to settle.
    pub session_id: session::Id,
}

impl<Db> Command<SettleSession> for Service<Db>
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
        SettleSession { session_id }: SettleSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let check = |session: &Session| {
            if session.status == session::Status::Completed {
                Ok(())
            } else {
                Err(E::WrongStatus {
                    expected: session::Status::Completed,
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
        if session.settled_at.is_some() {
            return Ok(session);
        }
        check(&session).map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Stable order prevents lock cycles with concurrent cancellations.
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
        if session.settled_at.is_some() {
            return Ok(session);
        }
        check(&session).map_err(tracerr::wrap!())?;

        let users = tx
            .execute(Select(By::new(session.participants())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let teacher = users
            .get(&session.teacher_id)
            .ok_or(E::UserNotExists(session.teacher_id))
            .map_err(tracerr::wrap!())?;
        let student = users
            .get(&session.student_id)
            .ok_or(E::UserNotExists(session.student_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();

        let reward = credits::Delta::credit(session.credits);
        tx.execute(Insert(Transaction {
            id: transaction::Id::new(),
            user_id: teacher.id,
            amount: reward,
            kind: transaction::Kind::Earned,
            description: transaction::Description::new(format!(
                "Teaching reward for session {}",
                session.id,
            )),
            session_id: Some(session.id),
            created_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;
        tx.execute(Update(User {
            balance: teacher.balance.credited(session.credits),
            skill_points: teacher.skill_points.gained(session.credits),
            sessions_taught: teacher.sessions_taught.incremented(),
            ..teacher.clone()
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let mut student = User {
            sessions_completed: student.sessions_completed.incremented(),
            ..student.clone()
        };
        if let Some(bonus) = session.credits.percent(STUDENT_BONUS_PERCENT) {
            tx.execute(Insert(Transaction {
                id: transaction::Id::new(),
                user_id: student.id,
                amount: credits::Delta::credit(bonus),
                kind: transaction::Kind::Earned,
                description: transaction::Description::new(format!(
                    "Learning bonus for session {}",
                    session.id,
                )),
                session_id: Some(session.id),
                created_at: now.coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
            student.balance = student.balance.credited(bonus);
            student.skill_points = student.skill_points.gained(bonus);
        }
        tx.execute(Update(student))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        session.settled_at = Some(now.coerce());
        tx.execute(Update(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(session)
    }
}

/// Error of [`SettleSession`] [`Command`] execution.
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
