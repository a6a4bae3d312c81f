//! [`Command`] for scheduling a new [`Session`].

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
    domain::{
        matching, session, transaction, user, Match, Session, Transaction,
        User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for scheduling a new [`Session`] against an accepted
/// [`Match`].
///
/// Escrows the agreed credits from the student at booking time.
#[derive(Clone, Copy, Debug)]
pub struct ScheduleSession {
    /// ID of the accepted [`Match`] to book against.
    pub match_id: matching::Id,

    /// [`DateTime`] when the new [`Session`] starts.
    pub scheduled_start: session::ScheduledStartDateTime,

    /// [`DateTime`] when the new [`Session`] ends.
    pub scheduled_end: session::ScheduledEndDateTime,

    /// Credits to escrow from the student for the new [`Session`].
    pub credits: credits::Amount,
}

impl<Db> Command<ScheduleSession> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Match>, matching::Id>>,
            Ok = Option<Match>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<user::Id, User>, [user::Id; 2]>>,
            Ok = HashMap<user::Id, User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Session>, read::session::Overlapping>>,
            Ok = Vec<Session>,
            Err = Traced<database::Error>,
        > + Database<Insert<Session>, Err = Traced<database::Error>>
        + Database<Insert<Transaction>, Err = Traced<database::Error>>
        + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ScheduleSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ScheduleSession {
            match_id,
            scheduled_start,
            scheduled_end,
            credits,
        } = cmd;

        let now = DateTime::now();

        let schedule =
            session::Schedule::new(scheduled_start, scheduled_end, now)
                .map_err(tracerr::from_and_wrap!(=> E))?;

        let matching = self
            .database()
            .execute(Select(By::<Option<Match>, _>::new(match_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::MatchNotExists(match_id))
            .map_err(tracerr::wrap!())?;
        if !matching.is_accepted() {
            return Err(tracerr::new!(E::MatchNotAccepted(match_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes double-booking and double-spend races on both
        // participants. Stable order prevents lock cycles.
        let mut participants = [matching.teacher_id, matching.student_id];
        participants.sort_unstable();
        for id in participants {
            tx.execute(Lock(By::<User, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        for (user_id, party) in [
            (matching.teacher_id, Party::Teacher),
            (matching.student_id, Party::Student),
        ] {
            let conflicts = tx
                .execute(Select(By::<Vec<Session>, _>::new(
                    read::session::Overlapping {
                        user_id,
                        start: schedule.start,
                        end: schedule.end,
                        exclude: None,
                    },
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if !conflicts.is_empty() {
                return Err(tracerr::new!(E::ScheduleConflict(party)));
            }
        }

        let users = tx
            .execute(Select(By::new([
                matching.teacher_id,
                matching.student_id,
            ])))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let student = users
            .get(&matching.student_id)
            .ok_or(E::UserNotExists(matching.student_id))
            .map_err(tracerr::wrap!())?;
        if !student.balance.covers(credits) {
            return Err(tracerr::new!(E::InsufficientCredits {
                required: credits,
                available: student.balance,
            }));
        }

        let session = Session {
            id: session::Id::new(),
            match_id,
            teacher_id: matching.teacher_id,
            student_id: matching.student_id,
            skill_id: matching.skill_id,
            scheduled_start: schedule.start,
            scheduled_end: schedule.end,
            actual_start: None,
            actual_end: None,
            status: session::Status::Scheduled,
            credits,
            video_room: None,
            notes: None,
            created_at: now.coerce(),
            settled_at: None,
        };

        tx.execute(Insert(session.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let escrow = credits::Delta::debit(credits);
        tx.execute(Insert(Transaction {
            id: transaction::Id::new(),
            user_id: student.id,
            amount: escrow,
            kind: transaction::Kind::Spent,
            description: transaction::Description::new(format!(
                "Escrow for session {}",
                session.id,
            )),
            session_id: Some(session.id),
            created_at: now.coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let balance = student
            .balance
            .apply(escrow)
            .ok_or(E::InsufficientCredits {
                required: credits,
                available: student.balance,
            })
            .map_err(tracerr::wrap!())?;
        tx.execute(Update(User {
            balance,
            ..student.clone()
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let reminders = Arc::clone(self.reminders());
        let scheduled = session.clone();
        drop(tokio::spawn(async move {
            if let Err(e) = reminders.session_scheduled(&scheduled).await {
                log::warn!(
                    session_id = %scheduled.id,
                    "failed to dispatch reminder: {e}",
                );
            }
        }));

        Ok(session)
    }
}

/// Participant of a [`Session`] on whose side a schedule conflict was
/// detected.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Party {
    /// Teaching side of the [`Session`].
    #[display("teacher")]
    Teacher,

    /// Learning side of the [`Session`].
    #[display("student")]
    Student,
}

/// Error of [`ScheduleSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Student's balance doesn't cover the requested escrow.
    #[display(
        "insufficient credits: {required} required, {available} available"
    )]
    InsufficientCredits {
        /// Credits required for the escrow.
        required: credits::Amount,

        /// Credits actually available on the student's balance.
        available: credits::Balance,
    },

    /// Requested scheduled window is invalid.
    #[display("invalid schedule: {_0}")]
    #[from]
    InvalidSchedule(session::InvalidSchedule),

    /// [`Match`] is not in the `Accepted` status.
    #[display("`Match(id: {_0})` is not accepted")]
    MatchNotAccepted(#[error(not(source))] matching::Id),

    /// [`Match`] with the provided ID does not exist.
    #[display("`Match(id: {_0})` does not exist")]
    MatchNotExists(#[error(not(source))] matching::Id),

    /// Requested window overlaps another [`Session`] of a participant.
    #[display("schedule conflicts with another `Session` of the {_0}")]
    ScheduleConflict(#[error(not(source))] Party),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
