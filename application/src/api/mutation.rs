//! GraphQL [`Mutation`]s definitions.

use common::{credits, DateTime};
use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Schedules a new `Session` against an accepted `Match`, escrowing the
    /// agreed credits from the student.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `MATCH_NOT_EXISTS` - the `Match` with the provided ID does not
    ///                        exist;
    /// - `MATCH_NOT_ACCEPTED` - the `Match` with the provided ID is not
    ///                          accepted;
    /// - `INVALID_SCHEDULE` - the requested window is in the past, inverted,
    ///                        too short or too long;
    /// - `SCHEDULE_CONFLICT` - the requested window overlaps another active
    ///                         `Session` of a participant;
    /// - `INSUFFICIENT_CREDITS` - the student's balance doesn't cover the
    ///                            escrow;
    /// - `USER_NOT_EXISTS` - a participant of the `Match` does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            credits = %credits,
            gql.name = "scheduleSession",
            match_id = %match_id,
            otel.name = Self::SPAN_NAME,
            scheduled_end = ?scheduled_end,
            scheduled_start = ?scheduled_start,
        ),
    )]
    pub async fn schedule_session(
        match_id: api::session::MatchId,
        scheduled_start: DateTime,
        scheduled_end: DateTime,
        credits: credits::Amount,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        ctx.service()
            .execute(command::ScheduleSession {
                match_id: match_id.into(),
                scheduled_start: scheduled_start.coerce(),
                scheduled_end: scheduled_end.coerce(),
                credits,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Starts the `Session` with the provided ID, allocating a video room
    /// and issuing access tokens for both participants.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SESSION_NOT_EXISTS` - the `Session` with the provided ID does not
    ///                          exist;
    /// - `WRONG_SESSION_STATUS` - the `Session` is not scheduled;
    /// - `OUTSIDE_START_WINDOW` - the current moment is outside the allowed
    ///                            start window.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "startSession",
            otel.name = Self::SPAN_NAME,
            session_id = %session_id,
        ),
    )]
    pub async fn start_session(
        session_id: api::session::Id,
        ctx: &Context,
    ) -> Result<api::session::StartResult, Error> {
        ctx.service()
            .execute(command::StartSession {
                session_id: session_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Ends the running `Session` with the provided ID and settles its
    /// escrow: the teacher is paid the escrowed credits and the student
    /// receives a completion bonus.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SESSION_NOT_EXISTS` - the `Session` with the provided ID does not
    ///                          exist;
    /// - `WRONG_SESSION_STATUS` - the `Session` is not in progress.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "endSession",
            notes = ?notes.as_ref().map(ToString::to_string),
            otel.name = Self::SPAN_NAME,
            session_id = %session_id,
        ),
    )]
    pub async fn end_session(
        session_id: api::session::Id,
        notes: Option<api::session::Notes>,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        ctx.service()
            .execute(command::EndSession {
                session_id: session_id.into(),
                notes: notes.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the scheduled `Session` with the provided ID, refunding the
    /// student according to the cancellation notice.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SESSION_NOT_EXISTS` - the `Session` with the provided ID does not
    ///                          exist;
    /// - `WRONG_SESSION_STATUS` - the `Session` is not scheduled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelSession",
            otel.name = Self::SPAN_NAME,
            reason = ?reason.as_ref().map(ToString::to_string),
            session_id = %session_id,
        ),
    )]
    pub async fn cancel_session(
        session_id: api::session::Id,
        reason: Option<api::session::Notes>,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        ctx.service()
            .execute(command::CancelSession {
                session_id: session_id.into(),
                reason: reason.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Settles the escrow of the completed `Session` with the provided ID.
    ///
    /// Settlement normally happens as part of ending a `Session`, but may be
    /// retried here if it failed there. Settling an already settled `Session`
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SESSION_NOT_EXISTS` - the `Session` with the provided ID does not
    ///                          exist;
    /// - `WRONG_SESSION_STATUS` - the `Session` is not completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "settleSession",
            otel.name = Self::SPAN_NAME,
            session_id = %session_id,
        ),
    )]
    pub async fn settle_session(
        session_id: api::session::Id,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        ctx.service()
            .execute(command::SettleSession {
                session_id: session_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Adds the provided amount of credits to the `User`'s balance.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the provided ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = %amount,
            description = ?description.as_ref().map(ToString::to_string),
            gql.name = "addCredits",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn add_credits(
        user_id: api::user::Id,
        amount: credits::Amount,
        description: Option<api::transaction::Description>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::AddCredits {
                user_id: user_id.into(),
                amount,
                description: description.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deducts the provided amount of credits from the `User`'s balance.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the provided ID does not exist;
    /// - `INSUFFICIENT_CREDITS` - the `User`'s balance doesn't cover the
    ///                            deduction.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = %amount,
            description = ?description.as_ref().map(ToString::to_string),
            gql.name = "deductCredits",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn deduct_credits(
        user_id: api::user::Id,
        amount: credits::Amount,
        description: Option<api::transaction::Description>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::DeductCredits {
                user_id: user_id.into(),
                amount,
                description: description.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl AsError for command::schedule_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INSUFFICIENT_CREDITS"]
                #[status = CONFLICT]
                #[message = "Student's balance doesn't cover the escrow"]
                InsufficientCredits,

                #[code = "INVALID_SCHEDULE"]
                #[status = BAD_REQUEST]
                #[message = "Requested scheduled window is invalid"]
                InvalidSchedule,

                #[code = "MATCH_NOT_ACCEPTED"]
                #[status = CONFLICT]
                #[message = "`Match` with the provided ID is not accepted"]
                MatchNotAccepted,

                #[code = "MATCH_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Match` with the provided ID does not exist"]
                MatchNotExists,

                #[code = "SCHEDULE_CONFLICT"]
                #[status = CONFLICT]
                #[message = "Requested window overlaps another `Session` of \
                             a participant"]
                ScheduleConflict,

                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided ID does not exist"]
                UserNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InsufficientCredits { .. } => {
                Error::InsufficientCredits.into()
            }
            Self::InvalidSchedule(_) => Error::InvalidSchedule.into(),
            Self::MatchNotAccepted(_) => Error::MatchNotAccepted.into(),
            Self::MatchNotExists(_) => Error::MatchNotExists.into(),
            Self::ScheduleConflict(_) => Error::ScheduleConflict.into(),
            Self::UserNotExists(_) => Error::UserNotExists.into(),
        })
    }
}

impl AsError for command::start_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "OUTSIDE_START_WINDOW"]
                #[status = CONFLICT]
                #[message = "`Session` cannot be started at this time"]
                OutsideStartWindow,

                #[code = "SESSION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Session` with the provided ID does not exist"]
                SessionNotExists,

                #[code = "WRONG_SESSION_STATUS"]
                #[status = CONFLICT]
                #[message = "`Session` is not in the expected status"]
                WrongStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::OutsideStartWindow(_) => Error::OutsideStartWindow.into(),
            Self::SessionNotExists(_) => Error::SessionNotExists.into(),
            Self::VideoRooms(_) => return None,
            Self::WrongStatus { .. } => Error::WrongStatus.into(),
        })
    }
}

impl AsError for command::end_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SESSION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Session` with the provided ID does not exist"]
                SessionNotExists,

                #[code = "WRONG_SESSION_STATUS"]
                #[status = CONFLICT]
                #[message = "`Session` is not in the expected status"]
                WrongStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::SessionNotExists(_) => Error::SessionNotExists.into(),
            Self::Settlement(e) => return e.try_as_error(),
            Self::WrongStatus { .. } => Error::WrongStatus.into(),
        })
    }
}

impl AsError for command::settle_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SESSION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Session` with the provided ID does not exist"]
                SessionNotExists,

                #[code = "WRONG_SESSION_STATUS"]
                #[status = CONFLICT]
                #[message = "`Session` is not in the expected status"]
                WrongStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::SessionNotExists(_) => Error::SessionNotExists.into(),
            Self::UserNotExists(_) => return None,
            Self::WrongStatus { .. } => Error::WrongStatus.into(),
        })
    }
}

impl AsError for command::cancel_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SESSION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Session` with the provided ID does not exist"]
                SessionNotExists,

                #[code = "WRONG_SESSION_STATUS"]
                #[status = CONFLICT]
                #[message = "`Session` is not in the expected status"]
                WrongStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::SessionNotExists(_) => Error::SessionNotExists.into(),
            Self::UserNotExists(_) => return None,
            Self::WrongStatus { .. } => Error::WrongStatus.into(),
        })
    }
}

impl AsError for command::add_credits::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided ID does not exist"]
                UserNotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(Error::UserNotExists.into()),
        }
    }
}

impl AsError for command::deduct_credits::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INSUFFICIENT_CREDITS"]
                #[status = CONFLICT]
                #[message = "`User`'s balance doesn't cover the deduction"]
                InsufficientCredits,

                #[code = "USER_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided ID does not exist"]
                UserNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InsufficientCredits { .. } => {
                Error::InsufficientCredits.into()
            }
            Self::UserNotExists(_) => Error::UserNotExists.into(),
        })
    }
}
