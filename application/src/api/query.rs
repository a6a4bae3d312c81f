//! GraphQL [`Query`]s definitions.

use common::{credits, DateTime};
use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "user",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the current credit balance of the `User` with the specified
    /// ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            user_id = %user_id,
            gql.name = "balance",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn balance(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<credits::Balance, Error> {
        ctx.service()
            .execute(query::user::Balance {
                user_id: user_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Returns the `Session` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SESSION_NOT_EXISTS` - the `Session` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "session",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn session(
        id: api::session::Id,
        ctx: &Context,
    ) -> Result<api::Session, Error> {
        ctx.service()
            .execute(query::session::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| SessionError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the upcoming `Session`s of the `User` with the specified ID,
    /// ascending by their scheduled start.
    #[tracing::instrument(
        skip_all,
        fields(
            user_id = %user_id,
            gql.name = "upcomingSessions",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn upcoming_sessions(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Session>, Error> {
        ctx.service()
            .execute(query::session::Upcoming::by(read::session::Upcoming {
                user_id: user_id.into(),
                after: DateTime::now().coerce(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|sessions| sessions.into_iter().map(Into::into).collect())
    }

    /// Returns the finished `Session`s of the `User` with the specified ID,
    /// newest first.
    #[tracing::instrument(
        skip_all,
        fields(
            user_id = %user_id,
            gql.name = "sessionHistory",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn session_history(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<Vec<api::Session>, Error> {
        ctx.service()
            .execute(query::session::History::by(read::session::History {
                user_id: user_id.into(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|sessions| sessions.into_iter().map(Into::into).collect())
    }

    /// Returns the active `Session`s of the `User` with the specified ID
    /// whose scheduled window overlaps the provided `[start, end)` window.
    ///
    /// An empty result means the window is bookable for that `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            end = ?end,
            gql.name = "conflictingSessions",
            otel.name = Self::SPAN_NAME,
            start = ?start,
            user_id = %user_id,
        ),
    )]
    pub async fn conflicting_sessions(
        user_id: api::user::Id,
        start: DateTime,
        end: DateTime,
        exclude: Option<api::session::Id>,
        ctx: &Context,
    ) -> Result<Vec<api::Session>, Error> {
        ctx.service()
            .execute(query::session::Conflicts::by(
                read::session::Overlapping {
                    user_id: user_id.into(),
                    start: start.coerce(),
                    end: end.coerce(),
                    exclude: exclude.map(Into::into),
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|sessions| sessions.into_iter().map(Into::into).collect())
    }

    /// Returns the ledger `Transaction`s of the `User` with the specified
    /// ID, newest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "transactions",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn transactions(
        user_id: api::user::Id,
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<Vec<api::Transaction>, Error> {
        let limit = limit
            .map(TryInto::try_into)
            .transpose()
            .map_err(AsError::into_error)?;

        ctx.service()
            .execute(query::transaction::History::by(
                read::transaction::History {
                    user_id: user_id.into(),
                    limit,
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|transactions| {
                transactions.into_iter().map(Into::into).collect()
            })
    }
}

impl AsError for query::user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

define_error! {
    enum SessionError {
        #[code = "SESSION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Session` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
