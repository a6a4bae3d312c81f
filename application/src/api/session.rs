//! [`Session`]-related definitions.

use common::{credits, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{command, domain, query, Query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A scheduled skill-exchange appointment between two `User`s.
#[derive(Clone, Debug, From)]
pub struct Session {
    /// ID of this [`Session`].
    pub id: Id,

    /// [`domain::Session`] representing this [`Session`].
    session: OnceCell<domain::Session>,
}

impl From<domain::Session> for Session {
    fn from(session: domain::Session) -> Self {
        Self {
            id: session.id.into(),
            session: OnceCell::new_with(Some(session)),
        }
    }
}

impl Session {
    /// Creates a new [`Session`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Session`] with the provided ID exists,
    /// otherwise accessing this [`Session`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            session: OnceCell::new(),
        }
    }

    /// Returns the [`domain::Session`] representing this [`Session`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::Session`] doesn't exist.
    async fn session(&self, ctx: &Context) -> Result<&domain::Session, Error> {
        let id = self.id.into();
        self.session
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::session::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|s| {
                        future::ready(s.ok_or_else(|| {
                            api::query::SessionError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A scheduled skill-exchange appointment between two `User`s.
#[graphql_object(context = Context)]
impl Session {
    /// Unique identifier of this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Identifier of the accepted `Match` this `Session` was booked against.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.matchId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn match_id(&self, ctx: &Context) -> Result<MatchId, Error> {
        Ok(self.session(ctx).await?.match_id.into())
    }

    /// Teaching `User` of this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.teacher",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn teacher(&self, ctx: &Context) -> Result<api::User, Error> {
        let id = self.session(ctx).await?.teacher_id;
        #[expect(
            unsafe_code,
            reason = "`Session` loaded from repository guarantees `User` \
                      existence"
        )]
        Ok(unsafe { api::User::new_unchecked(id) })
    }

    /// Learning `User` of this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.student",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn student(&self, ctx: &Context) -> Result<api::User, Error> {
        let id = self.session(ctx).await?.student_id;
        #[expect(
            unsafe_code,
            reason = "`Session` loaded from repository guarantees `User` \
                      existence"
        )]
        Ok(unsafe { api::User::new_unchecked(id) })
    }

    /// Identifier of the skill exchanged in this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.skillId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn skill_id(&self, ctx: &Context) -> Result<SkillId, Error> {
        Ok(self.session(ctx).await?.skill_id.into())
    }

    /// `DateTime` when this `Session` is scheduled to start.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.scheduledStart",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn scheduled_start(
        &self,
        ctx: &Context,
    ) -> Result<DateTime, Error> {
        Ok(self.session(ctx).await?.scheduled_start.coerce())
    }

    /// `DateTime` when this `Session` is scheduled to end.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.scheduledEnd",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn scheduled_end(
        &self,
        ctx: &Context,
    ) -> Result<DateTime, Error> {
        Ok(self.session(ctx).await?.scheduled_end.coerce())
    }

    /// `DateTime` when this `Session` actually started.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.actualStart",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn actual_start(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self.session(ctx).await?.actual_start.map(DateTimeOf::coerce))
    }

    /// `DateTime` when this `Session` actually ended.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.actualEnd",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn actual_end(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self.session(ctx).await?.actual_end.map(DateTimeOf::coerce))
    }

    /// Current status of this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.status",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn status(&self, ctx: &Context) -> Result<Status, Error> {
        Ok(self.session(ctx).await?.status.into())
    }

    /// Credits escrowed from the student for this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.credits",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn credits(
        &self,
        ctx: &Context,
    ) -> Result<credits::Amount, Error> {
        Ok(self.session(ctx).await?.credits)
    }

    /// Identifier of the video room allocated for this `Session`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.videoRoom",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn video_room(
        &self,
        ctx: &Context,
    ) -> Result<Option<RoomId>, Error> {
        Ok(self.session(ctx).await?.video_room.clone().map(Into::into))
    }

    /// Free-text notes of this `Session`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.notes",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn notes(&self, ctx: &Context) -> Result<Option<Notes>, Error> {
        Ok(self.session(ctx).await?.notes.clone().map(Into::into))
    }

    /// `DateTime` when this `Session` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.session(ctx).await?.created_at.coerce())
    }

    /// `DateTime` when the escrow of this `Session` was settled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Session.settledAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn settled_at(
        &self,
        ctx: &Context,
    ) -> Result<Option<DateTime>, Error> {
        Ok(self.session(ctx).await?.settled_at.map(DateTimeOf::coerce))
    }
}

/// Unique identifier of a `Session`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::session::Id)]
#[into(domain::session::Id)]
#[graphql(name = "SessionId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a `Match`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::matching::Id)]
#[into(domain::matching::Id)]
#[graphql(name = "MatchId", transparent)]
pub struct MatchId(Uuid);

/// Unique identifier of a skill.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::skill::Id)]
#[into(domain::skill::Id)]
#[graphql(name = "SkillId", transparent)]
pub struct SkillId(Uuid);

/// Status of a `Session` lifecycle.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "SessionStatus")]
pub enum Status {
    /// `Session` is booked and its escrow is held.
    Scheduled,

    /// `Session` is currently running.
    InProgress,

    /// `Session` finished and its escrow is paid out.
    Completed,

    /// `Session` was cancelled before starting.
    Cancelled,
}

impl From<domain::session::Status> for Status {
    fn from(status: domain::session::Status) -> Self {
        use domain::session::Status as S;

        match status {
            S::Scheduled => Self::Scheduled,
            S::InProgress => Self::InProgress,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
        }
    }
}

/// Identifier of a video room allocated for a `Session`.
#[derive(Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "VideoRoomId", transparent)]
pub struct RoomId(String);

impl From<domain::session::RoomId> for RoomId {
    fn from(id: domain::session::RoomId) -> Self {
        Self(id.into())
    }
}

/// Token granting a `User` access to the video room of a `Session`.
#[derive(Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "VideoAccessToken", transparent)]
pub struct AccessToken(String);

impl From<domain::session::AccessToken> for AccessToken {
    fn from(token: domain::session::AccessToken) -> Self {
        Self(token.into())
    }
}

/// Free-text notes of a `Session`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SessionNotes",
    with = scalar::Via::<domain::session::Notes>,
)]
pub struct Notes(domain::session::Notes);

/// Result of starting a `Session`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "StartSessionResult")]
pub struct StartResult {
    /// The started `Session`.
    pub session: Session,

    /// Video room access token of the teacher.
    pub teacher_token: AccessToken,

    /// Video room access token of the student.
    pub student_token: AccessToken,
}

impl From<command::start_session::Output> for StartResult {
    fn from(output: command::start_session::Output) -> Self {
        let command::start_session::Output {
            session,
            teacher_token,
            student_token,
        } = output;
        Self {
            session: session.into(),
            teacher_token: teacher_token.into(),
            student_token: student_token.into(),
        }
    }
}
