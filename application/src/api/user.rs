//! [`User`]-related definitions.

use common::{credits, DateTime};
use derive_more::{AsRef, Display, From, Into};
use futures::{future, TryFutureExt as _};
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// A [`User`] of the platform.
#[derive(Clone, Debug, From)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`domain::User`] representing this [`User`].
    user: OnceCell<domain::User>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id.into(),
            user: OnceCell::new_with(Some(user)),
        }
    }
}

impl User {
    /// Creates a new [`User`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`User`] with the provided ID exists,
    /// otherwise accessing this [`User`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            user: OnceCell::new(),
        }
    }

    /// Returns the [`domain::User`] representing this [`User`].
    ///
    /// # Errors
    ///
    /// Error if the [`domain::User`] doesn't exist.
    async fn user(&self, ctx: &Context) -> Result<&domain::User, Error> {
        let id = self.id.into();
        self.user
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::user::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|u| {
                        future::ready(u.ok_or_else(|| {
                            api::query::UserError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A `User` of the platform.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.user(ctx).await?.name.clone().into())
    }

    /// Current credit balance of this `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.balance",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn balance(
        &self,
        ctx: &Context,
    ) -> Result<credits::Balance, Error> {
        Ok(self.user(ctx).await?.balance)
    }

    /// Reputation points this `User` earned for teaching.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.skillPoints",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn skill_points(&self, ctx: &Context) -> Result<i32, Error> {
        i32::try_from(i64::from(self.user(ctx).await?.skill_points))
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Number of `Session`s this `User` has taught to completion.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.sessionsTaught",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sessions_taught(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(self.user(ctx).await?.sessions_taught.into())
    }

    /// Number of `Session`s this `User` has completed as a student.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.sessionsCompleted",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sessions_completed(
        &self,
        ctx: &Context,
    ) -> Result<i32, Error> {
        Ok(self.user(ctx).await?.sessions_completed.into())
    }

    /// `DateTime` when this `User` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.user(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Name of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserName",
    with = scalar::Via::<domain::user::Name>,
)]
pub struct Name(domain::user::Name);
