//! [`Transaction`]-related definitions.

use common::{credits, DateTime};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// A single entry of a `User`'s credit ledger.
#[derive(Clone, Debug, From, Into)]
pub struct Transaction(domain::Transaction);

/// A single entry of a `User`'s credit ledger.
#[graphql_object(context = Context)]
impl Transaction {
    /// Unique identifier of this `Transaction`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `User` whose balance this `Transaction` moved.
    #[must_use]
    pub fn user(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Transaction` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.user_id)
        }
    }

    /// Signed balance change carried by this `Transaction`.
    #[must_use]
    pub fn amount(&self) -> credits::Delta {
        self.0.amount
    }

    /// Kind of this `Transaction`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Human-readable description of this `Transaction`.
    #[must_use]
    pub fn description(&self) -> Option<Description> {
        self.0.description.clone().map(Into::into)
    }

    /// Identifier of the `Session` this `Transaction` belongs to, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<api::session::Id> {
        self.0.session_id.map(Into::into)
    }

    /// `DateTime` when this `Transaction` was recorded.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Transaction`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::transaction::Id)]
#[into(domain::transaction::Id)]
#[graphql(name = "TransactionId", transparent)]
pub struct Id(Uuid);

/// Kind of a `Transaction`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "TransactionKind")]
pub enum Kind {
    /// Credits earned by teaching or as a completion bonus.
    Earned,

    /// Credits spent on booking a `Session`.
    Spent,

    /// Credits purchased or granted from outside the platform.
    Purchased,

    /// Credits refunded for a cancelled `Session`.
    Refunded,
}

impl From<domain::transaction::Kind> for Kind {
    fn from(kind: domain::transaction::Kind) -> Self {
        use domain::transaction::Kind as K;

        match kind {
            K::Earned => Self::Earned,
            K::Spent => Self::Spent,
            K::Purchased => Self::Purchased,
            K::Refunded => Self::Refunded,
        }
    }
}

/// Human-readable description of a `Transaction`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "TransactionDescription",
    with = scalar::Via::<domain::transaction::Description>,
)]
pub struct Description(domain::transaction::Description);
