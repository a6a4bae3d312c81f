//! GraphQL API definitions.

mod mutation;
mod query;
pub mod scalar;
pub mod session;
pub mod transaction;
pub mod user;

use juniper::EmptySubscription;

use crate::Context;

pub use self::{
    mutation::Mutation,
    query::Query,
    session::Session,
    transaction::Transaction,
    user::User,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;
