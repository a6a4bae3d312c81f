//! Domain entities definitions.

pub mod matching;
pub mod session;
pub mod skill;
pub mod transaction;
pub mod user;

pub use self::{
    matching::Match, session::Session, transaction::Transaction, user::User,
};
