//! [`Command`] definition.

pub mod add_credits;
pub mod cancel_session;
pub mod deduct_credits;
pub mod end_session;
pub mod schedule_session;
pub mod settle_session;
pub mod start_session;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_credits::AddCredits, cancel_session::CancelSession,
    deduct_credits::DeductCredits, end_session::EndSession,
    schedule_session::ScheduleSession, settle_session::SettleSession,
    start_session::StartSession,
};
