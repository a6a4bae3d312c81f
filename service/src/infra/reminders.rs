//! Reminder dispatch contract.

use async_trait::async_trait;
use derive_more::{Display, Error as StdError};
use tracing as log;

use crate::domain::Session;

/// Dispatcher of [`Session`] reminders to its participants.
///
/// Dispatch is best-effort: callers fire it after commit and only log
/// failures.
#[async_trait]
pub trait Reminders: Send + Sync {
    /// Notifies both participants about a newly scheduled [`Session`].
    ///
    /// # Errors
    ///
    /// If the reminder cannot be dispatched.
    async fn session_scheduled(&self, session: &Session) -> Result<(), Error>;

    /// Notifies both participants about a cancelled [`Session`].
    ///
    /// # Errors
    ///
    /// If the notification cannot be dispatched.
    async fn session_cancelled(&self, session: &Session) -> Result<(), Error>;
}

/// Error of a [`Reminders`] operation.
#[derive(Debug, Display, StdError)]
#[display("`Reminders` operation failed: {_0}")]
pub struct Error(#[error(not(source))] pub String);

/// [`Reminders`] implementation only logging the dispatched reminders.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnly;

#[async_trait]
impl Reminders for LogOnly {
    async fn session_scheduled(&self, session: &Session) -> Result<(), Error> {
        log::info!(
            session_id = %session.id,
            teacher_id = %session.teacher_id,
            student_id = %session.student_id,
            scheduled_start = ?session.scheduled_start,
            "`Session` scheduled",
        );
        Ok(())
    }

    async fn session_cancelled(&self, session: &Session) -> Result<(), Error> {
        log::info!(
            session_id = %session.id,
            teacher_id = %session.teacher_id,
            student_id = %session.student_id,
            "`Session` cancelled",
        );
        Ok(())
    }
}
