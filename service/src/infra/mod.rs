//! Infrastructure layer.

pub mod database;
pub mod reminders;
pub mod video;

pub use self::database::{Database, InMemory};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
pub use self::{reminders::Reminders, video::VideoRooms};
