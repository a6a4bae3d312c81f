//! Video room provider contract.

use async_trait::async_trait;
use derive_more::{Display, Error as StdError};
use uuid::Uuid;

use crate::domain::{session, user};
#[cfg(doc)]
use crate::domain::Session;

/// Provider of video rooms for [`Session`]s.
#[async_trait]
pub trait VideoRooms: Send + Sync {
    /// Allocates a video room for the provided [`Session`].
    ///
    /// # Errors
    ///
    /// If the room cannot be allocated.
    async fn create_room(
        &self,
        session_id: session::Id,
    ) -> Result<session::RoomId, Error>;

    /// Issues an [`session::AccessToken`] for the provided [`User`] to join
    /// the provided room.
    ///
    /// # Errors
    ///
    /// If the token cannot be issued.
    ///
    /// [`User`]: crate::domain::User
    async fn issue_token(
        &self,
        room: &session::RoomId,
        user_id: user::Id,
    ) -> Result<session::AccessToken, Error>;
}

/// Error of a [`VideoRooms`] operation.
#[derive(Debug, Display, StdError)]
#[display("`VideoRooms` operation failed: {_0}")]
pub struct Error(#[error(not(source))] pub String);

/// [`VideoRooms`] implementation allocating rooms locally, without any
/// external provider.
///
/// Rooms are derived from [`Session`] IDs, tokens are one-off UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Local;

#[async_trait]
impl VideoRooms for Local {
    async fn create_room(
        &self,
        session_id: session::Id,
    ) -> Result<session::RoomId, Error> {
        Ok(session::RoomId::from(format!("room-{session_id}")))
    }

    async fn issue_token(
        &self,
        room: &session::RoomId,
        user_id: user::Id,
    ) -> Result<session::AccessToken, Error> {
        Ok(session::AccessToken::from(format!(
            "{room}:{user_id}:{}",
            Uuid::new_v4(),
        )))
    }
}
