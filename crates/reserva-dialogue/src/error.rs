//! Error types for the dialogue engine.

use reserva_core::error::ReservaError;
use uuid::Uuid;

/// Errors from the dialogue engine and booking finalizer.
///
/// Note that [`transition`] itself never returns these: unrecognized input
/// is absorbed by the fallback rule. They arise only from the explicit
/// booking paths.
///
/// [`transition`]: crate::engine::DialogueEngine::transition
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("missing selection: {0}")]
    MissingSelection(&'static str),
    #[error("conversation already completed")]
    AlreadyCompleted,
    #[error("booking error: {0}")]
    Booking(String),
}

impl From<DialogueError> for ReservaError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::SessionNotFound(_) => ReservaError::Session(err.to_string()),
            DialogueError::MissingSelection(_) | DialogueError::AlreadyCompleted => {
                ReservaError::Booking(err.to_string())
            }
            DialogueError::Booking(msg) => ReservaError::Booking(msg),
        }
    }
}
