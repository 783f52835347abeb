use super::model::SessionState;
use crate::commit::CommitError;
use crate::store::StoreError;
use thiserror::Error;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{message}")]
    PreconditionFailed { message: &'static str },
    #[error("transform session already ended in state {state:?}")]
    SessionEnded { state: SessionState },
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error("failed to read content bounds: {0}")]
    Store(#[from] StoreError),
}
