use std::path::PathBuf;

use crate::commit::CommitError;
use crate::state::SessionError;
use crate::store::StoreError;
use crate::tools::ToolKind;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{kind} parameters do not describe an invertible transform")]
    DegenerateParameters { kind: ToolKind },
}
