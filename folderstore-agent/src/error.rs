use std::io;
use std::path::PathBuf;

use folderstore_common::api::codes;
use folderstore_common::storage::AddressError;

/// Failure of a single storage location to accept an object.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("cannot create dir {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot remove existing temp file {path}: {source}")]
    RemoveTemp { path: PathBuf, source: io::Error },
    #[error("cannot read data from {path}: {source}")]
    OpenSource { path: PathBuf, source: io::Error },
    #[error("cannot open temp file for writing {path}: {source}")]
    OpenTemp { path: PathBuf, source: io::Error },
    #[error("error writing temp file {path}: {source}")]
    WriteTemp { path: PathBuf, source: io::Error },
    #[error("error moving temp file to final location {path}: {source}")]
    Rename { path: PathBuf, source: io::Error },
    #[error("error uploading {oid} via rclone: {source:#}")]
    Remote { oid: String, source: anyhow::Error },
    #[error("{0:#}")]
    Script(anyhow::Error),
}

impl StoreError {
    /// Protocol error code describing this failure.
    pub fn code(&self) -> i32 {
        match self {
            StoreError::Address(_) | StoreError::CreateDir { .. } => codes::CREATE_DIR,
            StoreError::RemoveTemp { .. } => codes::REMOVE_TEMP,
            StoreError::OpenSource { .. } => codes::OPEN_SOURCE,
            StoreError::OpenTemp { .. } => codes::OPEN_TEMP,
            StoreError::WriteTemp { .. } | StoreError::Rename { .. } => codes::WRITE_TEMP,
            StoreError::Remote { .. } | StoreError::Script(_) => codes::REMOTE_STORE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("invalid action header {0:?}")]
    Header(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http error: {0}")]
    Status(reqwest::StatusCode),
    #[error("cannot read {path}: {source}")]
    Source { path: PathBuf, source: io::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git: {0}")]
    Io(#[from] io::Error),
    #[error("git {args} failed: {stderr}")]
    Failed { args: String, stderr: String },
}
