pub mod directory;
pub mod remote;
pub mod script;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use folderstore_common::location::Location;

use crate::copy::ProgressFn;
use crate::error::StoreError;

use self::directory::DirectoryAdapter;
use self::remote::RemoteAdapter;
use self::script::ScriptAdapter;

/// How a location satisfied a store request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Written,
    /// An object of the same size was already present; nothing was written.
    AlreadyPresent,
}

/// Trait implemented by every kind of storage location.
///
/// An adapter moves one object's bytes and reports progress through the
/// callback it is handed. It never writes protocol messages itself: the
/// engine decides which location's result becomes the terminal response.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Fetch `oid` into `dest`, a private temp file inside the repository.
    async fn retrieve(
        &self,
        oid: &str,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()>;

    /// Store the file at `source`, `size` bytes long, under `oid`.
    async fn store(
        &self,
        oid: &str,
        source: &Path,
        size: u64,
        progress: &mut ProgressFn<'_>,
    ) -> Result<Stored, StoreError>;
}

/// Construct the adapter for a parsed location. `rclone` is the program used
/// for remote locations.
pub fn from_location(location: &Location, rclone: &Path) -> Box<dyn BackendAdapter> {
    match location {
        Location::Directory(path) => Box::new(DirectoryAdapter::new(path)),
        Location::Remote(base) => Box::new(RemoteAdapter::new(base, PathBuf::from(rclone))),
        Location::Script(command) => Box::new(ScriptAdapter::new(command)),
    }
}
