//! Types shared by the lfs-folderstore transfer agent: the git-lfs custom
//! transfer wire protocol, storage location descriptors and object
//! addressing.

pub mod api;
pub mod location;
pub mod storage;
