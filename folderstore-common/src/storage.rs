//! Object addressing.
//!
//! Objects use the same two-level split as git-lfs's own object store:
//! `<base>/ab/cd/abcdef...`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("object id {0:?} is too short to address")]
    ShortOid(String),
    #[error("object id {0:?} is not a hex digest")]
    InvalidOid(String),
}

/// Reject object ids that are not plain hex digests. Anything else could
/// carry separators or `..` into the paths built from it.
pub fn validate_oid(oid: &str) -> Result<(), AddressError> {
    if oid.len() < 4 {
        return Err(AddressError::ShortOid(oid.to_string()));
    }
    if !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidOid(oid.to_string()));
    }
    Ok(())
}

/// First and second level shard directory names for an object.
pub fn shard(oid: &str) -> Result<(&str, &str), AddressError> {
    validate_oid(oid)?;
    match (oid.get(0..2), oid.get(2..4)) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(AddressError::ShortOid(oid.to_string())),
    }
}

/// Path of an object below a local base directory.
pub fn storage_path(base: &Path, oid: &str) -> Result<PathBuf, AddressError> {
    let (first, second) = shard(oid)?;
    Ok(base.join(first).join(second).join(oid))
}

/// Path of an object on an rclone remote. Remote paths always use `/`.
pub fn remote_path(base: &str, oid: &str) -> Result<String, AddressError> {
    let (first, second) = shard(oid)?;
    let base = base.trim_end_matches('/');
    if base.ends_with(':') {
        Ok(format!("{}{}/{}/{}", base, first, second, oid))
    } else {
        Ok(format!("{}/{}/{}/{}", base, first, second, oid))
    }
}

/// Directory that receives downloads before git-lfs moves them into place.
///
/// It lives inside the repository so the final rename never crosses a
/// filesystem boundary.
pub fn download_temp_dir(git_dir: &Path) -> PathBuf {
    git_dir.join("lfs").join("tmp")
}

pub fn download_temp_path(git_dir: &Path, oid: &str) -> Result<PathBuf, AddressError> {
    validate_oid(oid)?;
    Ok(download_temp_dir(git_dir).join(format!("{}.tmp", oid)))
}

/// Append `.<suffix>` to the full file name (`abc` -> `abc.zip`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
