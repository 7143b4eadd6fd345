//! Storage location descriptors.
//!
//! A location string is a `;`-separated list tried left to right:
//!
//! - `|<command>` runs a shell command that moves the object itself
//! - anything containing `:` (other than a Windows drive letter) is an
//!   rclone remote such as `gdrive:lfs`
//! - everything else is a local or mounted directory

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Directory(PathBuf),
    Remote(String),
    Script(String),
}

impl Location {
    /// Classify one trimmed, non-empty segment of a location string.
    pub fn classify(segment: &str) -> Self {
        if let Some(command) = segment.strip_prefix('|') {
            Location::Script(command.trim().to_string())
        } else if is_remote_path(segment) {
            Location::Remote(segment.to_string())
        } else {
            Location::Directory(PathBuf::from(segment))
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Directory(path) => write!(f, "{}", path.display()),
            Location::Remote(remote) => write!(f, "{}", remote),
            Location::Script(command) => write!(f, "|{}", command),
        }
    }
}

/// Split a configured location string into descriptors, dropping empty
/// segments.
pub fn parse_locations(spec: &str) -> Vec<Location> {
    spec.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(Location::classify)
        .collect()
}

/// True if `path` names an rclone remote. A colon in second position is a
/// drive letter on Windows hosts.
pub fn is_remote_path(path: &str) -> bool {
    if cfg!(windows) && is_drive_prefixed(path) {
        return false;
    }
    path.contains(':')
}

fn is_drive_prefixed(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
