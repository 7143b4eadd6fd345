//! git-lfs custom transfer protocol messages.
//!
//! Every message is a single JSON object on its own line. Requests arrive on
//! stdin, responses are written to stdout.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Error codes reported in `error.code` of a response.
pub mod codes {
    /// No location could supply the requested object.
    pub const RETRIEVE_FAILED: i32 = 3;
    /// `init` received without a configured base directory.
    pub const NO_BASE_DIR: i32 = 9;
    /// The upload source file could not be stat'ed.
    pub const STAT_SOURCE: i32 = 13;
    pub const CREATE_DIR: i32 = 14;
    pub const REMOVE_TEMP: i32 = 15;
    pub const OPEN_SOURCE: i32 = 16;
    pub const OPEN_TEMP: i32 = 17;
    pub const WRITE_TEMP: i32 = 18;
    /// An rclone remote or a store script rejected the object.
    pub const REMOTE_STORE: i32 = 19;
    /// Every configured location failed to accept the object.
    pub const STORE_FAILED: i32 = 20;
    /// The HTTP action provided by git-lfs rejected the upload.
    pub const ACTION_UPLOAD: i32 = 21;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Init,
    Download,
    Upload,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Upload,
    Download,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Upload => "upload",
            Operation::Download => "download",
        })
    }
}

/// HTTP transfer supplied by git-lfs alongside each object, usable as a
/// fallback for the configured locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub header: BTreeMap<String, String>,
}

/// A single request line.
///
/// `init` carries `operation`, `remote` and the concurrency hints; transfer
/// events carry `oid`, `size`, `path` (uploads) and `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub event: Event,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub oid: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default)]
    pub concurrent: bool,
    #[serde(default, rename = "concurrenttransfers", skip_serializing_if = "Option::is_none")]
    pub concurrent_transfers: Option<u32>,
}

impl Request {
    fn new(event: Event) -> Self {
        Self {
            event,
            oid: String::new(),
            size: 0,
            path: None,
            action: None,
            operation: None,
            remote: None,
            concurrent: false,
            concurrent_transfers: None,
        }
    }

    pub fn init(operation: Operation) -> Self {
        Self {
            operation: Some(operation),
            ..Self::new(Event::Init)
        }
    }

    pub fn download(oid: impl Into<String>, size: u64) -> Self {
        Self {
            oid: oid.into(),
            size,
            ..Self::new(Event::Download)
        }
    }

    pub fn upload(oid: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            oid: oid.into(),
            size,
            path: Some(path.into()),
            ..Self::new(Event::Upload)
        }
    }

    pub fn terminate() -> Self {
        Self::new(Event::Terminate)
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

/// Reply to `init`: `{}` on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Per-object response. A failed transfer is a `complete` event carrying an
/// `error` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TransferResponse {
    Progress {
        oid: String,
        #[serde(rename = "bytesSoFar")]
        bytes_so_far: u64,
        #[serde(rename = "bytesSinceLast")]
        bytes_since_last: u64,
    },
    Complete {
        oid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
}

impl TransferResponse {
    pub fn progress(oid: &str, bytes_so_far: u64, bytes_since_last: u64) -> Self {
        Self::Progress {
            oid: oid.to_string(),
            bytes_so_far,
            bytes_since_last,
        }
    }

    pub fn complete(oid: &str, path: Option<PathBuf>) -> Self {
        Self::Complete {
            oid: oid.to_string(),
            path,
            error: None,
        }
    }

    pub fn failed(oid: &str, code: i32, message: impl Into<String>) -> Self {
        Self::Complete {
            oid: oid.to_string(),
            path: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn oid(&self) -> &str {
        match self {
            Self::Progress { oid, .. } | Self::Complete { oid, .. } => oid,
        }
    }
}
