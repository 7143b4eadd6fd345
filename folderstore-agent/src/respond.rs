//! Protocol output.

use std::io::{self, Write};
use std::path::PathBuf;

use folderstore_common::api::{ErrorBody, InitResponse, TransferResponse};
use serde::Serialize;
use tracing::{debug, warn};

/// Writes one JSON message per line and flushes after each, so git-lfs sees
/// progress as it happens.
pub struct Responder<W> {
    out: W,
}

impl<W: Write> Responder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn send<T: Serialize>(&mut self, message: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    pub fn init(&mut self, error: Option<ErrorBody>) {
        if let Err(e) = self.send(&InitResponse { error }) {
            warn!(error = %e, "Unable to send init response");
        }
    }

    pub fn progress(&mut self, oid: &str, bytes_so_far: u64, bytes_since_last: u64) {
        if let Err(e) = self.send(&TransferResponse::progress(oid, bytes_so_far, bytes_since_last)) {
            warn!(oid = %oid, error = %e, "Unable to send progress message");
        }
    }

    pub fn complete(&mut self, oid: &str, path: Option<PathBuf>) {
        debug!(oid = %oid, "Transfer complete");
        if let Err(e) = self.send(&TransferResponse::complete(oid, path)) {
            warn!(oid = %oid, error = %e, "Unable to send completion message");
        }
    }

    pub fn transfer_error(&mut self, oid: &str, code: i32, message: impl Into<String>) {
        let message = message.into();
        warn!(oid = %oid, code, "{}", message);
        if let Err(e) = self.send(&TransferResponse::failed(oid, code, message)) {
            warn!(oid = %oid, error = %e, "Unable to send transfer error");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_message_per_line() {
        let mut responder = Responder::new(Vec::new());
        responder.init(None);
        responder.progress("abcd", 10, 10);
        responder.complete("abcd", Some(PathBuf::from("/repo/.git/lfs/tmp/abcd.tmp")));
        responder.transfer_error("ef01", 3, "Unable to retrieve \"ef01\": object not found");

        let out = String::from_utf8(responder.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "{}");
        assert_eq!(lines[1], r#"{"event":"progress","oid":"abcd","bytesSoFar":10,"bytesSinceLast":10}"#);
        assert_eq!(
            lines[2],
            r#"{"event":"complete","oid":"abcd","path":"/repo/.git/lfs/tmp/abcd.tmp"}"#
        );
        let failed: TransferResponse = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(
            failed,
            TransferResponse::failed("ef01", 3, "Unable to retrieve \"ef01\": object not found")
        );
    }

    #[test]
    fn test_init_error() {
        let mut responder = Responder::new(Vec::new());
        responder.init(Some(ErrorBody {
            code: 9,
            message: "Base directory not specified, check config".into(),
        }));
        let out = String::from_utf8(responder.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"error\":{\"code\":9,\"message\":\"Base directory not specified, check config\"}}\n"
        );
    }
}
