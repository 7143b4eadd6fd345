//! HTTP fallback through the `action` attached to a transfer request.
//!
//! The LFS server hands out a pre-authorised href plus headers for each
//! object. Downloads use it when no location holds the object; uploads
//! mirror the object to it before the locations are written.

use std::io;
use std::path::Path;

use anyhow::Context;
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::Body;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;

use folderstore_common::api::Action;

use crate::copy::{self, ProgressFn};
use crate::error::ActionError;

/// HTTP client for action hrefs.
#[derive(Clone, Default)]
pub struct ActionClient {
    client: reqwest::Client,
}

impl ActionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// GET the action href and stream the body into `dest`. A zero `size` is
    /// replaced with the response's Content-Length.
    pub async fn download(
        &self,
        action: &Action,
        size: u64,
        dest: &Path,
        progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(&action.href)
            .headers(header_map(action)?)
            .send()
            .await
            .context("action download request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ActionError::Status(status).into());
        }

        let total = match (size, resp.content_length()) {
            (0, Some(len)) => len,
            _ => size,
        };
        let mut body = StreamReader::new(Box::pin(resp.bytes_stream().map_err(io::Error::other)));
        copy::stream_to_file(&mut body, total, dest, progress).await?;
        debug!(href = %action.href, bytes = total, "Action download complete");
        Ok(())
    }

    /// PUT the file at `from` to the action href with an explicit
    /// Content-Length.
    pub async fn upload(&self, action: &Action, from: &Path, size: u64) -> Result<(), ActionError> {
        let file = tokio::fs::File::open(from)
            .await
            .map_err(|source| ActionError::Source { path: from.to_path_buf(), source })?;

        let resp = self
            .client
            .put(&action.href)
            .headers(header_map(action)?)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ActionError::Status(status));
        }
        debug!(href = %action.href, bytes = size, "Action upload complete");
        Ok(())
    }
}

fn header_map(action: &Action) -> Result<HeaderMap, ActionError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &action.header {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ActionError::Header(name.clone()))?;
        let value = HeaderValue::from_str(value).map_err(|_| ActionError::Header(name.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::CopyProgress;
    use httpmock::prelude::*;
    use std::collections::BTreeMap;

    fn action(href: String) -> Action {
        let mut header = BTreeMap::new();
        header.insert("Authorization".to_string(), "Bearer token-1".to_string());
        Action { href, header }
    }

    #[tokio::test]
    async fn test_download_uses_headers_and_content_length() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/objects/abcd").header("Authorization", "Bearer token-1");
                then.status(200).body("downloaded body");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abcd.tmp");
        let mut totals = Vec::new();
        ActionClient::new()
            .download(&action(server.url("/objects/abcd")), 0, &dest, &mut |p: CopyProgress| {
                totals.push(p.total)
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(&dest).unwrap(), b"downloaded body");
        assert_eq!(totals, vec![15]);
    }

    #[tokio::test]
    async fn test_download_rejects_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/objects/abcd");
                then.status(404);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("abcd.tmp");
        let err = ActionClient::new()
            .download(&action(server.url("/objects/abcd")), 10, &dest, &mut |_: CopyProgress| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_upload_sends_body_with_length() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/objects/abcd")
                    .header("Authorization", "Bearer token-1")
                    .header("content-length", "11")
                    .body("upload body");
                then.status(200);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("payload");
        std::fs::write(&from, b"upload body").unwrap();
        ActionClient::new()
            .upload(&action(server.url("/objects/abcd")), &from, 11)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/objects/abcd");
                then.status(500);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("payload");
        std::fs::write(&from, b"x").unwrap();
        let err = ActionClient::new()
            .upload(&action(server.url("/objects/abcd")), &from, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Status(s) if s.as_u16() == 500));
    }

    #[test]
    fn test_invalid_header_name() {
        let mut bad = action("http://localhost/".into());
        bad.header.insert("bad header".into(), "v".into());
        assert!(matches!(header_map(&bad), Err(ActionError::Header(_))));
    }
}
