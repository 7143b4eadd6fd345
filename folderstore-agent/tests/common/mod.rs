//! Shared fixtures for the protocol-level tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use folderstore_agent::config::TransferConfig;
use folderstore_agent::engine::TransferEngine;
use folderstore_agent::service;
use folderstore_common::api::{ErrorBody, InitResponse, Request, TransferResponse};

const PRIMES: [u8; 55] = [
    1, 2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

#[derive(Debug, Clone)]
pub struct TestFile {
    pub oid: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Write `size` bytes of a repeating prime pattern to `path` and return the
/// file's OID.
pub fn create_test_file(path: &Path, size: usize) -> TestFile {
    let data: Vec<u8> = PRIMES.iter().copied().cycle().take(size).collect();
    std::fs::write(path, &data).unwrap();
    TestFile {
        oid: sha256_hex(&data),
        size: size as u64,
        path: path.to_path_buf(),
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn file_hash(path: &Path) -> String {
    sha256_hex(&std::fs::read(path).unwrap())
}

pub fn object_path(base: &Path, oid: &str) -> PathBuf {
    base.join(&oid[0..2]).join(&oid[2..4]).join(oid)
}

/// Place `file` into `base` in its plain sharded form.
pub fn place_plain(base: &Path, file: &TestFile) -> PathBuf {
    let dest = object_path(base, &file.oid);
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::copy(&file.path, &dest).unwrap();
    dest
}

/// Place `file` into `base` as a single-entry `<oid>.zip`.
pub fn place_zip(base: &Path, file: &TestFile) -> PathBuf {
    let dest = with_ext(&object_path(base, &file.oid), "zip");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&dest).unwrap());
    writer
        .start_file(file.oid.as_str(), zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(&std::fs::read(&file.path).unwrap()).unwrap();
    writer.finish().unwrap();
    dest
}

/// Place `file` into `base` as an LZ4 frame `<oid>.lz4`.
pub fn place_lz4(base: &Path, file: &TestFile) -> PathBuf {
    let dest = with_ext(&object_path(base, &file.oid), "lz4");
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    let mut encoder = lz4_flex::frame::FrameEncoder::new(std::fs::File::create(&dest).unwrap());
    encoder.write_all(&std::fs::read(&file.path).unwrap()).unwrap();
    encoder.finish().unwrap();
    dest
}

fn with_ext(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// One line of agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Init(InitResponse),
    Transfer(TransferResponse),
}

pub struct Session {
    pub replies: Vec<Reply>,
}

impl Session {
    pub fn transfers(&self) -> Vec<&TransferResponse> {
        self.replies
            .iter()
            .filter_map(|reply| match reply {
                Reply::Transfer(t) => Some(t),
                Reply::Init(_) => None,
            })
            .collect()
    }

    pub fn for_oid(&self, oid: &str) -> Vec<&TransferResponse> {
        self.transfers().into_iter().filter(|t| t.oid() == oid).collect()
    }

    /// The terminal message for `oid`. Panics unless there is exactly one.
    pub fn terminal(&self, oid: &str) -> &TransferResponse {
        let terminals: Vec<_> = self
            .for_oid(oid)
            .into_iter()
            .filter(|t| matches!(t, TransferResponse::Complete { .. }))
            .collect();
        assert_eq!(terminals.len(), 1, "expected one terminal message for {oid}");
        terminals[0]
    }

    pub fn error(&self, oid: &str) -> Option<&ErrorBody> {
        match self.terminal(oid) {
            TransferResponse::Complete { error, .. } => error.as_ref(),
            TransferResponse::Progress { .. } => None,
        }
    }

    pub fn completed_path(&self, oid: &str) -> Option<&Path> {
        match self.terminal(oid) {
            TransferResponse::Complete { path, error: None, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// `(bytesSoFar, bytesSinceLast)` of every progress message for `oid`.
    pub fn progress(&self, oid: &str) -> Vec<(u64, u64)> {
        self.for_oid(oid)
            .into_iter()
            .filter_map(|t| match t {
                TransferResponse::Progress { bytes_so_far, bytes_since_last, .. } => {
                    Some((*bytes_so_far, *bytes_since_last))
                }
                TransferResponse::Complete { .. } => None,
            })
            .collect()
    }
}

pub fn encode(requests: &[Request]) -> Vec<u8> {
    let mut input = Vec::new();
    for request in requests {
        serde_json::to_writer(&mut input, request).unwrap();
        input.push(b'\n');
    }
    input
}

/// Run a whole session over raw input bytes.
pub async fn run_raw(config: TransferConfig, git_dir: &Path, input: &[u8]) -> Session {
    let engine = TransferEngine::new(config, git_dir);
    let mut output = Vec::new();
    service::serve(&engine, input, &mut output).await.unwrap();

    let text = String::from_utf8(output).unwrap();
    let replies = text
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            if value.get("event").is_some() {
                Reply::Transfer(serde_json::from_value(value).unwrap())
            } else {
                Reply::Init(serde_json::from_value(value).unwrap())
            }
        })
        .collect();
    Session { replies }
}

pub async fn run_session(config: TransferConfig, git_dir: &Path, requests: &[Request]) -> Session {
    run_raw(config, git_dir, &encode(requests)).await
}

pub fn location(path: &Path) -> String {
    path.display().to_string()
}
