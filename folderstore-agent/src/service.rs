//! Request loop for the custom transfer protocol.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use folderstore_common::api::{codes, ErrorBody, Event, Request};

use crate::engine::TransferEngine;
use crate::respond::Responder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    AwaitingInit,
    Ready,
    Terminated,
}

/// Read requests from `input` until `terminate` or end of input, writing
/// responses to `output`. Requests are handled strictly one at a time: the
/// next line is not read until the current object's terminal message has
/// been written.
pub async fn serve<R, W>(engine: &TransferEngine, mut input: R, output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    let mut out = Responder::new(output);
    let mut state = SessionState::AwaitingInit;
    let mut line = Vec::new();

    while state != SessionState::Terminated {
        line.clear();
        let n = input
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read request")?;
        if n == 0 {
            debug!("End of input");
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let request: Request = match serde_json::from_slice(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Unable to parse request: {}", String::from_utf8_lossy(&line).trim_end());
                continue;
            }
        };

        if state == SessionState::AwaitingInit && request.event != Event::Init {
            warn!(event = ?request.event, "Request received before init");
        }

        state = dispatch(engine, request, &mut out).await;
    }
    Ok(())
}

async fn dispatch<W: Write + Send>(
    engine: &TransferEngine,
    request: Request,
    out: &mut Responder<W>,
) -> SessionState {
    match request.event {
        Event::Init => {
            debug!(
                operation = ?request.operation,
                remote = ?request.remote,
                concurrent = request.concurrent,
                concurrent_transfers = ?request.concurrent_transfers,
                "Init request"
            );
            if engine.config().has_pull_location() {
                match request.operation {
                    Some(op) => info!("Initialised lfs-folderstore custom adapter for {}", op),
                    None => info!("Initialised lfs-folderstore custom adapter"),
                }
                out.init(None);
            } else {
                out.init(Some(ErrorBody {
                    code: codes::NO_BASE_DIR,
                    message: "Base directory not specified, check config".into(),
                }));
            }
            SessionState::Ready
        }
        Event::Download => {
            info!("Received download request for {}", request.oid);
            engine
                .retrieve(&request.oid, request.size, request.action.as_ref(), out)
                .await;
            SessionState::Ready
        }
        Event::Upload => {
            info!("Received upload request for {}", request.oid);
            let from = request.path.as_deref().unwrap_or(Path::new(""));
            engine
                .store(&request.oid, request.size, from, request.action.as_ref(), out)
                .await;
            SessionState::Ready
        }
        Event::Terminate => {
            info!("Terminating custom adapter gracefully");
            SessionState::Terminated
        }
    }
}
