//! Stream transport (§4.1): newline-delimited JSON-RPC over a duplex byte
//! stream (stdin/stdout in the common case). One line in, one line out;
//! malformed frames get a JSON-RPC error response with `id: null` and do
//! not close the session. Reads drive one spawned task per request; writes
//! are serialized by a single writer task per session, mirroring the
//! teacher's `StdioTransport` read/write split generalized from the client
//! side (reads a response) to the server side (reads a request).

use std::sync::Arc;

use snapback_protocol::{JsonRpcRequest, JsonRpcResponse};
use snapback_sessions::{CancelToken, SessionRegistry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::dispatcher::RequestHandler;

/// Runs the stream transport loop until the reader hits EOF or an
/// unrecoverable I/O error. Consumes `reader`/`writer` for the lifetime of
/// one session.
pub struct StreamTransport<H: RequestHandler + 'static> {
    handler: Arc<H>,
    sessions: Arc<SessionRegistry>,
}

impl<H: RequestHandler + 'static> StreamTransport<H> {
    pub fn new(handler: Arc<H>, sessions: Arc<SessionRegistry>) -> Self {
        Self { handler, sessions }
    }

    pub async fn run<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let session_id = self.sessions.register(CancelToken::new());
        self.handler.on_session_open(&session_id).await;

        // Single writer task per session (§5): responses are serialized and
        // never interleaved at the byte level.
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        let result = self.read_loop(reader, &session_id, tx.clone()).await;

        drop(tx);
        let _ = writer_task.await;
        self.sessions.remove(&session_id);
        self.handler.on_session_close(&session_id).await;
        result
    }

    async fn read_loop<R>(
        &self,
        reader: R,
        session_id: &str,
        tx: mpsc::UnboundedSender<String>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = match lines.next_line().await? {
                Some(l) => l,
                None => return Ok(()), // EOF terminates the session (§4.1).
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let handler = self.handler.clone();
            let session_id = session_id.to_owned();
            let tx = tx.clone();
            let raw = trimmed.to_owned();

            // One spawned task per request (§5): parallel handling, no
            // global request lock.
            tokio::spawn(async move {
                let response = match serde_json::from_str::<JsonRpcRequest>(&raw) {
                    Ok(req) => handler.handle(&session_id, req).await,
                    Err(e) => JsonRpcResponse::parse_error(&e.to_string()),
                };
                if let Ok(text) = serde_json::to_string(&response) {
                    let _ = tx.send(text);
                }
            });
        }
    }
}

impl<H: RequestHandler + 'static> Clone for StreamTransport<H> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            sessions: self.sessions.clone(),
        }
    }
}
