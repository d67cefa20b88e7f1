//! Append-only transcript logging.
//!
//! Every completed turn is recorded for course-staff review, keyed by an
//! anonymized user identifier rather than the raw username. The sink is
//! deliberately opaque to the rest of the system: the exchange controller
//! fires a record and moves on, and a failing sink never fails a turn.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{Error, Result};

/// Tracing target for transcript operations.
const TRACING_TARGET: &str = "tutor_server::service::transcript";

/// Anonymized identity: users appear in transcripts only as this hash.
#[must_use]
pub fn anonymize(username: &str) -> String {
    let digest = Sha256::digest(username.trim().to_lowercase().as_bytes());
    hex::encode(digest)
}

/// One recorded question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Unique record id.
    pub record_id: Uuid,
    /// Anonymized user identifier (never the raw username).
    pub anonymous_id: String,
    /// Client-supplied conversation id.
    pub conversation_id: String,
    /// The user's question.
    pub query: String,
    /// The assistant's answer.
    pub response: String,
    /// Rendered retrieval context the turn had available.
    pub rag_context: String,
    /// Upstream model that generated the answer.
    pub model: String,
    /// End-to-end turn duration in milliseconds.
    pub response_time_ms: u64,
    /// When the record was created.
    pub created_at: Timestamp,
}

impl TranscriptEntry {
    /// Creates a record for a completed turn.
    ///
    /// `username` is hashed immediately; the raw value is never stored.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        username: &str,
        conversation_id: impl Into<String>,
        query: impl Into<String>,
        response: impl Into<String>,
        rag_context: impl Into<String>,
        model: impl Into<String>,
        response_time_ms: u64,
    ) -> Self {
        Self {
            record_id: Uuid::now_v7(),
            anonymous_id: anonymize(username),
            conversation_id: conversation_id.into(),
            query: query.into(),
            response: response.into(),
            rag_context: rag_context.into(),
            model: model.into(),
            response_time_ms,
            created_at: Timestamp::now(),
        }
    }
}

/// An append-only destination for transcript records.
#[async_trait::async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Appends one record.
    async fn append(&self, entry: &TranscriptEntry) -> Result<()>;
}

/// Transcript sink writing one JSON record per line.
pub struct JsonlSink {
    path: PathBuf,
    // Serializes writers so records never interleave within a line.
    guard: tokio::sync::Mutex<()>,
}

impl JsonlSink {
    /// Creates a sink appending to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }
}

impl fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonlSink").field("path", &self.path).finish()
    }
}

#[async_trait::async_trait]
impl TranscriptSink for JsonlSink {
    async fn append(&self, entry: &TranscriptEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| Error::transcript("cannot serialize transcript entry").with_source(e))?;
        line.push(b'\n');

        let _guard = self.guard.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::transcript(format!("cannot open transcript log {}", self.path.display()))
                    .with_source(e)
            })?;

        file.write_all(&line)
            .await
            .map_err(|e| Error::transcript("cannot append transcript entry").with_source(e))?;

        Ok(())
    }
}

/// Fire-and-forget transcript recorder.
///
/// [`record`] spawns the sink write and returns immediately; failures are
/// logged and otherwise dropped, so transcript trouble never surfaces to
/// the user.
///
/// [`record`]: TranscriptLogger::record
#[derive(Clone)]
pub struct TranscriptLogger {
    sink: Arc<dyn TranscriptSink>,
}

impl fmt::Debug for TranscriptLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptLogger").finish_non_exhaustive()
    }
}

impl TranscriptLogger {
    /// Creates a logger over any sink.
    pub fn new<S>(sink: S) -> Self
    where
        S: TranscriptSink + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Creates a logger appending JSON lines to the given file.
    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonlSink::new(path))
    }

    /// Records a completed turn without blocking the caller.
    pub fn record(&self, entry: TranscriptEntry) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(error) = sink.append(&entry).await {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    record_id = %entry.record_id,
                    "Transcript write failed; turn already completed"
                );
            } else {
                tracing::debug!(
                    target: TRACING_TARGET,
                    record_id = %entry.record_id,
                    conversation_id = %entry.conversation_id,
                    "Transcript entry recorded"
                );
            }
        });
    }

    /// Appends a record and waits for the sink; used in tests.
    pub async fn record_and_wait(&self, entry: TranscriptEntry) -> Result<()> {
        self.sink.append(&entry).await
    }
}
