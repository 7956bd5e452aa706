//! JSON lines emission port.
//!
//! Appends one `{"event": ..., "payload": ...}` object per line to a file.
//! Useful as a spool that a separate uploader ships to the collector, and as
//! the sink for command-line replays.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sealpost_core::{EventKind, OutboundEvent};
use serde::{Deserialize, Serialize};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};

use super::{EmissionPort, EmitError};

/// One line of the spool file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedLine {
    /// Emission kind
    pub event: EventKind,
    /// Sealed event
    pub payload: OutboundEvent,
}

#[derive(Serialize)]
struct EmittedLineRef<'a> {
    event: EventKind,
    payload: &'a OutboundEvent,
}

/// Emission port appending JSON lines to a file.
///
/// Writes are serialised through a mutex so lines never interleave.
pub struct JsonlEmitter {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEmitter {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;

        Ok(Self { path, file: Mutex::new(file) })
    }

    /// Spool file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a spool file written by this emitter.
    ///
    /// Blank lines are ignored; any malformed line is an error.
    pub async fn read_all(path: impl AsRef<Path>) -> std::io::Result<Vec<EmittedLine>> {
        let text = tokio::fs::read_to_string(path).await?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(std::io::Error::other))
            .collect()
    }
}

#[async_trait]
impl EmissionPort for JsonlEmitter {
    async fn emit(&self, kind: EventKind, event: &OutboundEvent) -> Result<(), EmitError> {
        let mut line = serde_json::to_vec(&EmittedLineRef { event: kind, payload: event })
            .map_err(|e| EmitError::Encoding(e.to_string()))?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await.map_err(|e| EmitError::Transport(e.to_string()))?;
        file.flush().await.map_err(|e| EmitError::Transport(e.to_string()))
    }
}
