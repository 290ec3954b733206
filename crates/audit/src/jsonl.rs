//! Append-only JSON-lines audit file

use async_trait::async_trait;
use execgate_errors::{AuditError, Error};
use execgate_types::AuditRecord;
use futures::stream::{self, StreamExt};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::{AuditFilter, AuditSink, AuditStream};

/// Audit sink writing one JSON object per line
///
/// Writes go through a single `O_APPEND` handle guarded by a mutex, so lines
/// from concurrent requests never interleave. The handle is opened on first
/// use and reopened after a write failure; until a write succeeds every
/// append reports [`AuditError::Unavailable`]. Opening cuts off an
/// unterminated final line, so a torn write never swallows the next record.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    sync: bool,
    writer: Mutex<Option<File>>,
}

impl JsonlAuditLog {
    /// Create a sink for `path` without touching the filesystem
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, sync: bool) -> Self {
        Self {
            path: path.into(),
            sync,
            writer: Mutex::new(None),
        }
    }

    /// Create a sink and open the file immediately
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Unavailable`] if the file (or its parent
    /// directory) cannot be created or opened for appending.
    pub async fn open(path: impl Into<PathBuf>, sync: bool) -> Result<Self, Error> {
        let log = Self::new(path, sync);
        let file = log.open_writer().await?;
        *log.writer.lock().await = Some(file);
        Ok(log)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, message: impl ToString) -> AuditError {
        AuditError::Unavailable {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    async fn open_writer(&self) -> Result<File, AuditError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.unavailable(e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o640)
            .open(&self.path)
            .await
            .map_err(|e| self.unavailable(e))?;
        self.discard_torn_tail(&file)
            .await
            .map_err(|e| self.unavailable(e))?;
        Ok(file)
    }

    /// Truncate the file back to its last complete line
    ///
    /// Records are only acknowledged once their newline is written, so bytes
    /// after the last newline belong to an append that already failed.
    async fn discard_torn_tail(&self, file: &File) -> std::io::Result<()> {
        const CHUNK: u64 = 4096;

        let len = file.metadata().await?.len();
        if len == 0 {
            return Ok(());
        }

        let mut reader = File::open(&self.path).await?;
        let mut buf = vec![0u8; 4096];
        let mut end = len;
        let mut keep = 0;
        while end > 0 {
            let start = end.saturating_sub(CHUNK);
            let window = usize::try_from(end - start).unwrap_or(buf.len());
            reader.seek(SeekFrom::Start(start)).await?;
            reader.read_exact(&mut buf[..window]).await?;
            if let Some(pos) = buf[..window].iter().rposition(|b| *b == b'\n') {
                keep = start + pos as u64 + 1;
                break;
            }
            end = start;
        }

        if keep < len {
            tracing::warn!(
                path = %self.path.display(),
                dropped_bytes = len - keep,
                "discarding unterminated audit line"
            );
            file.set_len(keep).await?;
        }
        Ok(())
    }

    async fn write_line(&self, file: &mut File, line: &[u8]) -> std::io::Result<()> {
        file.write_all(line).await?;
        file.flush().await?;
        if self.sync {
            file.sync_data().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuditSink for JsonlAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        let mut line = serde_json::to_vec(record).map_err(|e| AuditError::Encode {
            message: e.to_string(),
        })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        if writer.is_none() {
            *writer = Some(self.open_writer().await?);
        }
        let Some(file) = writer.as_mut() else {
            return Err(self.unavailable("writer not open").into());
        };

        if let Err(e) = self.write_line(file, &line).await {
            // force a reopen on the next append
            *writer = None;
            return Err(self.unavailable(e).into());
        }

        tracing::trace!(request_id = %record.request_id, phase = ?record.phase, "audit record appended");
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> Result<AuditStream, Error> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(stream::empty().boxed());
            }
            Err(e) => {
                return Err(AuditError::ReadFailed {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                }
                .into())
            }
        };

        let state = QueryState {
            reader: BufReader::new(file),
            path: self.path.display().to_string(),
            line: 0,
            emitted: 0,
            done: false,
            filter,
        };
        Ok(stream::unfold(state, next_record).boxed())
    }
}

struct QueryState {
    reader: BufReader<File>,
    path: String,
    line: u64,
    emitted: usize,
    done: bool,
    filter: AuditFilter,
}

/// Pull lines until one matches the filter
///
/// A final line without a newline is an append in progress and ends the
/// stream. A complete line that does not decode ends it with an error.
async fn next_record(
    mut state: QueryState,
) -> Option<(Result<AuditRecord, Error>, QueryState)> {
    let mut buf = Vec::new();
    loop {
        if state.done || state.filter.limit.is_some_and(|limit| state.emitted >= limit) {
            return None;
        }

        buf.clear();
        match state.reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return None,
            Ok(_) if buf.last() != Some(&b'\n') => return None,
            Ok(_) => state.line += 1,
            Err(e) => {
                state.done = true;
                let err = AuditError::ReadFailed {
                    path: state.path.clone(),
                    message: e.to_string(),
                };
                return Some((Err(err.into()), state));
            }
        }

        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<AuditRecord>(&buf) {
            Ok(record) if state.filter.matches(&record) => {
                state.emitted += 1;
                return Some((Ok(record), state));
            }
            Ok(_) => {}
            Err(e) => {
                state.done = true;
                let err = AuditError::Corrupt {
                    line: state.line,
                    message: e.to_string(),
                };
                return Some((Err(err.into()), state));
            }
        }
    }
}
