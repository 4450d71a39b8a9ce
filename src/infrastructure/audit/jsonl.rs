use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::domain::pipeline::{AuditRecord, AuditSink};
use crate::domain::DomainError;

/// Appends one JSON object per line to a file.
///
/// `record` only enqueues; a background task owns the file. Write failures
/// are logged and the record is dropped.
#[derive(Debug)]
pub struct JsonlAuditSink {
    sender: mpsc::UnboundedSender<AuditRecord>,
}

impl JsonlAuditSink {
    /// Open (or create) the file and start the writer task
    pub async fn open(path: &Path) -> Result<(Self, JoinHandle<()>), DomainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                DomainError::configuration(format!(
                    "Cannot create audit directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                DomainError::configuration(format!(
                    "Cannot open audit file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(write_loop(file, path.to_path_buf(), receiver));

        Ok((Self { sender }, handle))
    }
}

async fn write_loop(
    mut file: tokio::fs::File,
    path: PathBuf,
    mut receiver: mpsc::UnboundedReceiver<AuditRecord>,
) {
    while let Some(record) = receiver.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize audit record");
                continue;
            }
        };
        line.push(b'\n');

        if let Err(e) = file.write_all(&line).await {
            error!(path = %path.display(), error = %e, "Failed to append audit record");
            continue;
        }

        if let Err(e) = file.flush().await {
            warn!(path = %path.display(), error = %e, "Failed to flush audit file");
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: AuditRecord) {
        if self.sender.send(record).is_err() {
            warn!("Audit writer stopped; record dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::StageOutcome;
    use crate::domain::{RequestId, StageName};
    use chrono::Utc;

    #[tokio::test]
    async fn test_records_are_appended_as_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit/trail.jsonl");

        let (sink, handle) = JsonlAuditSink::open(&path).await.unwrap();
        let request_id = RequestId::new();

        for stage in [StageName::Parse, StageName::Design] {
            sink.record(AuditRecord {
                request_id,
                stage,
                entered_at: Utc::now(),
                exited_at: Utc::now(),
                outcome: StageOutcome::Completed,
            });
        }

        drop(sink);
        handle.await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<AuditRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].stage, StageName::Parse);
        assert_eq!(lines[1].request_id, request_id);
    }
}
