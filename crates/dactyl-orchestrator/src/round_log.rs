//! Durable round log - append-only NDJSON audit trail of a run
//!
//! One serde-tagged record per line: the run header, each round's poem,
//! each round's verdict, and the final outcome. Appends are fail-open (a
//! full disk should not kill a poem three rounds in); reading the log back
//! powers the `replay` command.
//!
//! The final approved poem is written separately, verbatim, and that write
//! IS fatal on failure - it is the deliverable.

use chrono::{DateTime, Utc};
use dactyl_core::fail_open::fail_open;
use dactyl_core::{DactylError, Issue, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One line of the round log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LogRecord {
    /// Run header
    Start {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
        max_rounds: usize,
    },
    /// A generated poem
    Round {
        round: usize,
        timestamp: DateTime<Utc>,
        poem: String,
    },
    /// The critic's verdict for a round
    Verdict {
        round: usize,
        approved: bool,
        issues: Vec<Issue>,
        /// Rendered feedback handed to the poet, absent when approved
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    /// How the run ended
    Final {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
        outcome: String,
        retry_count: usize,
    },
}

/// Append-only NDJSON logger for loop rounds
pub struct RoundLog {
    output_path: PathBuf,
}

impl RoundLog {
    /// Create a new round log writing to `output_path`
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Path this log writes to
    pub fn path(&self) -> &Path {
        &self.output_path
    }

    /// Append one record as a single NDJSON line
    ///
    /// This operation is fail-open - logging failures won't abort the run
    pub async fn append(&self, record: &LogRecord) {
        fail_open("round_log::append", || self.append_internal(record)).await;
    }

    async fn append_internal(&self, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Read a round log back, skipping lines that fail to parse
    ///
    /// Unparseable lines are warned about and dropped rather than failing
    /// the whole replay; a log truncated by a crash is still readable up to
    /// the damage.
    pub async fn read_all(path: &Path) -> Result<Vec<LogRecord>> {
        let content = tokio::fs::read_to_string(path).await?;

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unparseable log line {}: {}", idx + 1, e);
                }
            }
        }

        Ok(records)
    }
}

/// Write the final approved poem verbatim
///
/// Called once, only on the approved outcome. Unlike round logging this is
/// fatal on failure.
pub async fn write_final_poem(path: &Path, poem: &str) -> Result<()> {
    tokio::fs::write(path, poem)
        .await
        .map_err(|e| DactylError::Other(format!("Failed to write final poem: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn start_record() -> LogRecord {
        LogRecord::Start {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            max_rounds: 8,
        }
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("poem_log.ndjson");
        let log = RoundLog::new(&path);

        log.append(&start_record()).await;
        log.append(&LogRecord::Round {
            round: 1,
            timestamp: Utc::now(),
            poem: "Higgledy piggledy".to_string(),
        })
        .await;
        log.append(&LogRecord::Verdict {
            round: 1,
            approved: false,
            issues: vec![Issue::new(6, "not a single word")],
            feedback: Some("Line 6: not a single word".to_string()),
        })
        .await;

        let records = RoundLog::read_all(&path).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], LogRecord::Start { max_rounds: 8, .. }));
        match &records[2] {
            LogRecord::Verdict {
                approved, issues, ..
            } => {
                assert!(!approved);
                assert_eq!(issues[0].line_number, 6);
            }
            other => panic!("expected verdict record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_append_is_one_line_per_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("poem_log.ndjson");
        let log = RoundLog::new(&path);

        log.append(&LogRecord::Round {
            round: 1,
            timestamp: Utc::now(),
            poem: "line one\nline two".to_string(),
        })
        .await;
        log.append(&LogRecord::Round {
            round: 2,
            timestamp: Utc::now(),
            poem: "line one\nline two".to_string(),
        })
        .await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        // Embedded newlines are escaped by JSON; two records = two lines
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_append_to_bad_path_fails_open() {
        let log = RoundLog::new("/nonexistent-dir/poem_log.ndjson");
        // Must not panic or error out
        log.append(&start_record()).await;
    }

    #[tokio::test]
    async fn test_read_all_skips_garbage_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("poem_log.ndjson");
        let log = RoundLog::new(&path);

        log.append(&start_record()).await;

        // Simulate a crash mid-write
        let mut file = OpenOptions::new().append(true).open(&path).await.unwrap();
        file.write_all(b"{\"record\":\"round\",\"rou").await.unwrap();
        file.flush().await.unwrap();

        let records = RoundLog::read_all(&path).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_write_final_poem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("final_poem.txt");

        write_final_poem(&path, "Higgledy piggledy\nFinished at last").await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "Higgledy piggledy\nFinished at last");
    }
}
