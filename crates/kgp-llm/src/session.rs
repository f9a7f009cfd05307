//! Session log of prompt/response pairs
//!
//! The log is a single JSON array file. Each call reads it, appends one
//! entry and rewrites it; an unreadable file starts a fresh array.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use kgp_core::{write_json_pretty, KgpError, Result};

/// One logged model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub prompt_path: String,
    pub prompt: String,
    pub response_text: String,
    pub timestamp: String,
    pub simulated: bool,
}

/// Append-only JSON array log
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry, creating the file and its directory when missing
    pub async fn append(&self, entry: LogEntry) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.read_entries().await;
        entries.push(entry);

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_json_pretty(&path, &entries))
            .await
            .map_err(|e| KgpError::Other(e.into()))?
    }

    /// Entries currently in the log; unreadable or malformed files count as empty
    pub async fn read_entries(&self) -> Vec<LogEntry> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed session log {}: {e}", self.path.display());
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(prompt: &str) -> LogEntry {
        LogEntry {
            prompt_path: "prompts/re.txt".to_string(),
            prompt: prompt.to_string(),
            response_text: "{}".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            simulated: true,
        }
    }

    #[tokio::test]
    async fn test_append_creates_and_grows() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("llm_session/raw_responses.json"));

        log.append(entry("one")).await.unwrap();
        log.append(entry("two")).await.unwrap();

        let entries = log.read_entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].prompt, "two");
    }

    #[tokio::test]
    async fn test_malformed_log_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "not json").unwrap();

        let log = SessionLog::new(&path);
        log.append(entry("fresh")).await.unwrap();
        assert_eq!(log.read_entries().await, vec![entry("fresh")]);
    }
}
