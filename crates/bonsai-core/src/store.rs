//! Transcript persistence for the calling orchestrator.
//!
//! The engine itself never loads or saves transcripts; callers use this
//! store around [`crate::compaction::preparation::ContextPreparer`] as a
//! load → prepare → call → save sequence.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::wire::WireMessage;

#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn load_transcript(&self, session_id: &str) -> std::io::Result<Vec<WireMessage>>;
    async fn save_transcript(
        &self,
        session_id: &str,
        messages: &[WireMessage],
    ) -> std::io::Result<()>;
    async fn delete_transcript(&self, session_id: &str) -> std::io::Result<bool>;
}

/// File-backed store: one wire message per line under
/// `{base}/{session_id}.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlTranscriptStore {
    base_path: PathBuf,
}

impl JsonlTranscriptStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub async fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.base_path).await
    }

    fn transcript_path(&self, session_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", session_id))
    }
}

#[async_trait::async_trait]
impl TranscriptStore for JsonlTranscriptStore {
    async fn load_transcript(&self, session_id: &str) -> std::io::Result<Vec<WireMessage>> {
        let path = self.transcript_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut messages = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(message) => messages.push(message),
                Err(error) => {
                    tracing::warn!(session_id, %error, "skipping unreadable transcript line");
                }
            }
        }

        Ok(messages)
    }

    async fn save_transcript(
        &self,
        session_id: &str,
        messages: &[WireMessage],
    ) -> std::io::Result<()> {
        let path = self.transcript_path(session_id);
        let mut file = fs::File::create(path).await?;

        for message in messages {
            let json = serde_json::to_string(message)?;
            file.write_all(json.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }

        file.flush().await
    }

    async fn delete_transcript(&self, session_id: &str) -> std::io::Result<bool> {
        let path = self.transcript_path(session_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WirePart;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_transcript() -> Vec<WireMessage> {
        vec![
            WireMessage::user("list the files"),
            WireMessage::assistant(vec![WirePart::ToolCall {
                tool_call_id: "c1".to_string(),
                tool_name: "bash".to_string(),
                input: json!({"command": "ls"}),
            }]),
            WireMessage::tool(vec![WirePart::ToolResult {
                tool_call_id: "c1".to_string(),
                tool_name: "bash".to_string(),
                output: json!("a.rs\nb.rs"),
            }]),
        ]
    }

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());
        store.init().await.unwrap();

        let transcript = sample_transcript();
        store.save_transcript("session-1", &transcript).await.unwrap();

        let loaded = store.load_transcript("session-1").await.unwrap();
        assert_eq!(loaded, transcript);
    }

    #[tokio::test]
    async fn missing_transcript_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());

        let loaded = store.load_transcript("nope").await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_previous_transcript() {
        let dir = tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());
        store.init().await.unwrap();

        store
            .save_transcript("session-1", &sample_transcript())
            .await
            .unwrap();
        store
            .save_transcript("session-1", &[WireMessage::user("fresh start")])
            .await
            .unwrap();

        let loaded = store.load_transcript("session-1").await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());
        store.init().await.unwrap();

        let path = dir.path().join("session-1.jsonl");
        let good = serde_json::to_string(&WireMessage::user("ok")).unwrap();
        tokio::fs::write(&path, format!("{good}\nnot json\n")).await.unwrap();

        let loaded = store.load_transcript("session-1").await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_existed() {
        let dir = tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path());
        store.init().await.unwrap();

        store
            .save_transcript("session-1", &sample_transcript())
            .await
            .unwrap();

        assert!(store.delete_transcript("session-1").await.unwrap());
        assert!(!store.delete_transcript("session-1").await.unwrap());
    }
}
