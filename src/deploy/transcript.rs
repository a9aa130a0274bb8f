use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptAction {
    Execute,
    Transfer,
}

/// One remote command or copy, as it was invoked and how it ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub at: DateTime<Utc>,
    pub artifact: Option<String>,
    pub action: TranscriptAction,
    pub detail: String,
    pub success: bool,
    pub output: String,
}

/// Append-only audit log of a run, shared by concurrent transfer tasks.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(
        &self,
        artifact: Option<&str>,
        action: TranscriptAction,
        detail: impl Into<String>,
        outcome: Result<&str, String>,
    ) {
        let (success, output) = match outcome {
            Ok(output) => (true, output.to_string()),
            Err(error) => (false, error),
        };
        self.entries.lock().await.push(TranscriptEntry {
            at: Utc::now(),
            artifact: artifact.map(str::to_string),
            action,
            detail: detail.into(),
            success,
            output,
        });
    }

    pub async fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_from_concurrent_tasks() {
        let transcript = Transcript::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let transcript = transcript.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("artifact-{i}");
                transcript
                    .record(Some(&name), TranscriptAction::Transfer, "copy", Ok("done"))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let entries = transcript.entries().await;
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().all(|e| e.success));
    }

    #[tokio::test]
    async fn test_failed_entry_keeps_error() {
        let transcript = Transcript::new();
        transcript
            .record(None, TranscriptAction::Execute, "mkdir", Err("denied".to_string()))
            .await;
        let entries = transcript.entries().await;
        assert!(!entries[0].success);
        assert_eq!(entries[0].output, "denied");
        assert!(entries[0].artifact.is_none());
    }
}
