//! History snapshots as JSON files.
//!
//! The format carries the export time, the model in use, the history stats and every turn
//! (hidden ones included). Files written by older front-ends also load: they use `exported`,
//! `timestamp` and the `"bot"` sender.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::history::{History, HistoryStats, Turn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(alias = "exported")]
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stats: HistoryStats,
    pub history: Vec<Turn>,
}

impl Snapshot {
    pub fn capture(history: &History, model: &str) -> Self {
        Self {
            exported_at: Utc::now(),
            model: model.to_string(),
            stats: history.stats(),
            history: history.turns().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize history snapshot")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse history snapshot")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        info!(path = %path.display(), turns = self.history.len(), "history exported");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read export from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid export file {}", path.display()))
    }

    /// Rebuilds a history from the snapshot; ids are reassigned in order.
    pub fn into_history(self) -> History {
        History::restore(self.history)
    }
}

/// `senko-chat-history-YYYY-MM-DD.json`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("senko-chat-history-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tempfile::tempdir;

    use super::*;
    use crate::history::Sender;

    fn sample() -> History {
        let mut history = History::new();
        history.append("hi", Sender::User, false);
        history.append("continue", Sender::User, true);
        history.append("*waves*", Sender::Assistant, false);
        history.edit(0, "hello");
        history
    }

    #[test]
    fn export_uses_camel_case_fields() {
        let snapshot = Snapshot::capture(&sample(), "test-model");
        let value: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert!(value.get("exportedAt").is_some());
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["stats"]["total"], 3);
        assert_eq!(value["stats"]["hidden"], 1);
        assert_eq!(value["stats"]["visible"], 2);
        assert_eq!(value["stats"]["edited"], 1);

        let first = &value["history"][0];
        assert_eq!(first["sender"], "user");
        assert_eq!(first["content"], "hello");
        assert_eq!(first["edited"], true);
        assert!(first.get("createdAt").is_some());
        assert!(first.get("editedAt").is_some());
        assert_eq!(value["history"][1]["hidden"], true);
        assert_eq!(value["history"][2]["sender"], "assistant");
        assert!(value["history"][2].get("editedAt").is_none());
    }

    #[test]
    fn file_round_trip_preserves_turns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exports").join("chat.json");
        let history = sample();

        Snapshot::capture(&history, "m").write_to(&path).unwrap();
        let restored = Snapshot::read_from(&path).unwrap().into_history();

        assert_eq!(restored.turns(), history.turns());
    }

    #[test]
    fn imports_legacy_export() {
        let json = r#"{
            "exported": "2024-05-01T10:00:00.000Z",
            "model": "meta-llama/llama-4-scout-17b-16e-instruct",
            "stats": { "total": 2, "edited": 1, "hidden": 0, "visible": 2 },
            "history": [
                { "sender": "user", "content": "hi", "timestamp": "2024-05-01T09:59:00.000Z" },
                {
                    "sender": "bot",
                    "content": "*waves*",
                    "timestamp": "2024-05-01T09:59:30.000Z",
                    "edited": true,
                    "editedAt": "2024-05-01T09:59:45.000Z"
                }
            ]
        }"#;

        let snapshot = Snapshot::from_json(json).unwrap();
        assert_eq!(snapshot.stats.total, 2);

        let history = snapshot.into_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[1].sender(), Sender::Assistant);
        assert!(history.turns()[1].is_edited());
        assert!(!history.turns()[0].is_hidden());
        let ids: Vec<u64> = history.iter().map(|t| t.id().get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn read_missing_file_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = Snapshot::read_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }

    #[test]
    fn default_name_uses_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(default_file_name(date), "senko-chat-history-2025-03-07.json");
    }
}
