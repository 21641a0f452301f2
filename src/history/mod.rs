//! Persistent explanation history.
//!
//! `HistoryStore` owns the database lifecycle: it is cheap to construct, opens
//! the SQLite file on `init()`, and hands out classified errors instead of the
//! raw `anyhow` chains produced by the database layer.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::db::{Database, HistoryEntry, HistoryEntryPatch};
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Name of the SQLite file inside the data directory.
pub const HISTORY_DB_FILE: &str = "word-tracker.sqlite3";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("no history entry with id {0}")]
    NotFound(i64),
    #[error("history storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

#[derive(Clone)]
pub struct HistoryStore {
    db_path: PathBuf,
    db: std::sync::Arc<OnceCell<Database>>,
}

impl HistoryStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            db: std::sync::Arc::new(OnceCell::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Open the database, creating or upgrading the schema. Safe to call again.
    pub async fn init(&self) -> HistoryResult<()> {
        self.db
            .get_or_try_init(|| async {
                let path = self.db_path.clone();
                let opened = tokio::task::spawn_blocking(move || Database::new(path))
                    .await
                    .map_err(|err| {
                        HistoryError::StorageUnavailable(format!("database open task failed: {err}"))
                    })?;
                opened.map_err(|err| {
                    log_warn!(
                        "Failed to open history database at {}: {err:#}",
                        self.db_path.display()
                    );
                    HistoryError::StorageUnavailable(format!("{err:#}"))
                })
            })
            .await?;
        Ok(())
    }

    fn db(&self) -> HistoryResult<&Database> {
        self.db.get().ok_or_else(|| {
            HistoryError::StorageUnavailable("history store has not been initialized".into())
        })
    }

    pub async fn add_entry(
        &self,
        word: &str,
        explanation: &str,
        sentence: &str,
    ) -> HistoryResult<HistoryEntry> {
        let entry = self
            .db()?
            .insert_history_entry(word.to_string(), explanation.to_string(), sentence.to_string())
            .await?;
        log_info!("Stored history entry {} for '{}'", entry.id, entry.word);
        Ok(entry)
    }

    /// Removing an id that does not exist is not an error.
    pub async fn delete_entry(&self, id: i64) -> HistoryResult<()> {
        if !self.db()?.delete_history_entry(id).await? {
            log_info!("History entry {id} already absent; nothing to delete");
        }
        Ok(())
    }

    pub async fn update_entry(
        &self,
        id: i64,
        patch: HistoryEntryPatch,
    ) -> HistoryResult<HistoryEntry> {
        self.db()?
            .update_history_entry(id, patch)
            .await?
            .ok_or(HistoryError::NotFound(id))
    }

    pub async fn get_entry(&self, id: i64) -> HistoryResult<Option<HistoryEntry>> {
        Ok(self.db()?.get_history_entry(id).await?)
    }

    /// Up to `limit` entries by creation time; `usize::MAX` reads everything.
    pub async fn get_entries(
        &self,
        limit: usize,
        sort_descending: bool,
    ) -> HistoryResult<Vec<HistoryEntry>> {
        self.get_entries_paginated(limit, 0, sort_descending).await
    }

    pub async fn get_entries_paginated(
        &self,
        limit: usize,
        offset: usize,
        sort_descending: bool,
    ) -> HistoryResult<Vec<HistoryEntry>> {
        Ok(self
            .db()?
            .list_history(limit, offset, sort_descending)
            .await?)
    }

    pub async fn count_entries(&self) -> HistoryResult<usize> {
        Ok(self.db()?.count_history().await?)
    }

    /// Full dump, newest first, as a pretty-printed JSON array.
    pub async fn export_json(&self) -> HistoryResult<String> {
        let entries = self.get_entries(usize::MAX, true).await?;
        let json = serde_json::to_string_pretty(&entries)
            .context("failed to serialize history export")?;
        Ok(json)
    }

    /// Write the export into `dir` under a dated file name and return its path.
    pub async fn export_to_file(&self, dir: &Path) -> HistoryResult<PathBuf> {
        let json = self.export_json().await?;
        let path = dir.join(export_file_name());
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create export directory {}", dir.display()))?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write history export to {}", path.display()))?;
        log_info!("Exported history to {}", path.display());
        Ok(path)
    }
}

pub fn export_file_name() -> String {
    format!("word-tracker-history-{}.json", Utc::now().format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join(HISTORY_DB_FILE));
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn newest_entry_comes_back_first() {
        let (_dir, store) = open_store().await;
        store.add_entry("slow", "lento", "The bus is slow.").await.unwrap();

        let before = Utc::now().timestamp_millis();
        let added = store
            .add_entry("fast", "**fast** /fæst/ rápido", "The train is fast.")
            .await
            .unwrap();

        assert!(added.id > 0);
        assert!((added.timestamp - before).abs() < 5_000);

        let latest = store.get_entries(1, true).await.unwrap();
        assert_eq!(latest, vec![added]);
    }

    #[tokio::test]
    async fn ascending_order_and_limit() {
        let (_dir, store) = open_store().await;
        for word in ["one", "two", "three", "four"] {
            store.add_entry(word, "x", "").await.unwrap();
        }

        let oldest: Vec<_> = store
            .get_entries(2, false)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.word)
            .collect();
        assert_eq!(oldest, vec!["one", "two"]);

        let newest: Vec<_> = store
            .get_entries(10, true)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.word)
            .collect();
        assert_eq!(newest, vec!["four", "three", "two", "one"]);

        assert!(store.get_entries(0, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn timestamps_strictly_increase() {
        let (_dir, store) = open_store().await;
        let mut previous = None;
        for i in 0..20 {
            let entry = store.add_entry(&format!("w{i}"), "e", "").await.unwrap();
            if let Some((prev_id, prev_ts)) = previous {
                assert!(entry.id > prev_id);
                assert!(entry.timestamp > prev_ts);
            }
            previous = Some((entry.id, entry.timestamp));
        }
    }

    #[tokio::test]
    async fn concurrent_adds_get_distinct_ids() {
        let (_dir, store) = open_store().await;
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add_entry(&format!("w{i}"), "e", "").await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(store.count_entries().await.unwrap(), 16);
    }

    #[tokio::test]
    async fn pagination_walks_pages() {
        let (_dir, store) = open_store().await;
        for i in 0..5 {
            store.add_entry(&format!("w{i}"), "e", "").await.unwrap();
        }

        let page: Vec<_> = store
            .get_entries_paginated(2, 2, true)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.word)
            .collect();
        assert_eq!(page, vec!["w2", "w1"]);

        let tail = store.get_entries_paginated(10, 4, true).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].word, "w0");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = open_store().await;
        let entry = store.add_entry("gone", "e", "").await.unwrap();

        store.delete_entry(entry.id).await.unwrap();
        store.delete_entry(entry.id).await.unwrap();

        assert!(store.get_entry(entry.id).await.unwrap().is_none());
        assert!(store.get_entries(10, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let (_dir, store) = open_store().await;
        let first = store.add_entry("a", "e", "").await.unwrap();
        store.delete_entry(first.id).await.unwrap();
        let second = store.add_entry("b", "e", "").await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let (_dir, store) = open_store().await;
        let original = store
            .add_entry("fast", "old", "The train is fast.")
            .await
            .unwrap();

        let patch = HistoryEntryPatch {
            explanation: Some("**fast** rápido\nnew details".into()),
            ..Default::default()
        };
        let updated = store.update_entry(original.id, patch).await.unwrap();
        assert_eq!(updated.explanation, "**fast** rápido\nnew details");

        let stored = store.get_entries(1, true).await.unwrap().remove(0);
        assert_eq!(stored.id, original.id);
        assert_eq!(stored.explanation, "**fast** rápido\nnew details");
        assert_eq!(stored.word, original.word);
        assert_eq!(stored.sentence, original.sentence);
        assert_eq!(stored.timestamp, original.timestamp);
    }

    #[tokio::test]
    async fn update_missing_entry_is_not_found() {
        let (_dir, store) = open_store().await;
        let err = store
            .update_entry(42, HistoryEntryPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(42)));
    }

    #[tokio::test]
    async fn operations_before_init_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join(HISTORY_DB_FILE));
        let err = store.get_entries(1, true).await.unwrap_err();
        assert!(matches!(err, HistoryError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn init_is_idempotent_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_DB_FILE);
        {
            let store = HistoryStore::new(&path);
            store.init().await.unwrap();
            store.init().await.unwrap();
            store.add_entry("kept", "e", "s").await.unwrap();
        }

        let reopened = HistoryStore::new(&path);
        reopened.init().await.unwrap();
        let entries = reopened.get_entries(10, true).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].word, "kept");
    }

    #[tokio::test]
    async fn unopenable_path_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let store = HistoryStore::new(dir.path());
        let err = store.init().await.unwrap_err();
        assert!(matches!(err, HistoryError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn export_preserves_field_names_and_types() {
        let (dir, store) = open_store().await;
        store.add_entry("first", "one", "").await.unwrap();
        store.add_entry("second", "two", "Second one.").await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&store.export_json().await.unwrap()).unwrap();
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["word"], "second");
        for item in items {
            let keys: Vec<_> = item.as_object().unwrap().keys().cloned().collect();
            assert_eq!(keys.len(), 5);
            assert!(item["id"].is_i64());
            assert!(item["timestamp"].is_i64());
            assert!(item["word"].is_string());
            assert!(item["sentence"].is_string());
            assert!(item["explanation"].is_string());
        }

        let path = store.export_to_file(&dir.path().join("exports")).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<HistoryEntry> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("word-tracker-history-"));
    }

    #[tokio::test]
    async fn patch_cannot_move_an_entry_to_another_id() {
        let (_dir, store) = open_store().await;
        let entry = store.add_entry("fast", "rápido", "").await.unwrap();

        let patch: HistoryEntryPatch =
            serde_json::from_str(r#"{"id": 999, "explanation": "veloz"}"#).unwrap();
        let updated = store.update_entry(entry.id, patch).await.unwrap();

        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.explanation, "veloz");
        assert!(store.get_entry(999).await.unwrap().is_none());
        assert_eq!(store.count_entries().await.unwrap(), 1);
    }
}
