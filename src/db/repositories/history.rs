use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{epoch_millis, limit_to_sql, to_i64},
    models::{HistoryEntry, HistoryEntryPatch},
};

const SELECT_NEWEST_FIRST: &str = "SELECT id, word, sentence, explanation, timestamp
     FROM history
     ORDER BY timestamp DESC, id DESC
     LIMIT ?1 OFFSET ?2";

const SELECT_OLDEST_FIRST: &str = "SELECT id, word, sentence, explanation, timestamp
     FROM history
     ORDER BY timestamp ASC, id ASC
     LIMIT ?1 OFFSET ?2";

fn row_to_entry(row: &Row) -> Result<HistoryEntry> {
    let word: Option<String> = row.get("word")?;
    let sentence: Option<String> = row.get("sentence")?;
    let explanation: Option<String> = row.get("explanation")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        word: word.unwrap_or_default(),
        sentence: sentence.unwrap_or_default(),
        explanation: explanation.unwrap_or_default(),
        timestamp: row.get("timestamp")?,
    })
}

fn select_entry(conn: &Connection, entry_id: i64) -> Result<Option<HistoryEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, word, sentence, explanation, timestamp
         FROM history
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![entry_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_entry(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Insert a new entry and return it with its assigned id.
    ///
    /// The timestamp is `max(now, newest + 1)` so creation order and timestamp
    /// order never disagree, even when the wall clock stalls or steps back.
    pub async fn insert_history_entry(
        &self,
        word: String,
        explanation: String,
        sentence: String,
    ) -> Result<HistoryEntry> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let newest: Option<i64> = tx
                .query_row("SELECT MAX(timestamp) FROM history", [], |row| {
                    row.get::<_, Option<i64>>(0)
                })
                .optional()?
                .flatten();
            let now = epoch_millis(Utc::now());
            let timestamp = match newest {
                Some(newest) if newest >= now => newest + 1,
                _ => now,
            };

            tx.execute(
                "INSERT INTO history (word, sentence, explanation, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![word, sentence, explanation, timestamp],
            )
            .with_context(|| "failed to insert history entry")?;

            let entry_id = tx.last_insert_rowid();
            let entry = select_entry(&tx, entry_id)?
                .ok_or_else(|| anyhow!("history entry {entry_id} not found after insert"))?;

            tx.commit()?;
            Ok(entry)
        })
        .await
    }

    pub async fn get_history_entry(&self, entry_id: i64) -> Result<Option<HistoryEntry>> {
        self.execute(move |conn| select_entry(conn, entry_id)).await
    }

    /// Returns `false` when there was nothing to delete.
    pub async fn delete_history_entry(&self, entry_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM history WHERE id = ?1", params![entry_id])
                .with_context(|| format!("failed to delete history entry {entry_id}"))?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Merge `patch` over the stored entry. `Ok(None)` when the id has no record.
    pub async fn update_history_entry(
        &self,
        entry_id: i64,
        patch: HistoryEntryPatch,
    ) -> Result<Option<HistoryEntry>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let mut entry = match select_entry(&tx, entry_id)? {
                Some(entry) => entry,
                None => return Ok(None),
            };
            patch.apply_to(&mut entry);

            tx.execute(
                "UPDATE history
                 SET word = ?1,
                     sentence = ?2,
                     explanation = ?3,
                     timestamp = ?4
                 WHERE id = ?5",
                params![
                    entry.word,
                    entry.sentence,
                    entry.explanation,
                    entry.timestamp,
                    entry.id,
                ],
            )
            .with_context(|| format!("failed to update history entry {entry_id}"))?;

            tx.commit()?;
            Ok(Some(entry))
        })
        .await
    }

    /// Walk the timestamp index from either end, skipping `offset` rows and
    /// stopping as soon as `limit` rows have been read.
    pub async fn list_history(
        &self,
        limit: usize,
        offset: usize,
        descending: bool,
    ) -> Result<Vec<HistoryEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql_limit = limit_to_sql(limit);
        let sql_offset = to_i64(offset)?;

        self.execute(move |conn| {
            let query = if descending {
                SELECT_NEWEST_FIRST
            } else {
                SELECT_OLDEST_FIRST
            };
            let mut stmt = conn.prepare(query)?;

            let mut rows = stmt.query(params![sql_limit, sql_offset])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
                if entries.len() >= limit {
                    break;
                }
            }

            Ok(entries)
        })
        .await
    }

    pub async fn count_history(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
            usize::try_from(count).map_err(|_| anyhow!("history count {count} is negative"))
        })
        .await
    }
}
