//! Persisted client state: preferences and the recent-search list.

use super::PlanStore;
use crate::error::PlanResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl PlanStore {
    pub fn set_preference(&self, key: &str, value: &str, at: DateTime<Utc>) -> PlanResult<()> {
        self.conn.execute(
            "INSERT INTO preference (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, at],
        )?;
        Ok(())
    }

    pub fn preference(&self, key: &str) -> PlanResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM preference WHERE key=?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn delete_preference(&self, key: &str) -> PlanResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM preference WHERE key=?1", params![key])?;
        Ok(changed > 0)
    }

    /// Every preference whose key starts with `prefix`, in key order.
    pub fn preferences_with_prefix(&self, prefix: &str) -> PlanResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM preference
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key",
        )?;
        let rows = stmt
            .query_map(params![prefix], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(rows)
    }

    pub fn delete_preferences_with_prefix(&self, prefix: &str) -> PlanResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM preference WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?)
    }

    /// Record a search. Repeating a term moves it to the front; only the
    /// `limit` most recent terms are kept.
    pub fn push_recent_search(&self, term: &str, at: DateTime<Utc>, limit: usize) -> PlanResult<()> {
        // Re-inserting gives a repeated term the newest rowid.
        self.conn
            .execute("DELETE FROM recent_search WHERE term=?1", params![term])?;
        self.conn.execute(
            "INSERT INTO recent_search (term, searched_at) VALUES (?1, ?2)",
            params![term, at],
        )?;
        self.conn.execute(
            "DELETE FROM recent_search WHERE term NOT IN (
                SELECT term FROM recent_search ORDER BY searched_at DESC, rowid DESC LIMIT ?1
             )",
            params![limit as i64],
        )?;
        Ok(())
    }

    pub fn recent_searches(&self) -> PlanResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT term FROM recent_search ORDER BY searched_at DESC, rowid DESC")?;
        let rows = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    pub fn clear_recent_searches(&self) -> PlanResult<()> {
        self.conn.execute("DELETE FROM recent_search", [])?;
        Ok(())
    }
}
