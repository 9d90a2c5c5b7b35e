/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use quill_protocol::MimeiId;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Persisted key-value settings under the session data dir: app url,
/// app id, current account and cached profile fields.
#[derive(Clone)]
pub struct Settings {
    conn: Arc<Mutex<Connection>>,
}

pub mod keys {
    pub const APP_BASE_URL: &str = "app_base_url";
    pub const APP_ID: &str = "app_id";
    pub const CURRENT_USER_MID: &str = "current_user_mid";
    pub const KEY_PHRASE: &str = "key_phrase";
    pub const CACHED_USERNAME: &str = "cached_username";
    pub const CACHED_NAME: &str = "cached_name";
    pub const CACHED_PROFILE: &str = "cached_profile";
}

impl Settings {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .with_context(|| format!("open settings db: {}", path.display()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS settings (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let v = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(v)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings(key, value) VALUES(?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<MimeiId>> {
        match self.get(keys::CURRENT_USER_MID)? {
            Some(s) => Ok(MimeiId::parse(&s).ok()),
            None => Ok(None),
        }
    }

    pub fn set_current_user(&self, id: &MimeiId) -> Result<()> {
        self.set(keys::CURRENT_USER_MID, id.as_str())
    }

    pub fn key_phrase(&self) -> Result<Option<String>> {
        self.get(keys::KEY_PHRASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mid;

    #[test]
    fn values_round_trip() {
        let s = Settings::open_in_memory().unwrap();
        assert!(s.get(keys::APP_ID).unwrap().is_none());
        s.set(keys::APP_ID, "app-one").unwrap();
        s.set(keys::APP_ID, "app-two").unwrap();
        assert_eq!(s.get(keys::APP_ID).unwrap().as_deref(), Some("app-two"));
        s.delete(keys::APP_ID).unwrap();
        assert!(s.get(keys::APP_ID).unwrap().is_none());
    }

    #[test]
    fn current_user_rejects_corrupt_ids() {
        let s = Settings::open_in_memory().unwrap();
        s.set_current_user(&mid('a')).unwrap();
        assert_eq!(s.current_user().unwrap(), Some(mid('a')));
        s.set(keys::CURRENT_USER_MID, "garbage").unwrap();
        assert!(s.current_user().unwrap().is_none());
    }
}
