use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::settings::SettingKey;

/// Raw JSON text stored under `key`, if any.
pub fn read_setting(conn: &Connection, key: SettingKey) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key.as_str()],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read setting '{key}'"))
}

pub fn write_setting(conn: &Connection, key: SettingKey, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = excluded.updated_at",
        params![key.as_str(), value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write setting '{key}'"))?;
    Ok(())
}

pub fn remove_setting(conn: &Connection, key: SettingKey) -> Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?1", params![key.as_str()])
        .with_context(|| format!("failed to delete setting '{key}'"))?;
    Ok(())
}

impl Database {
    pub async fn get_setting(&self, key: SettingKey) -> Result<Option<String>> {
        self.execute(move |conn| read_setting(conn, key)).await
    }

    pub async fn put_setting(&self, key: SettingKey, value: String) -> Result<()> {
        self.execute(move |conn| write_setting(conn, key, &value))
            .await
    }
}
