use chrono::Utc;
use pulse_types::models::PushToken;

use crate::{Database, DbError, Result};

impl Database {
    // -- Push tokens --

    /// Register `token` for `user_id`. A token already registered to another
    /// user moves to this one.
    pub fn upsert_push_token(&self, user_id: i64, token: &str, platform: &str) -> Result<()> {
        let token = token.trim();
        let platform = platform.trim().to_lowercase();
        if token.is_empty() {
            return Err(DbError::Invalid("token is required".into()));
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO push_tokens (user_id, token, platform, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(token) DO UPDATE SET user_id = excluded.user_id, platform = excluded.platform",
                rusqlite::params![user_id, token, platform, Utc::now()],
            )?;
            Ok(())
        })
    }

    pub fn get_push_tokens(&self, user_id: i64) -> Result<Vec<PushToken>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, token, platform, created_at FROM push_tokens
                 WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PushToken {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        token: row.get(2)?,
                        platform: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns whether a row was removed; deleting an unknown token is not an error.
    pub fn delete_push_token(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM push_tokens WHERE token = ?1", [token.trim()])?;
            Ok(removed > 0)
        })
    }
}
