use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::models::UserRow;
use crate::{Database, DbError, Result};

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRow> {
        let username = clean_username(username);
        let created_at = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, password_hash, created_at],
            )
            .map_err(|e| DbError::conflict_on_constraint(e, format!("username '{username}' is taken")))?;

            Ok(UserRow {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                password: password_hash.to_string(),
                picture: String::new(),
                created_at,
            })
        })
    }

    /// Case-insensitive; a leading `@` is ignored.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }
}

/// Strips surrounding whitespace and a leading `@`.
pub fn clean_username(value: &str) -> &str {
    let value = value.trim();
    value.strip_prefix('@').unwrap_or(value).trim()
}

pub(crate) fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password, picture, created_at FROM users WHERE username = ?1",
            [clean_username(username)],
            map_user,
        )
        .optional()?;
    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        picture: row.get(3)?,
        created_at: row.get(4)?,
    })
}
