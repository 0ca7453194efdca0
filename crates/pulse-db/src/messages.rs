use chrono::Utc;
use pulse_types::events::DirectMessage;

use crate::users::query_user_by_username;
use crate::{Database, DbError, Result};

impl Database {
    // -- Direct messages --

    /// Persist a message from `sender` to `recipient` (usernames, resolved
    /// case-insensitively). The returned record carries the canonical names.
    pub fn insert_direct_message(
        &self,
        sender: &str,
        recipient: &str,
        content: &str,
    ) -> Result<DirectMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DbError::Invalid("message content is required".into()));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let sender_row = query_user_by_username(&tx, sender)?
                .ok_or_else(|| DbError::not_found(format!("sender '{sender}' not found")))?;
            let recipient_row = query_user_by_username(&tx, recipient)?
                .ok_or_else(|| DbError::not_found(format!("recipient '{recipient}' not found")))?;

            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO direct_messages (sender_id, recipient_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_row.id, recipient_row.id, content, created_at],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok(DirectMessage {
                id,
                sender_id: sender_row.id,
                recipient_id: recipient_row.id,
                sender_name: sender_row.username,
                recipient_name: recipient_row.username,
                content: content.to_string(),
                created_at,
            })
        })
    }

    /// Conversation between two users, oldest first.
    pub fn get_direct_messages(
        &self,
        username: &str,
        other: &str,
        start: u32,
        count: u32,
    ) -> Result<Vec<DirectMessage>> {
        self.with_conn(|conn| {
            let user = query_user_by_username(conn, username)?
                .ok_or_else(|| DbError::not_found(format!("user '{username}' not found")))?;
            let peer = query_user_by_username(conn, other)?
                .ok_or_else(|| DbError::not_found(format!("user '{other}' not found")))?;

            let mut stmt = conn.prepare(
                "SELECT dm.id, dm.sender_id, dm.recipient_id, s.username, r.username, dm.content, dm.created_at
                 FROM direct_messages dm
                 JOIN users s ON s.id = dm.sender_id
                 JOIN users r ON r.id = dm.recipient_id
                 WHERE (dm.sender_id = ?1 AND dm.recipient_id = ?2)
                    OR (dm.sender_id = ?2 AND dm.recipient_id = ?1)
                 ORDER BY dm.created_at ASC, dm.id ASC
                 LIMIT ?3 OFFSET ?4",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user.id, peer.id, count, start], |row| {
                    Ok(DirectMessage {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        recipient_id: row.get(2)?,
                        sender_name: row.get(3)?,
                        recipient_name: row.get(4)?,
                        content: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Usernames `username` has exchanged messages with, alphabetically.
    pub fn get_chat_peers(&self, username: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let user = query_user_by_username(conn, username)?
                .ok_or_else(|| DbError::not_found(format!("user '{username}' not found")))?;

            let mut stmt = conn.prepare(
                "SELECT DISTINCT u.username
                 FROM direct_messages dm
                 JOIN users u ON u.id = CASE
                     WHEN dm.sender_id = ?1 THEN dm.recipient_id
                     ELSE dm.sender_id
                 END
                 WHERE dm.sender_id = ?1 OR dm.recipient_id = ?1
                 ORDER BY u.username COLLATE NOCASE ASC",
            )?;

            let peers = stmt
                .query_map([user.id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(peers)
        })
    }
}
