use chrono::Utc;
use rusqlite::OptionalExtension;
use rusqlite::types::Type;
use pulse_types::models::{Notification, NotificationKind, NotificationRef};

use crate::{Database, DbError, Result};

impl Database {
    // -- Notifications --

    /// Insert a notification and return it with the actor's display identity.
    ///
    /// Does not apply self-action suppression; callers go through the
    /// notification service for that.
    pub fn insert_notification(&self, reference: &NotificationRef) -> Result<Notification> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (actor_name, actor_picture): (String, String) = tx
                .query_row(
                    "SELECT username, picture FROM users WHERE id = ?1",
                    [reference.actor_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| DbError::not_found(format!("actor {} not found", reference.actor_id)))?;

            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO notifications
                    (user_id, actor_id, type, post_id, project_id, comment_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    reference.recipient_id,
                    reference.actor_id,
                    reference.kind.as_str(),
                    reference.post_id,
                    reference.project_id,
                    reference.comment_id,
                    created_at,
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok(Notification {
                id,
                user_id: reference.recipient_id,
                actor_id: reference.actor_id,
                actor_name,
                actor_picture,
                kind: reference.kind,
                post_id: reference.post_id,
                project_id: reference.project_id,
                comment_id: reference.comment_id,
                created_at,
                read_at: None,
            })
        })
    }

    /// Newest first.
    pub fn get_notifications(&self, user_id: i64, start: u32, count: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.user_id, n.actor_id, u.username, u.picture, n.type,
                        n.post_id, n.project_id, n.comment_id, n.created_at, n.read_at
                 FROM notifications n
                 JOIN users u ON u.id = n.actor_id
                 WHERE n.user_id = ?1
                 ORDER BY n.created_at DESC, n.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, count, start], |row| {
                    Ok(Notification {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        actor_id: row.get(2)?,
                        actor_name: row.get(3)?,
                        actor_picture: row.get(4)?,
                        kind: parse_kind(row, 5)?,
                        post_id: row.get(6)?,
                        project_id: row.get(7)?,
                        comment_id: row.get(8)?,
                        created_at: row.get(9)?,
                        read_at: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn unread_notification_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read_at IS NULL",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn mark_notification_read(&self, user_id: i64, notification_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET read_at = ?1 WHERE id = ?2 AND user_id = ?3",
                rusqlite::params![Utc::now(), notification_id, user_id],
            )?;
            if changed == 0 {
                return Err(DbError::not_found("notification not found"));
            }
            Ok(())
        })
    }

    pub fn delete_notification(&self, user_id: i64, notification_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                [notification_id, user_id],
            )?;
            if changed == 0 {
                return Err(DbError::not_found("notification not found"));
            }
            Ok(())
        })
    }

    /// Delete every notification for `user_id`. Returns how many were removed.
    pub fn clear_notifications(&self, user_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])?;
            Ok(removed)
        })
    }

    /// Delete the notification(s) matching the full reference tuple. `IS`
    /// makes a `None` reference match only `NULL` columns.
    pub fn delete_notification_by_reference(&self, reference: &NotificationRef) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM notifications
                 WHERE user_id = ?1 AND actor_id = ?2 AND type = ?3
                   AND post_id IS ?4 AND project_id IS ?5 AND comment_id IS ?6",
                rusqlite::params![
                    reference.recipient_id,
                    reference.actor_id,
                    reference.kind.as_str(),
                    reference.post_id,
                    reference.project_id,
                    reference.comment_id,
                ],
            )?;
            Ok(removed)
        })
    }
}

fn parse_kind(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NotificationKind> {
    let tag: String = row.get(idx)?;
    tag.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
