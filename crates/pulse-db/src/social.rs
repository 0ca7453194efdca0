use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::users::query_user_by_username;
use crate::{Database, DbError, Result};

impl Database {
    // -- Posts --

    pub fn create_post(&self, user_id: i64, content: &str) -> Result<i64> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DbError::Invalid("post content is required".into()));
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (user_id, content, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, content, Utc::now()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Record a like. Returns the post owner's id so the caller can notify them.
    pub fn like_post(&self, user_id: i64, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let owner = query_post_owner(conn, post_id)?
                .ok_or_else(|| DbError::not_found(format!("post {post_id} not found")))?;
            conn.execute(
                "INSERT INTO post_likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, post_id, Utc::now()],
            )
            .map_err(|e| DbError::conflict_on_constraint(e, format!("post {post_id} already liked")))?;
            Ok(owner)
        })
    }

    /// Remove a like. Returns the post owner's id.
    pub fn unlike_post(&self, user_id: i64, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let owner = query_post_owner(conn, post_id)?
                .ok_or_else(|| DbError::not_found(format!("post {post_id} not found")))?;
            let removed = conn.execute(
                "DELETE FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
                [user_id, post_id],
            )?;
            if removed == 0 {
                return Err(DbError::not_found(format!("post {post_id} is not liked")));
            }
            Ok(owner)
        })
    }

    // -- Follows --

    /// Follow `followed` (a username). Returns the followed user's id.
    pub fn follow_user(&self, follower_id: i64, followed: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let target = query_user_by_username(conn, followed)?
                .ok_or_else(|| DbError::not_found(format!("user '{followed}' not found")))?;
            if target.id == follower_id {
                return Err(DbError::Invalid("cannot follow yourself".into()));
            }
            conn.execute(
                "INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![follower_id, target.id, Utc::now()],
            )
            .map_err(|e| {
                DbError::conflict_on_constraint(e, format!("already following '{}'", target.username))
            })?;
            Ok(target.id)
        })
    }

    /// Returns the unfollowed user's id.
    pub fn unfollow_user(&self, follower_id: i64, followed: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let target = query_user_by_username(conn, followed)?
                .ok_or_else(|| DbError::not_found(format!("user '{followed}' not found")))?;
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                [follower_id, target.id],
            )?;
            if removed == 0 {
                return Err(DbError::not_found(format!("not following '{}'", target.username)));
            }
            Ok(target.id)
        })
    }
}

fn query_post_owner(conn: &Connection, post_id: i64) -> Result<Option<i64>> {
    let owner = conn
        .query_row("SELECT user_id FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
        .optional()?;
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_and_unlike_report_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "x").unwrap().id;
        let bob = db.create_user("bob", "x").unwrap().id;
        let post = db.create_post(bob, "shipping it").unwrap();

        assert_eq!(db.like_post(alice, post).unwrap(), bob);
        assert!(matches!(db.like_post(alice, post), Err(DbError::Conflict(_))));
        assert_eq!(db.unlike_post(alice, post).unwrap(), bob);
        assert!(matches!(db.unlike_post(alice, post), Err(DbError::NotFound(_))));
        assert!(matches!(db.like_post(alice, 999), Err(DbError::NotFound(_))));
    }

    #[test]
    fn follow_rules() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "x").unwrap().id;
        let bob = db.create_user("bob", "x").unwrap().id;

        assert_eq!(db.follow_user(alice, "BOB").unwrap(), bob);
        assert!(matches!(db.follow_user(alice, "bob"), Err(DbError::Conflict(_))));
        assert!(matches!(db.follow_user(alice, "alice"), Err(DbError::Invalid(_))));
        assert_eq!(db.unfollow_user(alice, "bob").unwrap(), bob);
        assert!(matches!(db.unfollow_user(alice, "bob"), Err(DbError::NotFound(_))));
    }
}
