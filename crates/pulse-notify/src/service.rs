use std::sync::Arc;

use tracing::debug;

use pulse_db::Database;
use pulse_types::models::{Notification, NotificationRef};

use crate::Result;
use crate::dispatcher::PushDispatcher;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Notification),
    /// Actor and recipient are the same user; nothing was stored.
    Suppressed,
}

impl CreateOutcome {
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            Self::Created(n) => Some(n),
            Self::Suppressed => None,
        }
    }
}

/// Records notifications and fans them out to the recipient's devices.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<Database>,
    push: PushDispatcher,
}

impl NotificationService {
    pub fn new(db: Arc<Database>, push: PushDispatcher) -> Self {
        Self { db, push }
    }

    /// Store a notification for `reference.recipient_id` and start a push in
    /// the background. `text` is the phrase following the actor's name, e.g.
    /// "liked your post".
    ///
    /// Returns once the row is written; push delivery is detached and its
    /// errors are only logged.
    pub async fn create(&self, reference: NotificationRef, text: &str) -> Result<CreateOutcome> {
        if reference.is_self_action() {
            debug!(user_id = reference.recipient_id, kind = %reference.kind, "Suppressed self notification");
            return Ok(CreateOutcome::Suppressed);
        }

        let notification = self
            .db
            .blocking(move |db| db.insert_notification(&reference))
            .await?;

        let body = notification_body(&notification.actor_name, text);
        self.push
            .spawn_dispatch(notification.user_id, notification.clone(), body);

        Ok(CreateOutcome::Created(notification))
    }

    /// Remove the notification an action created, once that action is undone.
    /// Returns how many rows matched.
    pub async fn delete_by_reference(&self, reference: NotificationRef) -> Result<usize> {
        let removed = self
            .db
            .blocking(move |db| db.delete_notification_by_reference(&reference))
            .await?;
        Ok(removed)
    }
}

/// Push body text: "<actor> <text>", or just `text` without an actor name.
pub fn notification_body(actor_name: &str, text: &str) -> String {
    let actor_name = actor_name.trim();
    if actor_name.is_empty() {
        text.to_string()
    } else {
        format!("{actor_name} {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PushConfig;
    use pulse_db::DbError;
    use pulse_types::models::NotificationKind;

    use crate::NotifyError;

    struct Fixture {
        db: Arc<Database>,
        service: NotificationService,
        alice: i64,
        bob: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let alice = db.create_user("alice", "x").unwrap().id;
        let bob = db.create_user("bob", "x").unwrap().id;
        let push = PushDispatcher::new(Arc::clone(&db), PushConfig::default()).unwrap();
        Fixture {
            service: NotificationService::new(Arc::clone(&db), push),
            db,
            alice,
            bob,
        }
    }

    #[test]
    fn body_text() {
        assert_eq!(notification_body("alice", "liked your post"), "alice liked your post");
        assert_eq!(notification_body("", "liked your post"), "liked your post");
        assert_eq!(notification_body("  ", "followed you"), "followed you");
    }

    #[tokio::test]
    async fn self_actions_are_suppressed() {
        let f = fixture();
        let reference = NotificationRef::new(f.alice, f.alice, NotificationKind::LikePost).with_post(1);

        let outcome = f.service.create(reference, "liked your post").await.unwrap();
        assert_eq!(outcome, CreateOutcome::Suppressed);
        assert!(f.db.get_notifications(f.alice, 0, 50).unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_returns_populated_notification() {
        let f = fixture();
        let reference = NotificationRef::new(f.bob, f.alice, NotificationKind::FollowUser);

        let outcome = f.service.create(reference, "followed you").await.unwrap();
        let created = outcome.notification().unwrap();
        assert_eq!(created.user_id, f.bob);
        assert_eq!(created.actor_name, "alice");
        assert_eq!(created.kind, NotificationKind::FollowUser);
        assert!(created.read_at.is_none());
        assert_eq!(f.db.unread_notification_count(f.bob).unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_actor_is_a_typed_failure() {
        let f = fixture();
        let reference = NotificationRef::new(f.bob, 404, NotificationKind::FollowUser);

        let err = f.service.create(reference, "followed you").await.unwrap_err();
        assert!(matches!(err, NotifyError::Db(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_by_reference_only_touches_the_matching_row() {
        let f = fixture();
        let liked = NotificationRef::new(f.bob, f.alice, NotificationKind::LikePost).with_post(1);
        let other_post = NotificationRef::new(f.bob, f.alice, NotificationKind::LikePost).with_post(2);
        f.service.create(liked.clone(), "liked your post").await.unwrap();
        f.service.create(other_post, "liked your post").await.unwrap();

        assert_eq!(f.service.delete_by_reference(liked.clone()).await.unwrap(), 1);
        assert_eq!(f.service.delete_by_reference(liked).await.unwrap(), 0);

        let left = f.db.get_notifications(f.bob, 0, 50).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].post_id, Some(2));
    }
}
