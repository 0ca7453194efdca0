mod common;

use std::time::Duration;

use serde_json::{Value, json};

use pulse_types::api::{PostCreated, UnreadCount};
use pulse_types::models::{Notification, NotificationKind};

#[tokio::test]
async fn like_then_unlike_round_trip() {
    let server = common::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    server
        .post_json(
            "/notifications/push-token",
            &bob.token,
            json!({"token": "ExponentPushToken[bob-phone]", "platform": "android"}),
        )
        .await;

    let post: PostCreated = server
        .post_json("/posts", &bob.token, json!({"content": "first post"}))
        .await
        .json()
        .await
        .unwrap();

    let resp = server.post(&format!("/posts/alice/likes/{}", post.id), &alice.token).await;
    assert_eq!(resp.status(), 200);

    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert_eq!(notifications.len(), 1);
    let liked = &notifications[0];
    assert_eq!(liked.kind, NotificationKind::LikePost);
    assert_eq!(liked.post_id, Some(post.id));
    assert_eq!(liked.actor_id, alice.user_id);
    assert_eq!(liked.actor_name, "alice");

    let pushes = server.push.wait_for(1).await;
    assert_eq!(pushes[0]["to"], "ExponentPushToken[bob-phone]");
    assert_eq!(pushes[0]["title"], "Pulse");
    assert_eq!(pushes[0]["body"], "alice liked your post");
    assert_eq!(pushes[0]["data"]["type"], "like_post");
    assert_eq!(pushes[0]["data"]["post_id"], post.id);

    let resp = server.post(&format!("/posts/alice/unlikes/{}", post.id), &alice.token).await;
    assert_eq!(resp.status(), 200);

    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn liking_own_post_is_silent() {
    let server = common::spawn().await;
    let bob = server.register("bob").await;
    server
        .post_json(
            "/notifications/push-token",
            &bob.token,
            json!({"token": "ExpoPushToken[bob]", "platform": "ios"}),
        )
        .await;

    let post: PostCreated = server
        .post_json("/posts", &bob.token, json!({"content": "mine"}))
        .await
        .json()
        .await
        .unwrap();
    let resp = server.post(&format!("/posts/bob/likes/{}", post.id), &bob.token).await;
    assert_eq!(resp.status(), 200);

    let count: UnreadCount = server.get("/notifications/unread-count", &bob.token).await.json().await.unwrap();
    assert_eq!(count.count, 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.push.requests().is_empty());
}

#[tokio::test]
async fn like_conflicts_and_missing_likes() {
    let server = common::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let post: PostCreated = server
        .post_json("/posts", &bob.token, json!({"content": "x"}))
        .await
        .json()
        .await
        .unwrap();

    let path = format!("/posts/alice/likes/{}", post.id);
    assert_eq!(server.post(&path, &alice.token).await.status(), 200);
    assert_eq!(server.post(&path, &alice.token).await.status(), 409);

    let unlike = format!("/posts/alice/unlikes/{}", post.id);
    assert_eq!(server.post(&unlike, &alice.token).await.status(), 200);
    assert_eq!(server.post(&unlike, &alice.token).await.status(), 404);

    assert_eq!(server.post("/posts/alice/likes/9999", &alice.token).await.status(), 404);
    assert_eq!(server.post(&path, &bob.token).await.status(), 403);
}

#[tokio::test]
async fn follow_notification_lifecycle() {
    let server = common::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    assert_eq!(server.post("/users/alice/follow/bob", &alice.token).await.status(), 200);
    assert_eq!(server.post("/users/alice/follow/bob", &alice.token).await.status(), 409);
    assert_eq!(server.post("/users/alice/follow/alice", &alice.token).await.status(), 400);

    let count: UnreadCount = server.get("/notifications/unread-count", &bob.token).await.json().await.unwrap();
    assert_eq!(count.count, 1);

    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert_eq!(notifications[0].kind, NotificationKind::FollowUser);
    let id = notifications[0].id;

    // Someone else's notification is invisible.
    assert_eq!(server.post(&format!("/notifications/{id}/read"), &alice.token).await.status(), 404);
    assert_eq!(server.post(&format!("/notifications/{id}/read"), &bob.token).await.status(), 200);

    let count: UnreadCount = server.get("/notifications/unread-count", &bob.token).await.json().await.unwrap();
    assert_eq!(count.count, 0);

    assert_eq!(server.post("/users/alice/unfollow/bob", &alice.token).await.status(), 200);
    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn delete_and_clear_notifications() {
    let server = common::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;
    let carol = server.register("carol").await;

    server.post("/users/alice/follow/bob", &alice.token).await;
    server.post("/users/carol/follow/bob", &carol.token).await;

    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert_eq!(notifications.len(), 2);

    let first = notifications[0].id;
    assert_eq!(server.delete(&format!("/notifications/{first}"), &alice.token).await.status(), 404);
    assert_eq!(server.delete(&format!("/notifications/{first}"), &bob.token).await.status(), 200);
    assert_eq!(server.delete(&format!("/notifications/{first}"), &bob.token).await.status(), 404);

    assert_eq!(server.delete("/notifications", &bob.token).await.status(), 200);
    let notifications: Vec<Notification> = server.get("/notifications", &bob.token).await.json().await.unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn push_token_registration_rules() {
    let server = common::spawn().await;
    let alice = server.register("alice").await;
    let bob = server.register("bob").await;

    let cases = [
        (json!({"token": "abc123", "platform": "ios"}), 400),
        (json!({"token": "  ", "platform": "ios"}), 400),
        (json!({"token": "ExpoPushToken[x]", "platform": ""}), 400),
        (json!({"token": " ExpoPushToken[shared] ", "platform": "IOS"}), 200),
    ];
    for (body, status) in cases {
        let resp = server.post_json("/notifications/push-token", &bob.token, body.clone()).await;
        assert_eq!(resp.status(), status, "{body}");
    }

    let tokens = server.state.db.get_push_tokens(bob.user_id).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, "ExpoPushToken[shared]");
    assert_eq!(tokens[0].platform, "ios");

    // The same device signing in as someone else moves the token.
    let resp = server
        .post_json(
            "/notifications/push-token",
            &alice.token,
            json!({"token": "ExpoPushToken[shared]", "platform": "ios"}),
        )
        .await;
    assert_eq!(resp.status(), 200);
    assert!(server.state.db.get_push_tokens(bob.user_id).unwrap().is_empty());
    assert_eq!(server.state.db.get_push_tokens(alice.user_id).unwrap().len(), 1);
}

#[tokio::test]
async fn notification_routes_require_auth() {
    let server = common::spawn().await;

    let resp = server.http.get(server.url("/notifications")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let resp = server.get("/notifications", "garbage").await;
    assert_eq!(resp.status(), 401);
}
