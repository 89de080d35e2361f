use super::test_store;
use super::SenderType;
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_user_upsert_preserves_present_name() {
    let store = test_store().await;

    let first = store
        .upsert_user("1234@lid", Some("Ana"), Some("5511988887777"))
        .await
        .unwrap();
    assert_eq!(first.name.as_deref(), Some("Ana"));

    // A later event without a push name must not blank the stored one.
    let second = store.upsert_user("1234@lid", None, None).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name.as_deref(), Some("Ana"));
    assert_eq!(second.phone_number.as_deref(), Some("5511988887777"));

    // A new name does refresh the row.
    let third = store
        .upsert_user("1234@lid", Some("Ana Maria"), None)
        .await
        .unwrap();
    assert_eq!(third.name.as_deref(), Some("Ana Maria"));
}

#[tokio::test]
async fn test_group_upsert_is_idempotent() {
    let store = test_store().await;
    let a = store.upsert_group("12036300000@g.us").await.unwrap();
    let b = store.upsert_group("12036300000@g.us").await.unwrap();
    assert_eq!(a.id, b.id);
    assert!(a.name.is_none());

    store
        .set_group_info(a.id, "Futebol de quinta", Some("pelada semanal"))
        .await
        .unwrap();
    let c = store.upsert_group("12036300000@g.us").await.unwrap();
    assert_eq!(c.name.as_deref(), Some("Futebol de quinta"));
}

#[tokio::test]
async fn test_message_upsert_converges_on_latest_content() {
    let store = test_store().await;
    let user = store.upsert_user("u1", Some("Ana"), None).await.unwrap();
    let now = Utc::now();

    store
        .upsert_message("MSG-1", user.id, None, "[audio]", now)
        .await
        .unwrap();
    store
        .upsert_message("MSG-1", user.id, None, "the actual transcript", now)
        .await
        .unwrap();

    let stored = store.find_message("MSG-1").await.unwrap().unwrap();
    assert_eq!(stored.content.as_deref(), Some("the actual transcript"));

    // Exactly one row for the id.
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE message_id = 'MSG-1'")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn test_whitelist_roundtrip() {
    let store = test_store().await;
    assert!(!store.is_whitelisted(SenderType::User, 7).await.unwrap());

    store.add_to_whitelist(SenderType::User, 7).await.unwrap();
    assert!(store.is_whitelisted(SenderType::User, 7).await.unwrap());
    // User and group namespaces are independent.
    assert!(!store.is_whitelisted(SenderType::Group, 7).await.unwrap());

    assert!(store
        .remove_from_whitelist(SenderType::User, 7)
        .await
        .unwrap());
    assert!(!store.is_whitelisted(SenderType::User, 7).await.unwrap());
}

#[tokio::test]
async fn test_reminder_lifecycle_fires_at_most_once() {
    let store = test_store().await;
    store.upsert_user("u1", None, None).await.unwrap();
    let past = Utc::now() - Duration::minutes(5);
    let future = Utc::now() + Duration::days(1);

    let due = store
        .create_reminder(Some(1), None, "5511988887777", past, "pay the rent")
        .await
        .unwrap();
    store
        .create_reminder(Some(1), None, "5511988887777", future, "dentist")
        .await
        .unwrap();

    let fired = store.due_reminders(Utc::now()).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, due.id);

    // First delivery wins; the second attempt sees an already-deleted row.
    assert!(store.soft_delete_reminder(&due.id).await.unwrap());
    assert!(!store.soft_delete_reminder(&due.id).await.unwrap());
    assert!(store.due_reminders(Utc::now()).await.unwrap().is_empty());

    let pending = store.pending_reminders().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message, "dentist");
}

#[tokio::test]
async fn test_consumption_aggregates_by_model() {
    let store = test_store().await;
    store.upsert_user("u1", None, None).await.unwrap();
    store.upsert_user("u2", None, None).await.unwrap();
    store
        .log_interaction(Some(1), None, "conversation", "model-a", 100, 50)
        .await
        .unwrap();
    store
        .log_interaction(Some(1), None, "intent-classifier", "model-b", 30, 5)
        .await
        .unwrap();
    store
        .log_interaction(Some(2), None, "conversation", "model-a", 999, 999)
        .await
        .unwrap();

    let report = store
        .consumption_since(Some(1), None, Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(report.total_interactions, 2);
    assert_eq!(report.prompt_tokens, 130);
    assert_eq!(report.completion_tokens, 55);
    assert_eq!(report.by_model.len(), 2);
}

#[tokio::test]
async fn test_favorites_and_gallery() {
    let store = test_store().await;
    let user = store.upsert_user("u1", Some("Ana"), None).await.unwrap();
    let group = store.upsert_group("g1").await.unwrap();
    let now = Utc::now();

    store
        .upsert_message("IMG-1", user.id, Some(group.id), "a sunset", now)
        .await
        .unwrap();
    store
        .record_media("IMG-1", user.id, Some(group.id), "image", Some("a sunset"))
        .await
        .unwrap();

    assert!(store.set_favorite("IMG-1", true).await.unwrap());
    assert!(!store.set_favorite("NOPE", true).await.unwrap());

    let favs = store.favorites(user.id, Some(group.id), 10).await.unwrap();
    assert_eq!(favs.len(), 1);
    assert!(favs[0].is_favorite);

    let all = store
        .list_media(user.id, Some(group.id), None, 10)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let hits = store
        .list_media(user.id, Some(group.id), Some("sunset"), 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let misses = store
        .list_media(user.id, Some(group.id), Some("dog"), 10)
        .await
        .unwrap();
    assert!(misses.is_empty());
}
