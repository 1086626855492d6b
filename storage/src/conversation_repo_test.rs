//! Unit tests for ConversationRepository.
//!
//! Covers upsert idempotence, append on unknown users, history ordering/limit, and window
//! admission against an in-memory SQLite database.

use chrono::{Duration, Utc};
use relay_core::{HistoryEntry, Role};

use crate::conversation_repo::ConversationRepository;
use crate::error::StorageError;
use crate::models::WindowPolicy;
use crate::store::ConversationStore;

async fn test_repo() -> ConversationRepository {
    ConversationRepository::new("sqlite::memory:")
        .await
        .expect("Failed to create repository")
}

#[tokio::test]
async fn test_upsert_user_is_idempotent() {
    let repo = test_repo().await;

    repo.upsert_user("U1").await.expect("first upsert");
    let first = repo.get_user("U1").await.unwrap().expect("user exists");
    repo.upsert_user("U1").await.expect("second upsert");
    let second = repo.get_user("U1").await.unwrap().expect("user exists");

    assert_eq!(first.id, second.id);
    assert_eq!(second.message_count, 0);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.created_at, first.created_at);
}

#[tokio::test]
async fn test_append_unknown_user_is_not_found() {
    let repo = test_repo().await;

    let err = repo
        .append("missing", Role::User, "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_recent_history_unknown_user_is_empty() {
    let repo = test_repo().await;

    let history = repo.recent_history("nobody", 10).await.expect("query");

    assert!(history.is_empty());
}

#[tokio::test]
async fn test_recent_history_returns_last_n_oldest_first() {
    let repo = test_repo().await;
    repo.upsert_user("U1").await.unwrap();

    for i in 0..15 {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        repo.append("U1", role, &format!("Message {}", i))
            .await
            .expect("Failed to save message");
    }

    let history = repo.recent_history("U1", 10).await.expect("history");

    assert_eq!(history.len(), 10);
    let expected: Vec<HistoryEntry> = (5..15)
        .map(|i| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            HistoryEntry::new(role, format!("Message {}", i))
        })
        .collect();
    assert_eq!(history, expected);
}

#[tokio::test]
async fn test_recent_history_is_per_user() {
    let repo = test_repo().await;
    repo.upsert_user("U1").await.unwrap();
    repo.upsert_user("U2").await.unwrap();

    repo.append("U1", Role::User, "from one").await.unwrap();
    repo.append("U2", Role::User, "from two").await.unwrap();

    let one = repo.recent_history("U1", 10).await.unwrap();
    let two = repo.recent_history("U2", 10).await.unwrap();

    assert_eq!(one, vec![HistoryEntry::user("from one")]);
    assert_eq!(two, vec![HistoryEntry::user("from two")]);
}

#[tokio::test]
async fn test_messages_for_user_keeps_roles_and_owner() {
    let repo = test_repo().await;
    repo.upsert_user("U1").await.unwrap();
    repo.append("U1", Role::User, "question").await.unwrap();
    repo.append("U1", Role::Assistant, "answer").await.unwrap();

    let user = repo.get_user("U1").await.unwrap().unwrap();
    let records = repo.messages_for_user("U1").await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.user_id == user.id));
    assert_eq!(records[0].role, Role::User);
    assert_eq!(records[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_try_admit_counts_up_to_ceiling_then_denies_without_increment() {
    let repo = test_repo().await;
    repo.upsert_user("U1").await.unwrap();
    let policy = WindowPolicy::new(3, Duration::days(3));
    let now = Utc::now();

    for expected in 1..=3 {
        let admission = repo.try_admit("U1", now, &policy).await.unwrap();
        assert!(admission.allowed);
        assert_eq!(admission.current_count, expected);
    }

    let denied = repo.try_admit("U1", now, &policy).await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.current_count, 3);
    let user = repo.get_user("U1").await.unwrap().unwrap();
    assert_eq!(user.message_count, 3);
}

#[tokio::test]
async fn test_try_admit_resets_expired_window() {
    let repo = test_repo().await;
    repo.upsert_user("U1").await.unwrap();
    let policy = WindowPolicy::new(2, Duration::hours(72));
    let start = Utc::now();

    repo.try_admit("U1", start, &policy).await.unwrap();
    repo.try_admit("U1", start, &policy).await.unwrap();
    assert!(!repo.try_admit("U1", start, &policy).await.unwrap().allowed);

    let later = start + Duration::hours(72);
    let admission = repo.try_admit("U1", later, &policy).await.unwrap();

    assert!(admission.allowed);
    assert_eq!(admission.current_count, 1);
    let user = repo.get_user("U1").await.unwrap().unwrap();
    assert_eq!(user.count_reset_at.timestamp_millis(), later.timestamp_millis());
}

#[tokio::test]
async fn test_try_admit_unknown_user_is_not_found() {
    let repo = test_repo().await;

    let err = repo
        .try_admit("ghost", Utc::now(), &WindowPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_close_makes_later_calls_fail() {
    let repo = test_repo().await;
    repo.close().await;

    let err = repo.upsert_user("U1").await.unwrap_err();

    assert!(matches!(err, StorageError::Database(_)));
}
