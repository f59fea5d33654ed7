//! Storage layer tests for the identity service.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use sekai_core::db::unix_timestamp;

use super::DatabaseError;
use super::db::{CredentialStore, IdentityDatabase};
use super::models::NewCredential;

async fn test_store() -> CredentialStore {
    CredentialStore::open_in_memory().await.unwrap()
}

fn alice_session<'a>(access: &'a str, refresh: &'a str) -> NewCredential<'a> {
    NewCredential {
        player_id: "p1",
        role_code: 1,
        access_token: access,
        refresh_token: refresh,
    }
}

// === Credential tests ===

#[tokio::test]
async fn insert_and_find_by_id() {
    let store = test_store().await;
    let id = store.insert(&alice_session("a1", "r1")).await.unwrap();

    let credential = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(credential.id, id);
    assert_eq!(credential.player_id, "p1");
    assert_eq!(credential.role_code, 1);
    assert_eq!(credential.access_token, "a1");
    assert_eq!(credential.refresh_token, "r1");
    assert_eq!(credential.created_at, credential.updated_at);
}

#[tokio::test]
async fn each_login_gets_its_own_record() {
    let store = test_store().await;
    let first = store.insert(&alice_session("a1", "r1")).await.unwrap();
    let second = store.insert(&alice_session("a2", "r2")).await.unwrap();

    assert_ne!(first, second);
    assert!(store.find_by_id(&first).await.unwrap().is_some());
    assert!(store.find_by_id(&second).await.unwrap().is_some());
}

#[tokio::test]
async fn find_by_id_absent_is_none() {
    let store = test_store().await;
    assert!(store.find_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn find_by_access_token() {
    let store = test_store().await;
    let id = store.insert(&alice_session("a1", "r1")).await.unwrap();

    let found = store.find_by_access_token("a1").await.unwrap();
    assert_eq!(found.id, id);

    let err = store.find_by_access_token("a-unknown").await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn update_tokens_replaces_pair_in_place() {
    let store = test_store().await;
    let id = store.insert(&alice_session("a1", "r1")).await.unwrap();
    let later = unix_timestamp() + 100;

    store
        .update_tokens(&id, "p1", "a2", "r2", later)
        .await
        .unwrap();

    let credential = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(credential.access_token, "a2");
    assert_eq!(credential.refresh_token, "r2");
    assert_eq!(credential.updated_at, later);
    assert_eq!(credential.role_code, 1);

    // The superseded access token no longer resolves.
    assert!(store.find_by_access_token("a1").await.is_err());
}

#[tokio::test]
async fn update_missing_record_fails() {
    let store = test_store().await;
    let err = store
        .update_tokens("missing", "p1", "a", "r", unix_timestamp())
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn delete_once_then_fail() {
    let store = test_store().await;
    let id = store.insert(&alice_session("a1", "r1")).await.unwrap();

    assert_eq!(store.delete(&id).await.unwrap(), 1);
    assert!(store.find_by_id(&id).await.unwrap().is_none());
    assert!(store.find_by_access_token("a1").await.is_err());

    let err = store.delete(&id).await.unwrap_err();
    assert!(matches!(err, DatabaseError::NotFound(_)));
}

// === Role tests ===

#[tokio::test]
async fn role_catalog_is_seeded() {
    let store = test_store().await;
    assert_eq!(store.count_roles().await.unwrap(), 2);

    let roles = store.list_roles().await.unwrap();
    let titles: Vec<_> = roles.iter().map(|r| (r.code, r.title.as_str())).collect();
    assert_eq!(titles, vec![(0, "player"), (1, "admin")]);
}

// === On-disk database ===

#[tokio::test]
async fn reopening_keeps_records_and_seeds_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("identity.db");

    let id = {
        let db = IdentityDatabase::open(&path).await.unwrap();
        let store = CredentialStore::new(db, Duration::from_secs(5));
        store.insert(&alice_session("a1", "r1")).await.unwrap()
    };

    let db = IdentityDatabase::open(&path).await.unwrap();
    let store = CredentialStore::new(db, Duration::from_secs(5));
    assert!(store.find_by_id(&id).await.unwrap().is_some());
    assert_eq!(store.count_roles().await.unwrap(), 2);
}

#[tokio::test]
async fn on_disk_database_uses_wal() {
    let dir = tempfile::tempdir().unwrap();
    let db = IdentityDatabase::open(&dir.path().join("identity.db"))
        .await
        .unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(mode, "wal");
}
