//! Avatar store against a live PostgreSQL. Set `DATABASE_URL` to run;
//! without it every test returns immediately.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::TryStreamExt;
use profile_db::{Avatar, AvatarFilter, AvatarStore, Media, ObjectId, PgAvatarStore};
use sqlx::postgres::PgPoolOptions;

async fn store() -> Option<PgAvatarStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    profile_db::migrate::migrate(&pool)
        .await
        .expect("Failed to run migrations");
    Some(PgAvatarStore::new(pool))
}

fn fresh_owner(salt: u32) -> ObjectId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;
    ObjectId::parse(&format!("{:08x}{:016x}", salt, nanos)).unwrap()
}

fn avatar(owner: &ObjectId, primary: Option<&str>, hashes: &[&str]) -> Avatar {
    Avatar {
        owner: owner.clone(),
        primary: primary.map(str::to_string),
        medias: hashes
            .iter()
            .map(|h| Media::new(*h, format!("bin/{h}")))
            .collect(),
    }
}

#[tokio::test]
async fn test_save_twice_orders_newest_first() {
    let Some(store) = store().await else { return };
    let owner = fresh_owner(1);

    store.save(&avatar(&owner, Some("a"), &["a", "b"])).await.unwrap();
    let saved = store
        .save(&avatar(&owner, Some("c"), &["c", "a"]))
        .await
        .unwrap();

    let hashes: Vec<&str> = saved.medias.iter().map(|m| m.hash.as_str()).collect();
    assert_eq!(hashes, vec!["c", "a", "b"]);
    assert_eq!(saved.primary.as_deref(), Some("c"));
}

#[tokio::test]
async fn test_remove_keeps_primary_pointer() {
    let Some(store) = store().await else { return };
    let owner = fresh_owner(2);

    store.save(&avatar(&owner, Some("h1"), &["h1"])).await.unwrap();
    let after = store.remove_by_hash(&owner, "h1").await.unwrap().unwrap();
    assert!(after.medias.is_empty());
    assert_eq!(after.primary.as_deref(), Some("h1"));

    let again = store.remove_by_hash(&owner, "h1").await.unwrap().unwrap();
    assert_eq!(again, after);
}

#[tokio::test]
async fn test_concurrent_saves_lose_nothing() {
    let Some(store) = store().await else { return };
    let store = Arc::new(store);
    let owner = fresh_owner(3);

    let mut handles = Vec::new();
    for i in 0..12 {
        let store = store.clone();
        let owner = owner.clone();
        handles.push(tokio::spawn(async move {
            let hash = format!("h{i}");
            store
                .save(&avatar(&owner, Some(&hash), &[hash.as_str()]))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = store.get_by_owner(&owner).await.unwrap().unwrap();
    assert_eq!(stored.medias.len(), 12);
}

#[tokio::test]
async fn test_search_by_owner_set() {
    let Some(store) = store().await else { return };
    let first = fresh_owner(4);
    let second = fresh_owner(5);
    store.save(&avatar(&first, None, &["x"])).await.unwrap();
    store.save(&avatar(&second, Some("y"), &["y"])).await.unwrap();

    let found: Vec<Avatar> = store
        .search(
            AvatarFilter::And(vec![
                AvatarFilter::OwnerIn(vec![first.clone(), second.clone()]),
                AvatarFilter::HasPrimary(true),
            ]),
            None,
            Some(10),
        )
        .try_collect()
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].owner, second);
}

#[tokio::test]
async fn test_set_primary_if_skips_changed_pointer() {
    let Some(store) = store().await else { return };
    let owner = fresh_owner(6);

    store.save(&avatar(&owner, Some("h1"), &["h2", "h1"])).await.unwrap();
    store.remove_by_hash(&owner, "h1").await.unwrap();

    let kept = store
        .set_primary_if(&owner, Some("h7"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kept.primary.as_deref(), Some("h1"));

    let fixed = store
        .set_primary_if(&owner, Some("h1"), Some("h2".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fixed.primary.as_deref(), Some("h2"));
    assert_eq!(fixed.medias.len(), 1);
}

#[tokio::test]
async fn test_negative_limit_returns_no_rows() {
    let Some(store) = store().await else { return };
    let owner = fresh_owner(7);
    store.save(&avatar(&owner, None, &["x"])).await.unwrap();

    let found: Vec<Avatar> = store
        .search(AvatarFilter::OwnerIn(vec![owner]), None, Some(-1))
        .try_collect()
        .await
        .unwrap();
    assert!(found.is_empty());
}
