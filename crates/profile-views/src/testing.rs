//! Shared fixtures for the view tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use identity_client::{IdentityClient, IdentityError, IdentityRecord};
use profile_db::memory::{MemoryAvatarStore, MemoryFollowStore, MemoryProfileStore};
use profile_db::{Follow, FollowStatus, ObjectId};
use serde_json::json;

use crate::builder::ProfileViewBuilder;
use crate::collaborators::{Collaborators, StorageLinks, TrustList};
use crate::config::ViewConfig;

pub(crate) fn uid(n: u8) -> ObjectId {
    ObjectId::parse(&format!("{:024x}", n)).unwrap()
}

pub(crate) fn edge(id: u8, from: u8, to: u8, status: FollowStatus) -> Follow {
    Follow {
        id: ObjectId::parse(&format!("ee{:022x}", id)).unwrap(),
        outgoing: uid(from),
        incoming: uid(to),
        status,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, id as u32 % 60)
            .unwrap(),
    }
}

/// Identity provider double with call counting and injectable transient
/// failures
#[derive(Default)]
pub(crate) struct FakeIdentity {
    records: Mutex<Vec<IdentityRecord>>,
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl FakeIdentity {
    pub(crate) fn add(&self, uid: &ObjectId, username: &str, fullname: &str) {
        self.records.lock().unwrap().push(IdentityRecord {
            uid: uid.to_string(),
            username: username.to_string(),
            fullname: fullname.to_string(),
            email: None,
            mobile: Some(json!({"country_code": "+1", "number": "5550100"})),
        });
    }

    /// Make the next `n` calls fail with a transient error
    pub(crate) fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(IdentityError::Transient("connection reset".to_string()));
        }
        Ok(())
    }

    fn find(&self, pred: impl Fn(&IdentityRecord) -> bool) -> Option<Arc<IdentityRecord>> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| pred(r))
            .cloned()
            .map(Arc::new)
    }
}

#[async_trait]
impl IdentityClient for FakeIdentity {
    async fn get_by_username(&self, username: &str) -> identity_client::Result<Arc<IdentityRecord>> {
        self.enter()?;
        self.find(|r| r.username == username)
            .ok_or_else(|| IdentityError::NotFound(username.to_string()))
    }

    async fn get_by_uid(&self, uid: &str) -> identity_client::Result<Arc<IdentityRecord>> {
        self.enter()?;
        self.find(|r| r.uid == uid)
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))
    }

    async fn list_by_uids(
        &self,
        uids: &[String],
    ) -> identity_client::Result<HashMap<String, Arc<IdentityRecord>>> {
        self.enter()?;
        Ok(uids
            .iter()
            .filter_map(|uid| self.find(|r| &r.uid == uid).map(|r| (uid.clone(), r)))
            .collect())
    }
}

pub(crate) struct Fixture {
    pub(crate) identity: Arc<FakeIdentity>,
    pub(crate) profiles: Arc<MemoryProfileStore>,
    pub(crate) avatars: Arc<MemoryAvatarStore>,
    pub(crate) follows: Arc<MemoryFollowStore>,
    pub(crate) trusted: Vec<ObjectId>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            identity: Arc::new(FakeIdentity::default()),
            profiles: Arc::new(MemoryProfileStore::new()),
            avatars: Arc::new(MemoryAvatarStore::new()),
            follows: Arc::new(MemoryFollowStore::new()),
            trusted: Vec::new(),
        }
    }

    /// Service defaults with retry delays switched off
    pub(crate) fn config() -> ViewConfig {
        ViewConfig::from_lookup(|key| match key {
            "IDENTITY_RETRY_ATTEMPTS" => Some("3".to_string()),
            "IDENTITY_RETRY_BACKOFF_MS" => Some("0".to_string()),
            _ => None,
        })
    }

    pub(crate) fn builder(&self) -> ProfileViewBuilder {
        ProfileViewBuilder::new(
            Collaborators {
                identity: self.identity.clone(),
                profiles: self.profiles.clone(),
                avatars: self.avatars.clone(),
                follows: self.follows.clone(),
                trust: Arc::new(TrustList::new(self.trusted.clone())),
                links: Arc::new(StorageLinks::new("https://cdn.example.com")),
            },
            Self::config(),
        )
    }
}
