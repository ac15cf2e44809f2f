//! In-process store implementations with the same semantics as the
//! PostgreSQL stores. Each mutation runs under a single lock, mirroring the
//! single-row atomicity of the SQL statements.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::avatars::{dedup_medias, AvatarFilter, AvatarStore};
use crate::error::Result;
use crate::follows::{Endpoint, FollowStore};
use crate::ids::ObjectId;
use crate::profiles::ProfileStore;
use crate::types::{Avatar, Follow, FollowListOptions, FollowStatus, Profile};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryProfileStore {
    rows: Mutex<BTreeMap<ObjectId, Profile>>,
    queries: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read round-trips served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_one_by_uid(&self, uid: &ObjectId) -> Result<Option<Profile>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.rows).get(uid).cloned())
    }

    async fn find_all_by_uids(&self, uids: &[ObjectId]) -> Result<Vec<Profile>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = lock(&self.rows);
        Ok(uids.iter().filter_map(|uid| rows.get(uid).cloned()).collect())
    }

    async fn save(&self, profile: &Profile) -> Result<Profile> {
        lock(&self.rows).insert(profile.uid.clone(), profile.clone());
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct MemoryAvatarStore {
    rows: Mutex<BTreeMap<ObjectId, Avatar>>,
    queries: AtomicUsize,
}

impl MemoryAvatarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read round-trips served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvatarStore for MemoryAvatarStore {
    async fn get_by_owner(&self, owner: &ObjectId) -> Result<Option<Avatar>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.rows).get(owner).cloned())
    }

    async fn save(&self, avatar: &Avatar) -> Result<Avatar> {
        let mut rows = lock(&self.rows);
        let entry = rows
            .entry(avatar.owner.clone())
            .or_insert_with(|| Avatar::new(avatar.owner.clone()));

        let mut medias: Vec<_> = dedup_medias(&avatar.medias)
            .into_iter()
            .filter(|m| !entry.medias.contains(m))
            .collect();
        medias.append(&mut entry.medias);

        entry.medias = medias;
        entry.primary = avatar.primary.clone();
        Ok(entry.clone())
    }

    async fn remove_by_hash(&self, owner: &ObjectId, hash: &str) -> Result<Option<Avatar>> {
        let mut rows = lock(&self.rows);
        Ok(rows.get_mut(owner).map(|avatar| {
            avatar.medias.retain(|m| m.hash != hash);
            avatar.clone()
        }))
    }

    async fn set_primary_if(
        &self,
        owner: &ObjectId,
        expected: Option<&str>,
        new: Option<String>,
    ) -> Result<Option<Avatar>> {
        let mut rows = lock(&self.rows);
        Ok(rows.get_mut(owner).map(|avatar| {
            if avatar.primary.as_deref() == expected {
                avatar.primary = new;
            }
            avatar.clone()
        }))
    }

    fn search(
        &self,
        filter: AvatarFilter,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> BoxStream<'static, Result<Avatar>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let rows = lock(&self.rows);
        let take = limit.map_or(usize::MAX, |l| l.max(0) as usize);
        let page: Vec<Result<Avatar>> = rows
            .values()
            .rev()
            .filter(|a| cursor.as_ref().map_or(true, |c| a.owner < *c))
            .filter(|a| filter.matches(a))
            .take(take)
            .cloned()
            .map(Ok)
            .collect();
        stream::iter(page).boxed()
    }
}

#[derive(Default)]
pub struct MemoryFollowStore {
    edges: Mutex<Vec<Follow>>,
    queries: AtomicUsize,
}

impl MemoryFollowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge, replacing any existing edge for the same ordered pair
    pub fn insert(&self, follow: Follow) {
        let mut edges = lock(&self.edges);
        edges.retain(|e| !(e.outgoing == follow.outgoing && e.incoming == follow.incoming));
        edges.push(follow);
    }

    /// Number of round-trips served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn list(
        &self,
        endpoint: Endpoint,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let edges = lock(&self.edges);
        let mut page: Vec<Follow> = edges
            .iter()
            .filter(|e| match endpoint {
                Endpoint::Outgoing => e.outgoing == *user,
                Endpoint::Incoming => e.incoming == *user,
            })
            .filter(|e| {
                options
                    .statuses
                    .as_ref()
                    .map_or(true, |s| s.contains(&e.status))
            })
            .filter(|e| options.cursor.as_ref().map_or(true, |c| e.id < *c))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = options.limit {
            page.truncate(limit.max(0) as usize);
        }
        stream::iter(page.into_iter().map(Ok)).boxed()
    }

    fn count(&self, endpoint: Endpoint, user: &ObjectId, statuses: &[FollowStatus]) -> u64 {
        if statuses.is_empty() {
            return 0;
        }
        self.queries.fetch_add(1, Ordering::SeqCst);
        lock(&self.edges)
            .iter()
            .filter(|e| match endpoint {
                Endpoint::Outgoing => e.outgoing == *user,
                Endpoint::Incoming => e.incoming == *user,
            })
            .filter(|e| statuses.contains(&e.status))
            .count() as u64
    }
}

#[async_trait]
impl FollowStore for MemoryFollowStore {
    async fn find_edge(&self, from: &ObjectId, to: &ObjectId) -> Result<Option<Follow>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.edges)
            .iter()
            .find(|e| e.outgoing == *from && e.incoming == *to)
            .cloned())
    }

    fn list_outgoing(
        &self,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>> {
        self.list(Endpoint::Outgoing, user, options)
    }

    fn list_incoming(
        &self,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>> {
        self.list(Endpoint::Incoming, user, options)
    }

    async fn count_incoming(&self, user: &ObjectId, statuses: &[FollowStatus]) -> Result<u64> {
        Ok(self.count(Endpoint::Incoming, user, statuses))
    }

    async fn count_outgoing(&self, user: &ObjectId, statuses: &[FollowStatus]) -> Result<u64> {
        Ok(self.count(Endpoint::Outgoing, user, statuses))
    }
}
