use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use identity_client::IdentityClient;
use profile_db::{AvatarStore, FollowStore, Media, ObjectId, ProfileStore};

/// Decides whether a user carries the trusted badge
#[async_trait]
pub trait TrustCheck: Send + Sync {
    async fn is_trusted(&self, uid: &ObjectId) -> bool;
}

/// Builds the public link of a stored media item
pub trait MediaLinkFactory: Send + Sync {
    fn link_of(&self, media: &Media) -> String;
}

/// Authenticated caller of a view, as extracted from the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerToken {
    owner: ObjectId,
}

impl ViewerToken {
    pub fn new(owner: ObjectId) -> Self {
        Self { owner }
    }

    pub fn owner_identifier(&self) -> &ObjectId {
        &self.owner
    }
}

/// Everything a [`crate::ProfileViewBuilder`] reads from
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityClient>,
    pub profiles: Arc<dyn ProfileStore>,
    pub avatars: Arc<dyn AvatarStore>,
    pub follows: Arc<dyn FollowStore>,
    pub trust: Arc<dyn TrustCheck>,
    pub links: Arc<dyn MediaLinkFactory>,
}

/// Fixed set of trusted users
#[derive(Debug, Clone, Default)]
pub struct TrustList {
    trusted: HashSet<ObjectId>,
}

impl TrustList {
    pub fn new(trusted: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            trusted: trusted.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TrustCheck for TrustList {
    async fn is_trusted(&self, uid: &ObjectId) -> bool {
        self.trusted.contains(uid)
    }
}

/// Links media under a public base URL by storage reference
#[derive(Debug, Clone)]
pub struct StorageLinks {
    base_url: String,
}

impl StorageLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl MediaLinkFactory for StorageLinks {
    fn link_of(&self, media: &Media) -> String {
        format!(
            "{}/media/{}",
            self.base_url,
            media.storage.trim_start_matches('/')
        )
    }
}
