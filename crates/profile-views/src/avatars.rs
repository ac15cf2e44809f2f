use std::sync::Arc;

use profile_db::{Avatar, AvatarStore, Media, ObjectId, Result};
use tracing::debug;

/// The primary pointer an avatar should carry: the current one while it
/// still resolves, otherwise the newest media item, or unset when the list
/// is empty
pub fn corrected_primary(avatar: &Avatar) -> Option<String> {
    if avatar.primary_media().is_some() {
        return avatar.primary.clone();
    }
    avatar.medias.first().map(|m| m.hash.clone())
}

/// Avatar uploads and removals with primary correction on top of the raw
/// store operations
#[derive(Clone)]
pub struct AvatarManager {
    store: Arc<dyn AvatarStore>,
}

impl AvatarManager {
    pub fn new(store: Arc<dyn AvatarStore>) -> Self {
        Self { store }
    }

    /// Add `media` at the head of the owner's list. It becomes primary when
    /// requested or when the owner has no usable primary yet.
    pub async fn upload(&self, owner: &ObjectId, media: Media, make_primary: bool) -> Result<Avatar> {
        let current = self.store.get_by_owner(owner).await?;
        let current_primary = current
            .as_ref()
            .and_then(Avatar::primary_media)
            .map(|m| m.hash.clone());

        let primary = match current_primary {
            Some(hash) if !make_primary => hash,
            _ => media.hash.clone(),
        };

        self.store
            .save(&Avatar {
                owner: owner.clone(),
                primary: Some(primary),
                medias: vec![media],
            })
            .await
    }

    /// Remove every item with `hash`, then repair the primary pointer if it
    /// named a removed item. `None` when the owner has no avatars.
    ///
    /// The repair is a compare-and-set against the stale pointer, so a
    /// primary written by a concurrent upload is kept.
    pub async fn remove(&self, owner: &ObjectId, hash: &str) -> Result<Option<Avatar>> {
        let Some(avatar) = self.store.remove_by_hash(owner, hash).await? else {
            return Ok(None);
        };

        let Some(stale) = avatar.primary.as_deref() else {
            return Ok(Some(avatar));
        };
        if avatar.primary_media().is_some() {
            return Ok(Some(avatar));
        }

        let primary = corrected_primary(&avatar);

        debug!(
            owner = %owner,
            removed = hash,
            primary = ?primary,
            "Correcting stale primary avatar"
        );
        self.store.set_primary_if(owner, Some(stale), primary).await
    }
}
