use std::sync::Arc;

use profile_db::{FollowStore, ObjectId, Result};

use crate::views::{Relation, RelationStatus};

/// Computes the bidirectional follow relation between a viewer and a
/// profile subject
#[derive(Clone)]
pub struct RelationResolver {
    follows: Arc<dyn FollowStore>,
}

impl RelationResolver {
    pub fn new(follows: Arc<dyn FollowStore>) -> Self {
        Self { follows }
    }

    /// `None` on self-view. Anonymous viewers get `none` both ways without
    /// touching the store.
    pub async fn resolve(
        &self,
        viewer: Option<&ObjectId>,
        subject: &ObjectId,
    ) -> Result<Option<Relation>> {
        let Some(viewer) = viewer else {
            return Ok(Some(Relation::default()));
        };
        if viewer == subject {
            return Ok(None);
        }

        let (outward, inward) = futures::try_join!(
            self.follows.find_edge(subject, viewer),
            self.follows.find_edge(viewer, subject),
        )?;

        Ok(Some(Relation {
            outward: RelationStatus::from_edge(outward.map(|e| e.status)),
            inward: RelationStatus::from_edge(inward.map(|e| e.status)),
        }))
    }
}
