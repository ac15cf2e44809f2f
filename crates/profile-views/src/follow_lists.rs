use futures::TryStreamExt;
use profile_db::{Endpoint, Follow, FollowListOptions, FollowStatus, ObjectId};
use tracing::debug;

use crate::builder::{BulkMode, IdentityRef, ProfileViewBuilder};
use crate::error::Result;
use crate::views::{FollowListItem, FollowListView, Timestamped};

impl ProfileViewBuilder {
    /// Users the subject follows, newest edge first
    pub async fn followings(
        &self,
        identity: IdentityRef,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> Result<FollowListView> {
        self.follow_list(Endpoint::Outgoing, identity, cursor, limit)
            .await
    }

    /// Users following the subject, newest edge first
    pub async fn followers(
        &self,
        identity: IdentityRef,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> Result<FollowListView> {
        self.follow_list(Endpoint::Incoming, identity, cursor, limit)
            .await
    }

    async fn follow_list(
        &self,
        endpoint: Endpoint,
        identity: IdentityRef,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> Result<FollowListView> {
        let uid = self.resolve_uid(&identity).await?;
        let options = FollowListOptions {
            statuses: Some(vec![FollowStatus::Accepted]),
            cursor,
            limit,
        };

        let follows = &self.deps.follows;
        let edges: Vec<Follow> = match endpoint {
            Endpoint::Outgoing => follows.list_outgoing(&uid, options),
            Endpoint::Incoming => follows.list_incoming(&uid, options),
        }
        .try_collect()
        .await?;

        let counterpart = |edge: &Follow| match endpoint {
            Endpoint::Outgoing => edge.incoming.to_string(),
            Endpoint::Incoming => edge.outgoing.to_string(),
        };

        let others: Vec<String> = edges.iter().map(|edge| counterpart(edge)).collect();
        let mut users = self.bulk_profiles(&others, BulkMode::Basic).await?;

        let next_cursor = match (limit, edges.last()) {
            (Some(limit), Some(last)) if edges.len() as i64 >= limit => Some(last.id.to_string()),
            _ => None,
        };

        debug!(
            subject = %uid,
            ?endpoint,
            edges = edges.len(),
            resolved = users.len(),
            "Listed follow edges"
        );

        let items: Vec<FollowListItem> = edges
            .iter()
            .map(|edge| FollowListItem {
                request_id: edge.id.to_string(),
                created_on: Timestamped::from(edge.created_at),
                user: users.remove(&counterpart(edge)),
            })
            .collect();

        Ok(FollowListView {
            count: items.len(),
            items,
            next_cursor,
        })
    }
}
