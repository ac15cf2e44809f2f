use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::{Result, StoreError};
use crate::ids::ObjectId;
use crate::types::{Follow, FollowListOptions, FollowRow, FollowStatus};

/// Which endpoint of an edge a listing or count is anchored on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Edges the user issued (the user follows someone)
    Outgoing,
    /// Edges pointing at the user (someone follows the user)
    Incoming,
}

impl Endpoint {
    fn column(&self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing_uid",
            Self::Incoming => "incoming_uid",
        }
    }
}

/// Read access to follow edges
#[async_trait]
pub trait FollowStore: Send + Sync {
    /// The edge `from` → `to`, if one exists
    async fn find_edge(&self, from: &ObjectId, to: &ObjectId) -> Result<Option<Follow>>;

    fn list_outgoing(
        &self,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>>;

    fn list_incoming(
        &self,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>>;

    async fn count_incoming(&self, user: &ObjectId, statuses: &[FollowStatus]) -> Result<u64>;

    async fn count_outgoing(&self, user: &ObjectId, statuses: &[FollowStatus]) -> Result<u64>;
}

pub(crate) fn build_list_query(
    endpoint: Endpoint,
    user: &ObjectId,
    options: &FollowListOptions,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT id, outgoing_uid, incoming_uid, stat, created_at FROM follows WHERE ",
    );
    qb.push(endpoint.column());
    qb.push(" = ");
    qb.push_bind(user.to_string());

    if let Some(ref statuses) = options.statuses {
        let stats: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        qb.push(" AND stat = ANY(");
        qb.push_bind(stats);
        qb.push(")");
    }

    if let Some(ref cursor) = options.cursor {
        qb.push(" AND id < ");
        qb.push_bind(cursor.to_string());
    }

    qb.push(" ORDER BY id DESC");

    if let Some(limit) = options.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit.max(0));
    }

    qb
}

pub struct PgFollowStore {
    pool: PgPool,
}

impl PgFollowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn list(
        &self,
        endpoint: Endpoint,
        user: &ObjectId,
        options: FollowListOptions,
    ) -> BoxStream<'static, Result<Follow>> {
        let pool = self.pool.clone();
        let user = user.clone();
        stream::once(async move {
            let mut qb = build_list_query(endpoint, &user, &options);
            let rows = qb.build_query_as::<FollowRow>().fetch_all(&pool).await?;
            Ok::<_, StoreError>(stream::iter(rows.into_iter().map(Follow::try_from)))
        })
        .try_flatten()
        .boxed()
    }

    async fn count(
        &self,
        endpoint: Endpoint,
        user: &ObjectId,
        statuses: &[FollowStatus],
    ) -> Result<u64> {
        if statuses.is_empty() {
            return Ok(0);
        }
        let stats: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM follows WHERE {} = $1 AND stat = ANY($2)",
            endpoint.column()
        ))
        .bind(user.as_str())
        .bind(&stats)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl FollowStore for PgFollowStore {
    async fn find_edge(&self, from: &ObjectId, to: &ObjectId) -> Result<Option<Follow>> {
        let row = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT id, outgoing_uid, incoming_uid, stat, created_at
            FROM follows
            WHERE outgoing_uid = $1 AND incoming_uid = $2
            "#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Follow::try_from).transpose()
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
        self.count(Endpoint::Incoming, user, statuses).await
    }

    async fn count_outgoing(&self, user: &ObjectId, statuses: &[FollowStatus]) -> Result<u64> {
        self.count(Endpoint::Outgoing, user, statuses).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u8) -> ObjectId {
        ObjectId::parse(&format!("{:024x}", n)).unwrap()
    }

    #[test]
    fn test_list_query_defaults() {
        let qb = build_list_query(Endpoint::Outgoing, &uid(1), &FollowListOptions::default());
        assert_eq!(
            qb.sql(),
            "SELECT id, outgoing_uid, incoming_uid, stat, created_at FROM follows WHERE outgoing_uid = $1 ORDER BY id DESC"
        );
    }

    #[test]
    fn test_list_query_with_all_options() {
        let options = FollowListOptions {
            statuses: Some(vec![FollowStatus::Accepted]),
            cursor: Some(uid(50)),
            limit: Some(20),
        };
        let qb = build_list_query(Endpoint::Incoming, &uid(1), &options);
        assert!(qb.sql().ends_with(
            "WHERE incoming_uid = $1 AND stat = ANY($2) AND id < $3 ORDER BY id DESC LIMIT $4"
        ));
    }

    #[test]
    fn test_negative_limit_still_bounds_query() {
        let options = FollowListOptions {
            limit: Some(-1),
            ..FollowListOptions::default()
        };
        let qb = build_list_query(Endpoint::Outgoing, &uid(1), &options);
        assert!(qb.sql().ends_with("ORDER BY id DESC LIMIT $2"));
    }
}
