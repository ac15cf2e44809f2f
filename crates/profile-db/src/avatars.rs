use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::ids::ObjectId;
use crate::types::{Avatar, AvatarRow, Media};

/// Filter expression over avatar rows, compiled into a SQL predicate
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarFilter {
    All,
    OwnerIn(Vec<ObjectId>),
    HasPrimary(bool),
    ContainsMedia(String),
    And(Vec<AvatarFilter>),
    Or(Vec<AvatarFilter>),
    Not(Box<AvatarFilter>),
}

impl AvatarFilter {
    /// Evaluate the expression against a materialised avatar
    pub fn matches(&self, avatar: &Avatar) -> bool {
        match self {
            Self::All => true,
            Self::OwnerIn(owners) => owners.contains(&avatar.owner),
            Self::HasPrimary(expected) => avatar.primary.is_some() == *expected,
            Self::ContainsMedia(hash) => avatar.contains_hash(hash),
            Self::And(filters) => filters.iter().all(|f| f.matches(avatar)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(avatar)),
            Self::Not(filter) => !filter.matches(avatar),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::All => {
                qb.push("TRUE");
            }
            Self::OwnerIn(owners) if owners.is_empty() => {
                qb.push("FALSE");
            }
            Self::OwnerIn(owners) => {
                let keys: Vec<String> = owners.iter().map(|o| o.to_string()).collect();
                qb.push("owner_uid = ANY(");
                qb.push_bind(keys);
                qb.push(")");
            }
            Self::HasPrimary(true) => {
                qb.push("primary_hash IS NOT NULL");
            }
            Self::HasPrimary(false) => {
                qb.push("primary_hash IS NULL");
            }
            Self::ContainsMedia(hash) => {
                qb.push(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements(medias) AS m(item) WHERE m.item->>'hash' = ",
                );
                qb.push_bind(hash.clone());
                qb.push(")");
            }
            Self::And(filters) => push_joined(qb, filters, " AND ", "TRUE"),
            Self::Or(filters) => push_joined(qb, filters, " OR ", "FALSE"),
            Self::Not(filter) => {
                qb.push("NOT (");
                filter.push_sql(qb);
                qb.push(")");
            }
        }
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'static, Postgres>,
    filters: &[AvatarFilter],
    separator: &str,
    empty: &str,
) {
    if filters.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        filter.push_sql(qb);
    }
    qb.push(")");
}

/// Build the keyset-paginated search query: owners strictly below the
/// cursor, newest owner id first.
pub(crate) fn build_search_query(
    filter: &AvatarFilter,
    cursor: Option<&ObjectId>,
    limit: Option<i64>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT owner_uid, primary_hash, medias FROM avatars WHERE ",
    );
    filter.push_sql(&mut qb);

    if let Some(cursor) = cursor {
        qb.push(" AND owner_uid < ");
        qb.push_bind(cursor.to_string());
    }

    qb.push(" ORDER BY owner_uid DESC");

    // negative limits read as zero, matching the in-memory store
    if let Some(limit) = limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit.max(0));
    }

    qb
}

/// Drop repeated items from a submitted batch, keeping the first occurrence
pub fn dedup_medias(medias: &[Media]) -> Vec<Media> {
    let mut unique: Vec<Media> = Vec::with_capacity(medias.len());
    for media in medias {
        if !unique.contains(media) {
            unique.push(media.clone());
        }
    }
    unique
}

/// Persistence of avatar lists
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn get_by_owner(&self, owner: &ObjectId) -> Result<Option<Avatar>>;

    /// Upsert: set primary, prepend media items not already listed, create
    /// the row if absent. Returns the state after the update.
    async fn save(&self, avatar: &Avatar) -> Result<Avatar>;

    /// Remove every media item with the given hash.
    ///
    /// The primary pointer is left untouched even when it named the removed
    /// item. Returns `None` when the owner has no avatar row.
    async fn remove_by_hash(&self, owner: &ObjectId, hash: &str) -> Result<Option<Avatar>>;

    /// Set the primary pointer to `new` only while it still equals
    /// `expected`. Media items are untouched. Returns the stored state
    /// whether or not the write happened.
    async fn set_primary_if(
        &self,
        owner: &ObjectId,
        expected: Option<&str>,
        new: Option<String>,
    ) -> Result<Option<Avatar>>;

    /// Stream avatars matching `filter` with owner id below `cursor`,
    /// ordered by owner id descending
    fn search(
        &self,
        filter: AvatarFilter,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> BoxStream<'static, Result<Avatar>>;
}

pub struct PgAvatarStore {
    pool: PgPool,
}

impl PgAvatarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvatarStore for PgAvatarStore {
    async fn get_by_owner(&self, owner: &ObjectId) -> Result<Option<Avatar>> {
        let row = sqlx::query_as::<_, AvatarRow>(
            "SELECT owner_uid, primary_hash, medias FROM avatars WHERE owner_uid = $1",
        )
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Avatar::try_from).transpose()
    }

    async fn save(&self, avatar: &Avatar) -> Result<Avatar> {
        let medias = dedup_medias(&avatar.medias);

        // Single statement: the row lock taken by ON CONFLICT serialises
        // concurrent saves, and the union reads the latest committed list.
        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            INSERT INTO avatars (owner_uid, primary_hash, medias, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (owner_uid) DO UPDATE SET
                primary_hash = EXCLUDED.primary_hash,
                medias = COALESCE(
                    (
                        SELECT jsonb_agg(incoming.item ORDER BY incoming.pos)
                        FROM jsonb_array_elements(EXCLUDED.medias)
                            WITH ORDINALITY AS incoming(item, pos)
                        WHERE NOT EXISTS (
                            SELECT 1
                            FROM jsonb_array_elements(avatars.medias) AS existing(item)
                            WHERE existing.item = incoming.item
                        )
                    ),
                    '[]'::jsonb
                ) || avatars.medias,
                updated_at = NOW()
            RETURNING owner_uid, primary_hash, medias
            "#,
        )
        .bind(avatar.owner.as_str())
        .bind(&avatar.primary)
        .bind(Json(medias))
        .fetch_one(&self.pool)
        .await?;

        let saved = Avatar::try_from(row)?;
        debug!(
            owner = %saved.owner,
            medias = saved.medias.len(),
            "Saved avatar list"
        );
        Ok(saved)
    }

    async fn remove_by_hash(&self, owner: &ObjectId, hash: &str) -> Result<Option<Avatar>> {
        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            UPDATE avatars SET
                medias = COALESCE(
                    (
                        SELECT jsonb_agg(m.item ORDER BY m.pos)
                        FROM jsonb_array_elements(avatars.medias) WITH ORDINALITY AS m(item, pos)
                        WHERE m.item->>'hash' IS DISTINCT FROM $2
                    ),
                    '[]'::jsonb
                ),
                updated_at = NOW()
            WHERE owner_uid = $1
            RETURNING owner_uid, primary_hash, medias
            "#,
        )
        .bind(owner.as_str())
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Avatar::try_from).transpose()
    }

    async fn set_primary_if(
        &self,
        owner: &ObjectId,
        expected: Option<&str>,
        new: Option<String>,
    ) -> Result<Option<Avatar>> {
        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            UPDATE avatars SET primary_hash = $3, updated_at = NOW()
            WHERE owner_uid = $1 AND primary_hash IS NOT DISTINCT FROM $2
            RETURNING owner_uid, primary_hash, medias
            "#,
        )
        .bind(owner.as_str())
        .bind(expected)
        .bind(&new)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Avatar::try_from(row).map(Some),
            None => {
                debug!(owner = %owner, "Primary changed underneath, keeping it");
                self.get_by_owner(owner).await
            }
        }
    }

    fn search(
        &self,
        filter: AvatarFilter,
        cursor: Option<ObjectId>,
        limit: Option<i64>,
    ) -> BoxStream<'static, Result<Avatar>> {
        let pool = self.pool.clone();
        stream::once(async move {
            let mut qb = build_search_query(&filter, cursor.as_ref(), limit);
            let rows = qb.build_query_as::<AvatarRow>().fetch_all(&pool).await?;
            debug!(rows = rows.len(), "Avatar search page");
            Ok::<_, StoreError>(stream::iter(rows.into_iter().map(Avatar::try_from)))
        })
        .try_flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u8) -> ObjectId {
        ObjectId::parse(&format!("{:024x}", n)).unwrap()
    }

    #[test]
    fn test_search_query_without_cursor() {
        let qb = build_search_query(&AvatarFilter::All, None, None);
        assert_eq!(
            qb.sql(),
            "SELECT owner_uid, primary_hash, medias FROM avatars WHERE TRUE ORDER BY owner_uid DESC"
        );
    }

    #[test]
    fn test_search_query_with_cursor_and_limit() {
        let qb = build_search_query(&AvatarFilter::HasPrimary(true), Some(&uid(9)), Some(10));
        let sql = qb.sql();
        assert!(sql.contains("primary_hash IS NOT NULL AND owner_uid < $1"));
        assert!(sql.ends_with("ORDER BY owner_uid DESC LIMIT $2"));
    }

    #[test]
    fn test_negative_limit_still_bounds_query() {
        let qb = build_search_query(&AvatarFilter::All, None, Some(-3));
        assert!(qb.sql().ends_with("ORDER BY owner_uid DESC LIMIT $1"));
    }

    #[test]
    fn test_compound_filter_sql() {
        let filter = AvatarFilter::And(vec![
            AvatarFilter::OwnerIn(vec![uid(1), uid(2)]),
            AvatarFilter::Not(Box::new(AvatarFilter::ContainsMedia("h1".to_string()))),
        ]);
        let qb = build_search_query(&filter, None, None);
        assert!(qb.sql().contains(
            "(owner_uid = ANY($1) AND NOT (EXISTS (SELECT 1 FROM jsonb_array_elements(medias) AS m(item) WHERE m.item->>'hash' = $2)))"
        ));
    }

    #[test]
    fn test_empty_owner_list_matches_nothing() {
        let qb = build_search_query(&AvatarFilter::OwnerIn(Vec::new()), None, None);
        assert!(qb.sql().contains("WHERE FALSE"));
        assert!(!AvatarFilter::OwnerIn(Vec::new()).matches(&Avatar::new(uid(1))));
    }

    #[test]
    fn test_empty_or_is_false_and_empty_and_is_true() {
        let avatar = Avatar::new(uid(1));
        assert!(AvatarFilter::And(Vec::new()).matches(&avatar));
        assert!(!AvatarFilter::Or(Vec::new()).matches(&avatar));
    }

    #[test]
    fn test_filter_matches_media_hash() {
        let mut avatar = Avatar::new(uid(3));
        avatar.medias.push(Media::new("h1", "bin/h1"));
        assert!(AvatarFilter::ContainsMedia("h1".to_string()).matches(&avatar));
        assert!(!AvatarFilter::ContainsMedia("h2".to_string()).matches(&avatar));
        assert!(AvatarFilter::HasPrimary(false).matches(&avatar));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let a = Media::new("h1", "bin/h1");
        let b = Media::new("h2", "bin/h2");
        let deduped = dedup_medias(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(deduped, vec![a, b]);
    }
}
