use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::Result;
use crate::ids::ObjectId;
use crate::types::{Profile, ProfileRow};

const PROFILE_COLUMNS: &str = r#"
    uid, display_name, bio, gender, privacy_stat,
    location_caption, location_lon, location_lat, birthday
"#;

/// Persistence of local profile attributes
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_one_by_uid(&self, uid: &ObjectId) -> Result<Option<Profile>>;

    /// Batch lookup; uids without a row are simply absent from the result
    async fn find_all_by_uids(&self, uids: &[ObjectId]) -> Result<Vec<Profile>>;

    /// Insert or replace every attribute of the profile row
    async fn save(&self, profile: &Profile) -> Result<Profile>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_one_by_uid(&self, uid: &ObjectId) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE uid = $1"
        ))
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn find_all_by_uids(&self, uids: &[ObjectId]) -> Result<Vec<Profile>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = uids.iter().map(|u| u.to_string()).collect();
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE uid = ANY($1)"
        ))
        .bind(&keys)
        .fetch_all(&self.pool)
        .await?;

        debug!(requested = uids.len(), found = rows.len(), "Loaded profiles");
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn save(&self, profile: &Profile) -> Result<Profile> {
        let caption = profile.location.as_ref().and_then(|l| l.caption.clone());
        let geo = profile.location.as_ref().and_then(|l| l.geo);

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO profiles (
                uid, display_name, bio, gender, privacy_stat,
                location_caption, location_lon, location_lat, birthday,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            ON CONFLICT (uid) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                bio = EXCLUDED.bio,
                gender = EXCLUDED.gender,
                privacy_stat = EXCLUDED.privacy_stat,
                location_caption = EXCLUDED.location_caption,
                location_lon = EXCLUDED.location_lon,
                location_lat = EXCLUDED.location_lat,
                birthday = EXCLUDED.birthday,
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.uid.as_str())
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.gender)
        .bind(profile.privacy_status.map(|p| p.as_str()))
        .bind(caption)
        .bind(geo.map(|g| g.lon))
        .bind(geo.map(|g| g.lat))
        .bind(profile.birthday)
        .fetch_one(&self.pool)
        .await?;

        Profile::try_from(row)
    }
}
