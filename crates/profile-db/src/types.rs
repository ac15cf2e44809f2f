use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::error::StoreError;
use crate::ids::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Public,
    Private,
    Friends,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Friends => "friends",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "friends" => Some(Self::Friends),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub caption: Option<String>,
    pub geo: Option<GeoPoint>,
}

/// Mutable profile attributes stored locally, keyed by identity uid.
///
/// A row does not exist for every identity; callers fall back to
/// identity-provider data when it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: ObjectId,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub privacy_status: Option<PrivacyStatus>,
    pub location: Option<Location>,
    pub birthday: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(uid: ObjectId) -> Self {
        Self {
            uid,
            display_name: None,
            bio: None,
            gender: None,
            privacy_status: None,
            location: None,
            birthday: None,
        }
    }

    /// Privacy status with the public default applied
    pub fn privacy(&self) -> PrivacyStatus {
        self.privacy_status.unwrap_or_default()
    }

    /// Display name, if set to something other than blank
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Profile row returned from SELECT queries
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub uid: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub privacy_stat: Option<String>,
    pub location_caption: Option<String>,
    pub location_lon: Option<f64>,
    pub location_lat: Option<f64>,
    pub birthday: Option<DateTime<Utc>>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let privacy_status = match row.privacy_stat.as_deref() {
            Some(stat) => Some(PrivacyStatus::parse(stat).ok_or_else(|| {
                StoreError::Decode(format!("unknown privacy status '{stat}'"))
            })?),
            None => None,
        };

        let geo = match (row.location_lon, row.location_lat) {
            (Some(lon), Some(lat)) => Some(GeoPoint { lon, lat }),
            _ => None,
        };
        let location = if row.location_caption.is_some() || geo.is_some() {
            Some(Location {
                caption: row.location_caption,
                geo,
            })
        } else {
            None
        };

        Ok(Self {
            uid: ObjectId::parse(&row.uid)?,
            display_name: row.display_name,
            bio: row.bio,
            gender: row.gender,
            privacy_status,
            location,
            birthday: row.birthday,
        })
    }
}

/// A single uploaded avatar image.
///
/// Equality is over the full content; the avatar list treats two items as
/// duplicates only when hash, storage reference and metadata all match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub hash: String,
    /// Reference into the media storage backend
    pub storage: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Media {
    pub fn new(hash: impl Into<String>, storage: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            storage: storage.into(),
            meta: serde_json::Map::new(),
        }
    }
}

/// Ordered avatar list of a user, newest first, with a primary pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub owner: ObjectId,
    /// Hash of the media item displayed as the profile picture
    pub primary: Option<String>,
    pub medias: Vec<Media>,
}

impl Avatar {
    pub fn new(owner: ObjectId) -> Self {
        Self {
            owner,
            primary: None,
            medias: Vec::new(),
        }
    }

    /// The media item the primary pointer resolves to, if it is still listed
    pub fn primary_media(&self) -> Option<&Media> {
        let primary = self.primary.as_deref()?;
        self.medias.iter().find(|m| m.hash == primary)
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.medias.iter().any(|m| m.hash == hash)
    }
}

/// Avatar row returned from SELECT/RETURNING clauses
#[derive(Debug, Clone, FromRow)]
pub struct AvatarRow {
    pub owner_uid: String,
    pub primary_hash: Option<String>,
    pub medias: Json<Vec<Media>>,
}

impl TryFrom<AvatarRow> for Avatar {
    type Error = StoreError;

    fn try_from(row: AvatarRow) -> Result<Self, Self::Error> {
        Ok(Self {
            owner: ObjectId::parse(&row.owner_uid)?,
            primary: row.primary_hash,
            medias: row.medias.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FollowStatus {
    pub const ALL: [FollowStatus; 3] = [Self::Pending, Self::Accepted, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Directed follow edge: `outgoing` follows `incoming`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: ObjectId,
    pub outgoing: ObjectId,
    pub incoming: ObjectId,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

/// Follow row returned from SELECT queries
#[derive(Debug, Clone, FromRow)]
pub struct FollowRow {
    pub id: String,
    pub outgoing_uid: String,
    pub incoming_uid: String,
    pub stat: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FollowRow> for Follow {
    type Error = StoreError;

    fn try_from(row: FollowRow) -> Result<Self, Self::Error> {
        let status = FollowStatus::parse(&row.stat)
            .ok_or_else(|| StoreError::Decode(format!("unknown follow status '{}'", row.stat)))?;
        Ok(Self {
            id: ObjectId::parse(&row.id)?,
            outgoing: ObjectId::parse(&row.outgoing_uid)?,
            incoming: ObjectId::parse(&row.incoming_uid)?,
            status,
            created_at: row.created_at,
        })
    }
}

/// Options for listing follow edges from one endpoint
#[derive(Debug, Clone, Default)]
pub struct FollowListOptions {
    /// Restrict to these statuses; `None` lists every status
    pub statuses: Option<Vec<FollowStatus>>,
    /// Exclusive upper bound on the edge id (last id of the previous page)
    pub cursor: Option<ObjectId>,
    pub limit: Option<i64>,
}

impl FollowListOptions {
    pub fn accepted() -> Self {
        Self {
            statuses: Some(vec![FollowStatus::Accepted]),
            ..Self::default()
        }
    }
}
