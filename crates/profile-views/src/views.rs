use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use profile_db::{FollowStatus, Location, Profile};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Relation status as exposed to clients; rejected edges read as `none`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RelationStatus {
    #[default]
    None,
    Pending,
    Accepted,
}

impl RelationStatus {
    /// Only pending and accepted edges are visible
    pub fn from_edge(status: Option<FollowStatus>) -> Self {
        match status {
            Some(FollowStatus::Pending) => RelationStatus::Pending,
            Some(FollowStatus::Accepted) => RelationStatus::Accepted,
            Some(FollowStatus::Rejected) | None => RelationStatus::None,
        }
    }
}

/// Relationship between the viewer and the profile subject.
///
/// `outward` is the subject's edge towards the viewer, `inward` the
/// viewer's edge towards the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relation {
    pub outward: RelationStatus,
    pub inward: RelationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BasicProfileView {
    pub uid: String,
    pub fullname: String,
    pub username: String,
    pub avatar: String,
    pub privacy_stat: String,
    pub trusted: bool,
    /// Contact mode only, verbatim from the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub mobile: Option<serde_json::Value>,
}

/// A point in time with its unix timestamp alongside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Timestamped {
    pub datetime: DateTime<Utc>,
    pub timestamp: i64,
}

impl From<DateTime<Utc>> for Timestamped {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self {
            datetime,
            timestamp: datetime.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoView {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LocationView {
    pub caption: Option<String>,
    pub geo: Option<GeoView>,
}

impl From<&Location> for LocationView {
    fn from(location: &Location) -> Self {
        Self {
            caption: location.caption.clone(),
            geo: location.geo.map(|g| GeoView {
                lon: g.lon,
                lat: g.lat,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersonalDetails {
    pub location: Option<LocationView>,
    pub birthday: Option<Timestamped>,
}

/// Extended attributes, sourced only from the local profile row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProfileDetails {
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub personal: Option<PersonalDetails>,
}

impl ProfileDetails {
    /// An existing row always yields strings for bio and gender; a missing
    /// row yields nulls throughout.
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        let Some(profile) = profile else {
            return Self::default();
        };

        Self {
            bio: Some(profile.bio.clone().unwrap_or_default()),
            gender: Some(profile.gender.clone().unwrap_or_default()),
            personal: Some(PersonalDetails {
                location: profile.location.as_ref().map(LocationView::from),
                birthday: profile.birthday.map(Timestamped::from),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProfilePageView {
    #[serde(flatten)]
    pub basic: BasicProfileView,
    /// Null when viewers look at their own page
    pub relation: Option<Relation>,
    pub followers_count: u64,
    pub followings_count: u64,
    pub profile: ProfileDetails,
    /// Fields contributed by page hooks
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FollowListItem {
    pub request_id: String,
    pub created_on: Timestamped,
    /// Null when the identity provider does not know the user
    pub user: Option<BasicProfileView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FollowListView {
    pub count: usize,
    pub items: Vec<FollowListItem>,
    /// Edge id to pass as the cursor for the next page
    pub next_cursor: Option<String>,
}
