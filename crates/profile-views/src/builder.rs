use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::TryStreamExt;
use identity_client::IdentityRecord;
use profile_db::{Avatar, AvatarFilter, FollowStatus, ObjectId, Profile};
use tracing::debug;

use crate::collaborators::{Collaborators, ViewerToken};
use crate::config::ViewConfig;
use crate::error::Result;
use crate::hooks::{ProfilePageContext, ProfilePageHook};
use crate::relation::RelationResolver;
use crate::views::{BasicProfileView, ProfileDetails, ProfilePageView};

/// How a request names the user it is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRef {
    Username(String),
    Uid(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkMode {
    #[default]
    Basic,
    /// Also carry the identity provider's contact number
    Contact,
}

/// Composes the profile service's response views from the identity
/// provider and the local stores
pub struct ProfileViewBuilder {
    pub(crate) deps: Collaborators,
    pub(crate) config: ViewConfig,
    relations: RelationResolver,
    hooks: Vec<Arc<dyn ProfilePageHook>>,
}

impl ProfileViewBuilder {
    pub fn new(deps: Collaborators, config: ViewConfig) -> Self {
        let relations = RelationResolver::new(deps.follows.clone());
        Self {
            deps,
            config,
            relations,
            hooks: Vec::new(),
        }
    }

    /// Register a profile page hook; hooks run in registration order
    pub fn with_hook(mut self, hook: impl ProfilePageHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub(crate) async fn resolve_identity(
        &self,
        identity: &IdentityRef,
    ) -> Result<(ObjectId, Arc<IdentityRecord>)> {
        let client = &self.deps.identity;
        let record = match identity {
            IdentityRef::Username(username) => {
                self.config
                    .retry
                    .run("get_by_username", || client.get_by_username(username))
                    .await?
            }
            IdentityRef::Uid(uid) => {
                self.config
                    .retry
                    .run("get_by_uid", || client.get_by_uid(uid.as_str()))
                    .await?
            }
        };
        let uid = ObjectId::parse(&record.uid)?;
        Ok((uid, record))
    }

    /// The subject's id; usernames go through the identity provider
    pub(crate) async fn resolve_uid(&self, identity: &IdentityRef) -> Result<ObjectId> {
        match identity {
            IdentityRef::Uid(uid) => Ok(uid.clone()),
            IdentityRef::Username(_) => Ok(self.resolve_identity(identity).await?.0),
        }
    }

    /// The media link needs both a profile row and a resolvable primary
    fn avatar_url(
        &self,
        uid: &ObjectId,
        profile: Option<&Profile>,
        avatar: Option<&Avatar>,
    ) -> String {
        let primary = profile.and(avatar).and_then(Avatar::primary_media);
        match primary {
            Some(media) => format!(
                "{}/profile.jpg",
                self.deps.links.link_of(media).trim_end_matches('/')
            ),
            None => self.config.fallback_avatar_url(uid),
        }
    }

    async fn compose_basic(
        &self,
        uid: &ObjectId,
        record: &IdentityRecord,
        profile: Option<&Profile>,
        avatar: Option<&Avatar>,
    ) -> BasicProfileView {
        let fullname = profile
            .and_then(Profile::display_name)
            .map(str::to_string)
            .unwrap_or_else(|| record.fullname.clone());

        BasicProfileView {
            uid: uid.to_string(),
            fullname,
            username: record.username.clone(),
            avatar: self.avatar_url(uid, profile, avatar),
            privacy_stat: profile
                .map(Profile::privacy)
                .unwrap_or_default()
                .as_str()
                .to_string(),
            trusted: self.deps.trust.is_trusted(uid).await,
            mobile: None,
        }
    }

    /// Identity plus local display name, avatar and privacy status
    pub async fn basic_profile(&self, identity: IdentityRef) -> Result<BasicProfileView> {
        let (uid, record) = self.resolve_identity(&identity).await?;

        let (profile, avatar) = futures::try_join!(
            self.deps.profiles.find_one_by_uid(&uid),
            self.deps.avatars.get_by_owner(&uid),
        )?;

        Ok(self
            .compose_basic(&uid, &record, profile.as_ref(), avatar.as_ref())
            .await)
    }

    /// Full profile page as seen by `viewer` (anonymous when `None`)
    pub async fn profile_page(
        &self,
        viewer: Option<&ViewerToken>,
        identity: IdentityRef,
    ) -> Result<ProfilePageView> {
        let (uid, record) = self.resolve_identity(&identity).await?;
        let viewer_id = viewer.map(|t| t.owner_identifier().clone());

        let accepted = [FollowStatus::Accepted];
        let (profile, avatar, relation, followers_count, followings_count) = futures::try_join!(
            self.deps.profiles.find_one_by_uid(&uid),
            self.deps.avatars.get_by_owner(&uid),
            self.relations.resolve(viewer_id.as_ref(), &uid),
            self.deps.follows.count_incoming(&uid, &accepted),
            self.deps.follows.count_outgoing(&uid, &accepted),
        )?;

        let basic = self
            .compose_basic(&uid, &record, profile.as_ref(), avatar.as_ref())
            .await;

        let view = ProfilePageView {
            basic,
            relation,
            followers_count,
            followings_count,
            profile: ProfileDetails::from_profile(profile.as_ref()),
            extensions: BTreeMap::new(),
        };

        let ctx = ProfilePageContext {
            subject_id: uid,
            profile,
            viewer_id,
        };
        Ok(self
            .hooks
            .iter()
            .fold(view, |view, hook| hook.apply(view, &ctx)))
    }

    /// Basic views for many users keyed by uid. Users unknown to the
    /// identity provider are left out.
    pub async fn bulk_profiles(
        &self,
        ids: &[String],
        mode: BulkMode,
    ) -> Result<BTreeMap<String, BasicProfileView>> {
        let mut uids: Vec<ObjectId> = Vec::with_capacity(ids.len());
        for raw in ids {
            let uid = ObjectId::parse(raw)?;
            if !uids.contains(&uid) {
                uids.push(uid);
            }
        }

        let mut views = BTreeMap::new();
        if uids.is_empty() {
            return Ok(views);
        }

        let keys: Vec<String> = uids.iter().map(ObjectId::to_string).collect();
        let client = &self.deps.identity;
        let records = self
            .config
            .retry
            .run("list_by_uids", || client.list_by_uids(&keys))
            .await?;

        let known: Vec<ObjectId> = uids
            .into_iter()
            .filter(|uid| records.contains_key(uid.as_str()))
            .collect();
        if known.is_empty() {
            return Ok(views);
        }

        let (profiles, avatars) = futures::try_join!(
            self.deps.profiles.find_all_by_uids(&known),
            self.deps
                .avatars
                .search(AvatarFilter::OwnerIn(known.clone()), None, None)
                .try_collect::<Vec<Avatar>>(),
        )?;

        let profiles: HashMap<ObjectId, Profile> =
            profiles.into_iter().map(|p| (p.uid.clone(), p)).collect();
        let avatars: HashMap<ObjectId, Avatar> =
            avatars.into_iter().map(|a| (a.owner.clone(), a)).collect();

        debug!(
            requested = keys.len(),
            found = known.len(),
            profiles = profiles.len(),
            avatars = avatars.len(),
            "Composed bulk profiles"
        );

        for uid in &known {
            let Some(record) = records.get(uid.as_str()) else {
                continue;
            };
            let mut view = self
                .compose_basic(uid, record, profiles.get(uid), avatars.get(uid))
                .await;
            if mode == BulkMode::Contact {
                view.mobile = record.mobile.clone();
            }
            views.insert(uid.to_string(), view);
        }

        Ok(views)
    }
}
