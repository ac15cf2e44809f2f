use profile_db::{ObjectId, Profile};

use crate::views::ProfilePageView;

/// What a page hook knows about the request beyond the view itself
#[derive(Debug, Clone)]
pub struct ProfilePageContext {
    pub subject_id: ObjectId,
    pub profile: Option<Profile>,
    pub viewer_id: Option<ObjectId>,
}

/// Transform applied to every composed profile page.
///
/// Hooks run synchronously in registration order, each receiving the
/// previous hook's output.
pub trait ProfilePageHook: Send + Sync {
    fn apply(&self, view: ProfilePageView, ctx: &ProfilePageContext) -> ProfilePageView;
}

impl<F> ProfilePageHook for F
where
    F: Fn(ProfilePageView, &ProfilePageContext) -> ProfilePageView + Send + Sync,
{
    fn apply(&self, view: ProfilePageView, ctx: &ProfilePageContext) -> ProfilePageView {
        self(view, ctx)
    }
}
