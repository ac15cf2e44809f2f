//! Response composition for the profile service
//!
//! Merges identity-provider records with the local profile, avatar and
//! follow stores into the basic profile, profile page, bulk profile and
//! follow list views.

pub mod avatars;
pub mod builder;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod follow_lists;
pub mod hooks;
pub mod relation;
pub mod retry;
pub mod views;

#[cfg(test)]
mod testing;

pub use avatars::{corrected_primary, AvatarManager};
pub use builder::{BulkMode, IdentityRef, ProfileViewBuilder};
pub use collaborators::{
    Collaborators, MediaLinkFactory, StorageLinks, TrustCheck, TrustList, ViewerToken,
};
pub use config::ViewConfig;
pub use error::{Result, ViewError};
pub use hooks::{ProfilePageContext, ProfilePageHook};
pub use relation::RelationResolver;
pub use retry::{Backoff, RetryPolicy};
pub use views::*;
