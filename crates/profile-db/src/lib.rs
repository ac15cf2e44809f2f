//! Persistence layer for the profile service
//!
//! Stores for local profile attributes, avatar media lists and follow
//! edges. Each store is a trait with a PostgreSQL implementation and an
//! in-memory one; callers hold them as `Arc<dyn …>`.

pub mod avatars;
pub mod error;
pub mod follows;
pub mod ids;
pub mod memory;
pub mod migrate;
pub mod profiles;
pub mod types;

pub use avatars::{AvatarFilter, AvatarStore, PgAvatarStore};
pub use error::{Result, StoreError};
pub use follows::{Endpoint, FollowStore, PgFollowStore};
pub use ids::ObjectId;
pub use profiles::{PgProfileStore, ProfileStore};
pub use sqlx::postgres::PgPool;
pub use types::*;
