//! Identity Provider Client
//!
//! Resolves user ids and usernames to canonical account records held by the
//! external identity provider, singly or in bulk. Successful lookups are
//! cached using moka async caches.

mod client;
mod config;
mod error;
mod types;

pub use client::{HttpIdentityClient, IdentityClient};
pub use config::IdentityConfig;
pub use error::{IdentityError, Result};
pub use types::IdentityRecord;
