use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Account record of the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub uid: String,
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Contact number exactly as the provider returns it
    #[serde(default)]
    pub mobile: Option<serde_json::Value>,
}

/// Identity provider API response types
#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub(crate) user: IdentityRecord,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkAccountsRequest<'a> {
    pub(crate) uids: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkAccountsResponse {
    #[serde(default)]
    pub(crate) items: HashMap<String, AccountResponse>,
}
