use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::types::{AccountResponse, BulkAccountsRequest, BulkAccountsResponse, IdentityRecord};

/// Account lookups against the identity provider
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Fails with `NotFound` when no account has this username
    async fn get_by_username(&self, username: &str) -> Result<Arc<IdentityRecord>>;

    /// Fails with `NotFound` when no account has this uid
    async fn get_by_uid(&self, uid: &str) -> Result<Arc<IdentityRecord>>;

    /// Bulk lookup; unknown uids are omitted from the map rather than failing
    async fn list_by_uids(&self, uids: &[String]) -> Result<HashMap<String, Arc<IdentityRecord>>>;
}

/// JSON-over-HTTP identity client with uid and username caches
pub struct HttpIdentityClient {
    client: Client,
    service_url: String,
    by_uid: Cache<String, Arc<IdentityRecord>>,
    by_username: Cache<String, Arc<IdentityRecord>>,
}

impl HttpIdentityClient {
    pub fn new(config: &IdentityConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(client: Client, config: &IdentityConfig) -> Self {
        let by_uid = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        let by_username = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            client,
            service_url: config.service_url.trim_end_matches('/').to_string(),
            by_uid,
            by_username,
        }
    }

    async fn remember(&self, record: Arc<IdentityRecord>) {
        self.by_uid.insert(record.uid.clone(), record.clone()).await;
        self.by_username
            .insert(record.username.clone(), record)
            .await;
    }

    async fn fetch_account(&self, url: String, what: &str) -> Result<Arc<IdentityRecord>> {
        let response = send(self.client.get(&url), what).await?;
        let data: AccountResponse = decode(response, what).await?;
        let record = Arc::new(data.user);
        self.remember(record.clone()).await;
        Ok(record)
    }
}

/// Send a request and map non-success statuses into the error taxonomy
async fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        error!(target_id = what, error = %e, "Identity request failed");
        IdentityError::from(e)
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        debug!(target_id = what, "Identity not found");
        return Err(IdentityError::NotFound(what.to_string()));
    }

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        return Err(IdentityError::Transient(format!(
            "{what}: status {status}"
        )));
    }

    let message = response.text().await.unwrap_or_default();
    Err(IdentityError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    response.json::<T>().await.map_err(|e| {
        error!(target_id = what, error = %e, "Failed to parse identity response");
        IdentityError::from(e)
    })
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn get_by_username(&self, username: &str) -> Result<Arc<IdentityRecord>> {
        if let Some(cached) = self.by_username.get(username).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/accounts/by-username/{}",
            self.service_url,
            urlencoding::encode(username)
        );
        self.fetch_account(url, username).await
    }

    async fn get_by_uid(&self, uid: &str) -> Result<Arc<IdentityRecord>> {
        if let Some(cached) = self.by_uid.get(uid).await {
            return Ok(cached);
        }

        let url = format!("{}/accounts/{}", self.service_url, urlencoding::encode(uid));
        self.fetch_account(url, uid).await
    }

    async fn list_by_uids(&self, uids: &[String]) -> Result<HashMap<String, Arc<IdentityRecord>>> {
        let mut results = HashMap::new();
        let mut to_fetch = Vec::new();

        // Check cache first
        for uid in uids {
            if let Some(cached) = self.by_uid.get(uid).await {
                results.insert(uid.clone(), cached);
            } else if !to_fetch.contains(uid) {
                to_fetch.push(uid.clone());
            }
        }

        if to_fetch.is_empty() {
            return Ok(results);
        }

        let url = format!("{}/accounts/bulk", self.service_url);
        let request = self
            .client
            .post(&url)
            .json(&BulkAccountsRequest { uids: &to_fetch });
        let response = send(request, "bulk").await?;
        let data: BulkAccountsResponse = decode(response, "bulk").await?;

        debug!(
            requested = to_fetch.len(),
            found = data.items.len(),
            "Fetched identity batch"
        );

        for (uid, account) in data.items {
            let record = Arc::new(account.user);
            self.remember(record.clone()).await;
            results.insert(uid, record);
        }

        Ok(results)
    }
}
