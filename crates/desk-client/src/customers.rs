//! Customer directory client.

use async_trait::async_trait;
use desk_core::config::UpstreamConfig;
use desk_core::error::{DeskError, Result};
use desk_core::types::CustomerProfile;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const TARGET: &str = "customer directory";
const SMS_TARGET: &str = "SMS customer directory";

/// Agent type the SMS directory is filtered to.
pub const SMS_AGENT_TYPE: &str = "SMS agent";
/// Page size requested from the SMS directory.
pub const SMS_PAGE_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
struct DirectoryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<CustomerProfile>,
}

/// Read access to customer profiles.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn list_customers(
        &self,
        authorization: Option<&str>,
    ) -> Result<Vec<CustomerProfile>>;

    /// Look up a customer by directory id. Ids are compared trimmed.
    async fn find_customer(
        &self,
        id: &str,
        authorization: Option<&str>,
    ) -> Result<Option<CustomerProfile>> {
        let id = id.trim();
        Ok(self
            .list_customers(authorization)
            .await?
            .into_iter()
            .find(|c| c.id.trim() == id))
    }

    /// Look up a customer by phone id.
    async fn find_by_phone(
        &self,
        wa_id: &str,
        authorization: Option<&str>,
    ) -> Result<Option<CustomerProfile>> {
        let wa_id = wa_id.trim();
        Ok(self
            .list_customers(authorization)
            .await?
            .into_iter()
            .find(|c| c.wa_id.trim() == wa_id))
    }
}

/// Keep customers whose name contains `query` (case-insensitive) or whose
/// phone id contains it. A blank query keeps everything.
pub fn filter_customers(customers: &[CustomerProfile], query: &str) -> Vec<CustomerProfile> {
    let query = query.trim();
    if query.is_empty() {
        return customers.to_vec();
    }
    let needle = query.to_lowercase();
    customers
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle) || c.wa_id.contains(query))
        .cloned()
        .collect()
}

/// HTTP client for the customer directory cloud function.
#[derive(Debug, Clone)]
pub struct CustomerClient {
    http: reqwest::Client,
    endpoint: Url,
    default_authorization: Option<String>,
}

impl CustomerClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::with_endpoint(config, &config.customers_url)
    }

    pub fn with_endpoint(config: &UpstreamConfig, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            DeskError::Config(format!("Invalid customers URL '{}': {}", endpoint, e))
        })?;
        Ok(Self {
            http: crate::build_http_client(config)?,
            endpoint,
            default_authorization: config.auth_token.as_ref().map(|t| format!("Bearer {}", t)),
        })
    }
}

#[async_trait]
impl CustomerDirectory for CustomerClient {
    async fn list_customers(
        &self,
        authorization: Option<&str>,
    ) -> Result<Vec<CustomerProfile>> {
        let auth = authorization.or(self.default_authorization.as_deref());
        fetch_directory(&self.http, self.endpoint.clone(), auth, TARGET).await
    }
}

/// Customers of one account's SMS agent.
#[async_trait]
pub trait SmsCustomerDirectory: Send + Sync {
    async fn list_sms_customers(
        &self,
        uid: &str,
        authorization: Option<&str>,
    ) -> Result<Vec<CustomerProfile>>;
}

/// HTTP client for the uid-scoped SMS customer list.
#[derive(Debug, Clone)]
pub struct SmsCustomerClient {
    http: reqwest::Client,
    endpoint: Url,
    default_authorization: Option<String>,
}

impl SmsCustomerClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::with_endpoint(config, &config.sms_customers_url)
    }

    pub fn with_endpoint(config: &UpstreamConfig, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            DeskError::Config(format!("Invalid SMS customers URL '{}': {}", endpoint, e))
        })?;
        Ok(Self {
            http: crate::build_http_client(config)?,
            endpoint,
            default_authorization: config.auth_token.as_ref().map(|t| format!("Bearer {}", t)),
        })
    }

    fn request_url(&self, uid: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("uid", uid)
            .append_pair("type", SMS_AGENT_TYPE)
            .append_pair("limit", &SMS_PAGE_LIMIT.to_string());
        url
    }
}

#[async_trait]
impl SmsCustomerDirectory for SmsCustomerClient {
    async fn list_sms_customers(
        &self,
        uid: &str,
        authorization: Option<&str>,
    ) -> Result<Vec<CustomerProfile>> {
        let uid = uid.trim();
        if uid.is_empty() {
            return Err(DeskError::InvalidInput("User ID is required".into()));
        }
        let auth = authorization.or(self.default_authorization.as_deref());
        fetch_directory(&self.http, self.request_url(uid), auth, SMS_TARGET).await
    }
}

/// GET a directory listing. 404 and 403 read as an empty directory.
async fn fetch_directory(
    http: &reqwest::Client,
    url: Url,
    authorization: Option<&str>,
    target: &str,
) -> Result<Vec<CustomerProfile>> {
    debug!("Fetching {} from {}", target, url);
    let mut request = http.get(url);
    if let Some(auth) = authorization {
        request = request.header(AUTHORIZATION, auth);
    }

    let response = request
        .send()
        .await
        .map_err(|e| DeskError::transient(target, format!("request failed: {}", e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        debug!("{} returned HTTP {}; treating as empty", target, status.as_u16());
        return Ok(Vec::new());
    }
    if !status.is_success() {
        return Err(DeskError::transient(
            target,
            format!("upstream returned HTTP {}", status.as_u16()),
        ));
    }

    let body: DirectoryResponse = response
        .json()
        .await
        .map_err(|e| DeskError::transient(target, format!("invalid response body: {}", e)))?;
    if !body.success {
        return Err(DeskError::transient(target, "upstream reported success: false"));
    }
    debug!("{} returned {} customers", target, body.data.len());
    Ok(body.data)
}
