//! Mailjet REST API client.
//!
//! Implements [`ProviderApi`] against the Mailjet v3 REST API using basic
//! auth. Every call shares one `reqwest` client with a fixed 10-second
//! timeout; a timed-out call is reported as a connection error and the
//! affected subaccount cycle fails without retry.

use async_trait::async_trait;

use super::traits::{
    ApiError, Credential, Endpoint, Page, PageQuery, ProviderApi, Result, SendRequest,
};

const MAILJET_BASE_URL: &str = "https://api.mailjet.com";
const SEND_PATH: &str = "/v3.1/send";

/// Per-call timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Messages => "/v3/REST/message",
            Endpoint::ApiKeys => "/v3/REST/apikey",
        }
    }
}

/// Mailjet API client.
pub struct MailjetClient {
    client: reqwest::Client,
    base_url: String,
}

impl MailjetClient {
    /// Creates a client against the production API.
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Self::with_base_url(MAILJET_BASE_URL)
    }

    /// Creates a client against an alternate base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

fn query_params(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if query.count_only {
        params.push(("countOnly", "1".to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("Limit", limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("Offset", offset.to_string()));
    }
    let filters = &query.filters;
    if let Some(from_ts) = filters.from_ts {
        params.push(("FromTS", from_ts.to_string()));
    }
    if let Some(to_ts) = filters.to_ts {
        params.push(("ToTS", to_ts.to_string()));
    }
    if filters.show_subject {
        params.push(("ShowSubject", "true".to_string()));
    }
    if filters.show_contact_alt {
        params.push(("ShowContactAlt", "true".to_string()));
    }
    params
}

#[async_trait]
impl ProviderApi for MailjetClient {
    async fn fetch_page(
        &self,
        endpoint: Endpoint,
        credential: &Credential,
        query: &PageQuery,
    ) -> Result<Page> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let response = self
            .client
            .get(&url)
            .basic_auth(&credential.api_key, Some(&credential.api_secret))
            .query(&query_params(query))
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Page>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn send_message(&self, credential: &Credential, request: &SendRequest) -> Result<()> {
        let url = format!("{}{}", self.base_url, SEND_PATH);
        let response = self
            .client
            .post(&url)
            .basic_auth(&credential.api_key, Some(&credential.api_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
