//! Provider capability trait and wire types.
//!
//! This module defines the [`ProviderApi`] trait which abstracts the three
//! provider HTTP calls the pipeline depends on: paginated list fetches,
//! key-directory listing (a list fetch against the key endpoint), and
//! report dispatch. The sync loop and all services are written against this
//! trait so tests substitute deterministic in-memory fakes instead of real
//! network calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can occur during provider API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or connection failure, including timeouts.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status code.
    #[error("server returned status {status}")]
    Status {
        /// The HTTP status code.
        status: u16,
    },

    /// The response body could not be parsed as expected.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// An API key/secret pair used for HTTP basic auth.
///
/// The master credential comes from the environment; per-subaccount
/// credentials come from the provider's key directory and live for one run.
#[derive(Debug, Clone)]
pub struct Credential {
    /// API key id (basic auth username).
    pub api_key: String,
    /// API secret (basic auth password).
    pub api_secret: String,
}

impl Credential {
    /// Creates a credential from a key/secret pair.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

/// The list endpoints the pipeline reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Per-message delivery status records.
    Messages,
    /// The account's API key directory.
    ApiKeys,
}

/// Filter parameters for message list fetches.
///
/// The key directory is listed without filters; [`ListFilters::default`]
/// leaves every parameter unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
    /// Inclusive lower bound, Unix seconds.
    pub from_ts: Option<i64>,
    /// Exclusive upper bound, Unix seconds.
    pub to_ts: Option<i64>,
    /// Ask the server to include subject lines.
    pub show_subject: bool,
    /// Ask the server to include recipient addresses.
    pub show_contact_alt: bool,
}

/// One page request against a list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// When set, ask only for the total record count (`countOnly=1`).
    pub count_only: bool,
    /// Page size (`Limit`).
    pub limit: Option<u32>,
    /// Page offset (`Offset`).
    pub offset: Option<u64>,
    /// Record filters, applied to the probe and every page alike.
    pub filters: ListFilters,
}

impl PageQuery {
    /// A count-only probe carrying the given filters.
    pub fn count_probe(filters: ListFilters) -> Self {
        Self {
            count_only: true,
            filters,
            ..Default::default()
        }
    }

    /// A page request at the given offset.
    pub fn page(limit: u32, offset: u64, filters: ListFilters) -> Self {
        Self {
            count_only: false,
            limit: Some(limit),
            offset: Some(offset),
            filters,
        }
    }
}

/// A page of a counted list response.
///
/// Records stay as raw JSON values here; callers deserialize them into the
/// record type appropriate for the endpoint, copying only fields that are
/// actually present.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// For a count probe, the total matching records; for a page, the
    /// number of records in this batch.
    #[serde(rename = "Count")]
    pub count: u64,
    /// The records in this batch. Absent on count probes.
    #[serde(rename = "Data", default)]
    pub data: Vec<serde_json::Value>,
}

/// Sender or recipient address on the send endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EmailAddress {
    /// Address.
    #[serde(rename = "Email")]
    pub email: String,
    /// Display name.
    #[serde(rename = "Name")]
    pub name: String,
}

/// Template variables of an outbound report message.
#[derive(Debug, Clone, Serialize)]
pub struct ReportVariables {
    /// Rendered stats table fragment.
    pub delivery_stats: String,
    /// Rendered detail tables fragment.
    pub bounce_data: String,
    /// Formatted window start.
    pub rep_start: String,
    /// Formatted window end.
    pub rep_end: String,
    /// Subaccount name.
    pub sub_account: String,
}

/// One outbound message on the send endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    /// Sender identity from the profile.
    #[serde(rename = "From")]
    pub from: EmailAddress,
    /// Recipients from the subaccount config.
    #[serde(rename = "To")]
    pub to: Vec<EmailAddress>,
    /// Provider template id from the profile.
    #[serde(rename = "TemplateID")]
    pub template_id: i64,
    /// Enables template-language processing on the provider side.
    #[serde(rename = "TemplateLanguage")]
    pub template_language: bool,
    /// Interpolated subject line.
    #[serde(rename = "Subject")]
    pub subject: String,
    /// Template variables.
    #[serde(rename = "Variables")]
    pub variables: ReportVariables,
}

/// Body of a send endpoint request.
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    /// The messages to send; this pipeline always sends exactly one.
    #[serde(rename = "Messages")]
    pub messages: Vec<OutboundMessage>,
}

/// The provider HTTP surface used by the pipeline.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Issues one GET against a counted list endpoint.
    ///
    /// Used both for count probes and for record pages; see [`PageQuery`].
    async fn fetch_page(
        &self,
        endpoint: Endpoint,
        credential: &Credential,
        query: &PageQuery,
    ) -> Result<Page>;

    /// Posts one report message to the send endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for any non-2xx response and
    /// [`ApiError::Connection`] for transport failures.
    async fn send_message(&self, credential: &Credential, request: &SendRequest) -> Result<()>;
}
