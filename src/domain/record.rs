//! The per-message status record returned by the provider's list endpoint.

use serde::Deserialize;

/// One delivery/bounce event as reported by the message list endpoint.
///
/// Every field except `Status` is optional on the wire: the provider only
/// includes `Subject` and `ContactAlt` when the corresponding `Show*` query
/// parameters are set, and older records may lack fields entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRecord {
    /// Provider-assigned message id.
    #[serde(rename = "ID")]
    pub id: Option<i64>,
    /// Arrival timestamp in the provider's ISO 8601 format.
    #[serde(rename = "ArrivedAt")]
    pub arrived_at: Option<String>,
    /// Recipient address.
    #[serde(rename = "ContactAlt")]
    pub contact: Option<String>,
    /// Delivery status code, e.g. `"sent"`, `"bounce"`, `"blocked"`.
    #[serde(rename = "Status")]
    pub status: String,
    /// Message subject line.
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
}
