//! Provider integration.
//!
//! The [`ProviderApi`] trait is the seam between the pipeline and the
//! provider's HTTP API; [`MailjetClient`] is the production implementation.

mod mailjet;
mod traits;

pub use mailjet::MailjetClient;
pub use traits::{
    ApiError, Credential, EmailAddress, Endpoint, ListFilters, OutboundMessage, Page, PageQuery,
    ProviderApi, ReportVariables, Result, SendRequest,
};
