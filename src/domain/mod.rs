//! Domain types for the report pipeline.
//!
//! This module contains the validated entities the sync loop operates on,
//! the provider's wire-level status record, and timestamp helpers.

mod record;
mod subaccount;
mod time;
mod types;

pub use record::StatusRecord;
pub use subaccount::{InvalidEntry, ReportProfile, ReportRecipient, Subaccount};
pub use time::{
    format_iso, format_unix, resolve_timezone, DEFAULT_TIMEZONE, DEFAULT_TIME_FORMAT,
};
pub use types::SubaccountId;
