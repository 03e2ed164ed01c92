//! The reporting pipeline: fetch, aggregate, render, dispatch, orchestrate.

pub mod directory;
pub mod dispatcher;
pub mod fetcher;
pub mod report;
pub mod sync;

pub use directory::{resolve_all, ApiKeyRecord};
pub use dispatcher::{send_report, ReportWindow};
pub use fetcher::fetch_all;
pub use report::{aggregate, AggregateReport, DetailRow};
pub use sync::{CycleOutcome, RunSummary, SyncError, SyncRunner};
