//! The per-subaccount sync loop.
//!
//! [`SyncRunner`] drives one full run: an up-front validation pass over the
//! configuration produces a worklist, the credential directory is resolved
//! once, then each subaccount is fetched, aggregated, and dispatched
//! strictly in sequence. The watermark for a subaccount advances only after
//! the provider confirmed the report; every other outcome leaves it
//! untouched so the next run re-covers the same window, extended by the
//! time elapsed.
//!
//! No error crosses the per-subaccount boundary: each cycle resolves to a
//! [`CycleOutcome`] and the run continues. The only fatal error after
//! startup is a failed directory fetch, since nothing can be processed
//! without credentials.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};

use crate::config::Config;
use crate::domain::{ReportProfile, StatusRecord, Subaccount};
use crate::providers::{ApiError, Credential, Endpoint, ListFilters, ProviderApi};
use crate::services::dispatcher::{send_report, ReportWindow};
use crate::services::directory::{resolve_all, ApiKeyRecord};
use crate::services::fetcher::fetch_all;
use crate::services::report::aggregate;
use crate::storage::SyncState;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fatal sync errors that abort the run before any state is written.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The subaccount key directory could not be fetched.
    #[error("failed to fetch subaccount key directory: {0}")]
    Directory(#[source] ApiError),
}

/// Terminal state of one subaccount's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Not scheduled for today's weekday.
    SkippedSchedule,
    /// Configured subaccount has no entry in the provider's key directory.
    SkippedMissingKey,
    /// Skip policy suppressed an empty report before dispatch.
    SkippedPolicy,
    /// Fetch, aggregation, or dispatch failed; watermark untouched.
    Failed,
    /// Report dispatched and watermark advanced.
    Sent,
}

/// Aggregate counts for one run, for the final log line and exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Config entries rejected during validation.
    pub invalid: usize,
    /// Subaccounts not scheduled today.
    pub skipped_schedule: usize,
    /// Subaccounts missing from the key directory.
    pub skipped_missing_key: usize,
    /// Reports suppressed by skip policy.
    pub skipped_policy: usize,
    /// Cycles that failed on fetch or dispatch.
    pub failed: usize,
    /// Reports successfully dispatched.
    pub sent: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::SkippedSchedule => self.skipped_schedule += 1,
            CycleOutcome::SkippedMissingKey => self.skipped_missing_key += 1,
            CycleOutcome::SkippedPolicy => self.skipped_policy += 1,
            CycleOutcome::Failed => self.failed += 1,
            CycleOutcome::Sent => self.sent += 1,
        }
    }
}

/// Drives the full per-subaccount report loop.
pub struct SyncRunner<'a> {
    api: &'a dyn ProviderApi,
    config: &'a Config,
    master: Credential,
}

impl<'a> SyncRunner<'a> {
    /// Creates a runner over a provider API, a parsed configuration, and
    /// the master credential.
    pub fn new(api: &'a dyn ProviderApi, config: &'a Config, master: Credential) -> Self {
        Self {
            api,
            config,
            master,
        }
    }

    /// Runs one full sync pass at the given instant.
    ///
    /// Watermark advances happen in `state`, in memory only; the caller
    /// persists the state after a successful run.
    pub async fn run(
        &self,
        state: &mut SyncState,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, SyncError> {
        let global = &self.config.global_settings;
        let tz = global.timezone();
        let weekday_digit = char::from_digit(
            now.with_timezone(&tz).weekday().number_from_monday(),
            10,
        )
        .unwrap_or('0');
        let now_ts = now.timestamp();
        // default_max_report_days is operator input and unbounded.
        let default_last_ts =
            now_ts.saturating_sub(SECONDS_PER_DAY.saturating_mul(global.default_max_report_days()));

        let mut summary = RunSummary::default();
        let worklist = self.validate(&mut summary);

        let directory = resolve_all(self.api, &self.master).await.map_err(|err| {
            tracing::error!(error = %err, "error fetching subaccount directory, aborting");
            SyncError::Directory(err)
        })?;

        for subaccount in &worklist {
            let outcome = self
                .process(
                    subaccount,
                    &directory,
                    state,
                    weekday_digit,
                    now_ts,
                    default_last_ts,
                )
                .await;
            summary.record(outcome);
        }

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            invalid = summary.invalid,
            skipped_schedule = summary.skipped_schedule,
            skipped_missing_key = summary.skipped_missing_key,
            skipped_policy = summary.skipped_policy,
            watermarks = state.len(),
            "sync run complete"
        );
        Ok(summary)
    }

    /// Validates profiles and subaccounts, producing the worklist.
    ///
    /// Invalid entries are logged with their reason and counted; they never
    /// abort the run.
    fn validate(&self, summary: &mut RunSummary) -> Vec<Subaccount> {
        let mut profiles = BTreeMap::new();
        for (name, raw) in &self.config.profiles {
            match ReportProfile::validate(raw) {
                Ok(profile) => {
                    profiles.insert(name.clone(), profile);
                }
                Err(reason) => {
                    tracing::error!(profile = name, %reason, "profile invalid, skipping");
                }
            }
        }

        let default_report_days = self.config.global_settings.report_days();
        let mut worklist = Vec::new();
        for raw in &self.config.subaccount_reports {
            match Subaccount::validate(raw, &profiles, default_report_days) {
                Ok(subaccount) => worklist.push(subaccount),
                Err(reason) => {
                    summary.invalid += 1;
                    tracing::error!(
                        subaccount = raw.name.as_deref().unwrap_or("<unnamed>"),
                        %reason,
                        "subaccount config invalid, skipping"
                    );
                }
            }
        }
        worklist
    }

    async fn process(
        &self,
        subaccount: &Subaccount,
        directory: &BTreeMap<String, ApiKeyRecord>,
        state: &mut SyncState,
        weekday_digit: char,
        now_ts: i64,
        default_last_ts: i64,
    ) -> CycleOutcome {
        if !subaccount.scheduled_on(weekday_digit) {
            tracing::debug!(
                subaccount = subaccount.name,
                weekday = %weekday_digit,
                "not scheduled to report today, skipping"
            );
            return CycleOutcome::SkippedSchedule;
        }

        let Some(key) = directory.get(&subaccount.name) else {
            tracing::error!(
                subaccount = subaccount.name,
                "subaccount not found in provider directory, skipping"
            );
            return CycleOutcome::SkippedMissingKey;
        };
        let id = key.subaccount_id();
        let last_ts = state.watermark(&id, default_last_ts);

        let filters = ListFilters {
            from_ts: Some(last_ts),
            to_ts: Some(now_ts),
            show_subject: true,
            show_contact_alt: true,
        };
        let raw_records = match fetch_all(
            self.api,
            Endpoint::Messages,
            &key.credential(),
            &filters,
        )
        .await
        {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(
                    subaccount = subaccount.name,
                    error = %err,
                    "error fetching message data, skipping"
                );
                return CycleOutcome::Failed;
            }
        };

        let mut records = Vec::with_capacity(raw_records.len());
        for value in raw_records {
            match serde_json::from_value::<StatusRecord>(value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    // Malformed data fails the whole cycle: never report on
                    // a partial window.
                    tracing::error!(
                        subaccount = subaccount.name,
                        error = %err,
                        "malformed status record, skipping"
                    );
                    return CycleOutcome::Failed;
                }
            }
        }

        let report = aggregate(&records, &subaccount.profile.report_in_detail);
        let window = ReportWindow {
            start: last_ts,
            end: now_ts,
        };
        match send_report(
            self.api,
            &self.master,
            subaccount,
            &report,
            &self.config.status_translations,
            &self.config.global_settings,
            window,
        )
        .await
        {
            Ok(true) => {
                state.advance(id, now_ts);
                CycleOutcome::Sent
            }
            Ok(false) => CycleOutcome::SkippedPolicy,
            Err(err) => {
                tracing::error!(
                    subaccount = subaccount.name,
                    error = %err,
                    "error sending report"
                );
                CycleOutcome::Failed
            }
        }
    }
}
