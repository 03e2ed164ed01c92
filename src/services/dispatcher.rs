//! Report dispatch with per-subaccount skip policy.
//!
//! Builds the outbound report message and posts it through the provider's
//! send endpoint. Dispatch always uses the master credential, even though
//! message data was fetched with the subaccount's scoped credential: sending
//! is centralized on the top-level account.

use std::collections::BTreeMap;

use crate::config::GlobalSettings;
use crate::domain::{format_unix, Subaccount};
use crate::providers::{
    Credential, EmailAddress, OutboundMessage, ProviderApi, ReportVariables, Result, SendRequest,
};
use crate::services::report::{render_details_html, render_stats_html, AggregateReport};

/// Stats fragment when the window contained no events at all.
const NO_DATA_FALLBACK: &str = "No data";

/// The `[watermark, now)` window a report covers, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    /// Inclusive start (the previous watermark).
    pub start: i64,
    /// Exclusive end (this run's `now`).
    pub end: i64,
}

/// Sends one subaccount's report, honoring its skip policy.
///
/// Returns `Ok(false)` when the skip policy suppressed the report before
/// any network call, `Ok(true)` when the provider accepted it. Transport
/// failures and non-2xx responses surface as errors; the caller leaves the
/// watermark untouched so the next run re-covers the window.
pub async fn send_report(
    api: &dyn ProviderApi,
    master: &Credential,
    subaccount: &Subaccount,
    report: &AggregateReport,
    translations: &BTreeMap<String, String>,
    global: &GlobalSettings,
    window: ReportWindow,
) -> Result<bool> {
    if subaccount.skip_if_no_details() && report.has_no_details()
        || subaccount.skip_if_no_data() && report.has_no_data()
    {
        tracing::debug!(
            subaccount = subaccount.name,
            "skip policy suppressed empty report"
        );
        return Ok(false);
    }

    let tz = global.timezone();
    let report_time_format = global.time_format();
    let profile = &subaccount.profile;
    let detail_time_format = profile
        .time_format
        .as_deref()
        .unwrap_or(report_time_format);

    let delivery_stats = if report.has_no_data() {
        translations
            .get("no_data")
            .cloned()
            .unwrap_or_else(|| NO_DATA_FALLBACK.to_string())
    } else {
        render_stats_html(&report.stats, translations)
    };
    let bounce_data = render_details_html(&report.details, translations, detail_time_format, tz);

    let subject_date = format_unix(window.end, global.subject_date_format(), tz);
    let subject = interpolate(&profile.subject, &[&subaccount.name, &subject_date]);

    let request = SendRequest {
        messages: vec![OutboundMessage {
            from: EmailAddress {
                email: profile.from_email.clone(),
                name: profile.from_name.clone(),
            },
            to: subaccount
                .recipients
                .iter()
                .map(|r| EmailAddress {
                    email: r.email.clone(),
                    name: r.name.clone(),
                })
                .collect(),
            template_id: profile.template_id,
            template_language: true,
            subject,
            variables: ReportVariables {
                delivery_stats,
                bounce_data,
                rep_start: format_unix(window.start, report_time_format, tz),
                rep_end: format_unix(window.end, report_time_format, tz),
                sub_account: subaccount.name.clone(),
            },
        }],
    };

    api.send_message(master, &request).await?;
    Ok(true)
}

/// Replaces successive `{}` placeholders with the given arguments.
fn interpolate(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    let mut from = 0;
    for arg in args {
        if let Some(pos) = out[from..].find("{}") {
            let pos = from + pos;
            out.replace_range(pos..pos + 2, arg);
            // Resume after the inserted text so an argument containing
            // `{}` is never treated as a placeholder.
            from = pos + arg.len();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProfileConfig, RecipientConfig, SubaccountConfig};
    use crate::domain::{ReportProfile, StatusRecord};
    use crate::providers::{ApiError, Endpoint, Page, PageQuery};
    use crate::services::report::aggregate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Captures send requests; panics on unexpected fetches.
    struct SendCapture {
        sent: Mutex<Vec<SendRequest>>,
        fail: bool,
    }

    impl SendCapture {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn last(&self) -> SendRequest {
            self.sent.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderApi for SendCapture {
        async fn fetch_page(
            &self,
            _endpoint: Endpoint,
            _credential: &Credential,
            _query: &PageQuery,
        ) -> Result<Page> {
            panic!("dispatcher must not fetch");
        }

        async fn send_message(&self, _credential: &Credential, request: &SendRequest) -> Result<()> {
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(ApiError::Status { status: 500 });
            }
            Ok(())
        }
    }

    fn subaccount(skip_if_no_details: Option<bool>, skip_if_no_data: Option<bool>) -> Subaccount {
        let raw_profile = ProfileConfig {
            template_id: Some(123456),
            subject: Some("Delivery report {} ({})".to_string()),
            from_email: Some("reports@example.com".to_string()),
            from_name: Some("Reporting".to_string()),
            time_format: None,
            report_in_detail: vec!["bounce".to_string()],
            skip_if_no_details: None,
            skip_if_no_data: None,
        };
        let mut profiles = std::collections::BTreeMap::new();
        profiles.insert(
            "weekly".to_string(),
            ReportProfile::validate(&raw_profile).unwrap(),
        );
        let raw = SubaccountConfig {
            name: Some("shop".to_string()),
            profile: Some("weekly".to_string()),
            report_days: None,
            skip_if_no_details,
            skip_if_no_data,
            recipients: Some(vec![RecipientConfig {
                to_email: Some("ops@example.com".to_string()),
                to_name: Some("Ops".to_string()),
            }]),
        };
        Subaccount::validate(&raw, &profiles, "1234567").unwrap()
    }

    fn bounce_report() -> AggregateReport {
        let records = vec![StatusRecord {
            id: Some(1),
            arrived_at: Some("2026-03-02T09:15:00Z".to_string()),
            contact: Some("user@example.com".to_string()),
            status: "bounce".to_string(),
            subject: Some("Hello".to_string()),
        }];
        let detail: std::collections::BTreeSet<String> =
            std::iter::once("bounce".to_string()).collect();
        aggregate(&records, &detail)
    }

    fn global() -> GlobalSettings {
        GlobalSettings {
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
    }

    fn window() -> ReportWindow {
        ReportWindow {
            start: 1_767_225_600, // 2026-01-01 00:00:00 UTC
            end: 1_767_312_000,   // 2026-01-02 00:00:00 UTC
        }
    }

    #[tokio::test]
    async fn skip_if_no_data_suppresses_without_network() {
        let api = SendCapture::new();
        let sub = subaccount(None, Some(true));

        let sent = send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &AggregateReport::default(),
            &BTreeMap::new(),
            &global(),
            window(),
        )
        .await
        .unwrap();

        assert!(!sent);
        assert_eq!(api.sent_count(), 0);
    }

    #[tokio::test]
    async fn skip_if_no_details_suppresses_with_stats_present() {
        let api = SendCapture::new();
        let sub = subaccount(Some(true), None);

        // Stats present but nothing itemized.
        let records = vec![StatusRecord {
            id: None,
            arrived_at: None,
            contact: None,
            status: "sent".to_string(),
            subject: None,
        }];
        let report = aggregate(&records, &std::collections::BTreeSet::new());
        assert!(!report.has_no_data());

        let sent = send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &report,
            &BTreeMap::new(),
            &global(),
            window(),
        )
        .await
        .unwrap();

        assert!(!sent);
        assert_eq!(api.sent_count(), 0);
    }

    #[tokio::test]
    async fn sends_composed_message() {
        let api = SendCapture::new();
        let sub = subaccount(None, None);

        let sent = send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &bounce_report(),
            &BTreeMap::new(),
            &global(),
            window(),
        )
        .await
        .unwrap();

        assert!(sent);
        let request = api.last();
        assert_eq!(request.messages.len(), 1);
        let message = &request.messages[0];
        assert_eq!(message.template_id, 123456);
        assert!(message.template_language);
        assert_eq!(message.from.email, "reports@example.com");
        assert_eq!(message.to[0].email, "ops@example.com");
        assert_eq!(message.subject, "Delivery report shop (2026-01-02)");
        assert_eq!(message.variables.sub_account, "shop");
        assert_eq!(message.variables.rep_start, "2026-01-01 00:00:00");
        assert_eq!(message.variables.rep_end, "2026-01-02 00:00:00");
        assert!(message.variables.delivery_stats.contains("bounce"));
        assert!(message.variables.bounce_data.contains("user@example.com"));
    }

    #[tokio::test]
    async fn empty_stats_render_no_data_label() {
        let api = SendCapture::new();
        let sub = subaccount(None, None);
        let mut translations = BTreeMap::new();
        translations.insert("no_data".to_string(), "Nothing to report".to_string());

        send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &AggregateReport::default(),
            &translations,
            &global(),
            window(),
        )
        .await
        .unwrap();

        let message = &api.last().messages[0];
        assert_eq!(message.variables.delivery_stats, "Nothing to report");
        assert_eq!(message.variables.bounce_data, "undefined");
    }

    #[tokio::test]
    async fn no_data_label_falls_back_to_default() {
        let api = SendCapture::new();
        let sub = subaccount(None, None);

        send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &AggregateReport::default(),
            &BTreeMap::new(),
            &global(),
            window(),
        )
        .await
        .unwrap();

        assert_eq!(api.last().messages[0].variables.delivery_stats, "No data");
    }

    #[tokio::test]
    async fn send_failure_propagates() {
        let api = SendCapture::failing();
        let sub = subaccount(None, None);

        let result = send_report(
            &api,
            &Credential::new("m", "s"),
            &sub,
            &bounce_report(),
            &BTreeMap::new(),
            &global(),
            window(),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Status { status: 500 })));
    }

    #[test]
    fn interpolate_fills_placeholders_in_order() {
        assert_eq!(
            interpolate("Report {} on {}", &["shop", "2026-01-02"]),
            "Report shop on 2026-01-02"
        );
        // Extra args beyond available placeholders are ignored.
        assert_eq!(interpolate("Static subject", &["shop"]), "Static subject");
    }

    #[test]
    fn interpolate_ignores_braces_inside_arguments() {
        assert_eq!(
            interpolate("Report {} on {}", &["a{}b", "2026-01-02"]),
            "Report a{}b on 2026-01-02"
        );
    }
}
