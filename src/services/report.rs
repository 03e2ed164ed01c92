//! Report composition: aggregation and HTML rendering.
//!
//! Raw status records are folded into per-status counts plus itemized
//! detail rows for the statuses a profile marks as `report_in_detail`.
//! Rendering produces the two HTML fragments the provider template expects:
//! the stats table and the detail tables. Markup mirrors what the report
//! template was built against, so it is kept byte-compatible rather than
//! pretty.

use std::collections::{BTreeMap, BTreeSet};

use chrono_tz::Tz;

use crate::domain::{format_iso, StatusRecord};

/// Detail table columns in render order, with their inline cell styles.
const DETAIL_COLUMNS: [(&str, &str); 3] = [
    ("date_time", "style=\"white-space:nowrap;\""),
    ("contact", "style=\"white-space:nowrap;width:200px;\""),
    ("subject", ""),
];

/// One itemized detail row with canonical field names.
///
/// Only fields present in the raw record are carried over; absent fields
/// render as empty cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    /// Provider message id.
    pub id: Option<i64>,
    /// Raw ISO arrival timestamp; formatted at render time.
    pub date_time: Option<String>,
    /// Recipient address.
    pub contact: Option<String>,
    /// Status code.
    pub state: String,
    /// Message subject.
    pub subject: Option<String>,
}

impl From<&StatusRecord> for DetailRow {
    fn from(record: &StatusRecord) -> Self {
        Self {
            id: record.id,
            date_time: record.arrived_at.clone(),
            contact: record.contact.clone(),
            state: record.status.clone(),
            subject: record.subject.clone(),
        }
    }
}

/// Aggregated counts and detail rows for one subaccount's window.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Events per status code.
    pub stats: BTreeMap<String, u64>,
    /// Itemized rows per detail status, in fetch order.
    pub details: BTreeMap<String, Vec<DetailRow>>,
}

impl AggregateReport {
    /// Whether no events fell into the window at all.
    pub fn has_no_data(&self) -> bool {
        self.stats.is_empty()
    }

    /// Whether no event matched a detail status.
    pub fn has_no_details(&self) -> bool {
        self.details.is_empty()
    }
}

/// Folds records into an [`AggregateReport`].
///
/// Every record increments its status count exactly once; a record is
/// additionally itemized iff its status is in `detail_statuses`.
pub fn aggregate(records: &[StatusRecord], detail_statuses: &BTreeSet<String>) -> AggregateReport {
    let mut report = AggregateReport::default();
    for record in records {
        if detail_statuses.contains(&record.status) {
            report
                .details
                .entry(record.status.clone())
                .or_default()
                .push(DetailRow::from(record));
        }
        *report.stats.entry(record.status.clone()).or_insert(0) += 1;
    }
    report
}

fn translate<'a>(translations: &'a BTreeMap<String, String>, key: &'a str) -> &'a str {
    translations.get(key).map(String::as_str).unwrap_or(key)
}

/// Renders the per-status count table.
pub fn render_stats_html(
    stats: &BTreeMap<String, u64>,
    translations: &BTreeMap<String, String>,
) -> String {
    let mut html = String::from("<table>");
    for (status, count) in stats {
        let header = translate(translations, status);
        html.push_str(&format!(
            "<tr><td style=\"width:200px;\">{header}</td><td>{count}</td></tr>"
        ));
    }
    html.push_str("</table>");
    html
}

/// Renders the detail tables, one per itemized status.
///
/// Timestamps are reformatted from the provider's ISO form into
/// `time_format` in the given zone; an unparseable timestamp is rendered
/// raw rather than failing the report. An empty detail map renders as the
/// literal `"undefined"`, which the provider template tests against.
pub fn render_details_html(
    details: &BTreeMap<String, Vec<DetailRow>>,
    translations: &BTreeMap<String, String>,
    time_format: &str,
    tz: Tz,
) -> String {
    let mut html = String::new();
    for (state, rows) in details {
        html.push_str(&format!("<h4>{}:</h4>", translate(translations, state)));
        html.push_str("<table><tr>");
        for (field, _) in DETAIL_COLUMNS {
            html.push_str(&format!("<th>{}</th>", translate(translations, field)));
        }
        html.push_str("</tr>");
        for row in rows {
            html.push_str("<tr>");
            for (field, style) in DETAIL_COLUMNS {
                let content = cell_content(row, field, time_format, tz);
                html.push_str(&format!("<td {style}>{content}</td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
    }

    if html.is_empty() {
        "undefined".to_string()
    } else {
        html
    }
}

fn cell_content(row: &DetailRow, field: &str, time_format: &str, tz: Tz) -> String {
    match field {
        "date_time" => match row.date_time.as_deref() {
            Some(raw) => format_iso(raw, time_format, tz).unwrap_or_else(|| {
                tracing::warn!(raw, "unparseable arrival timestamp in detail row");
                raw.to_string()
            }),
            None => String::new(),
        },
        "contact" => row.contact.clone().unwrap_or_default(),
        "subject" => row.subject.clone().unwrap_or_default(),
        _ => String::new(),
    }
}
