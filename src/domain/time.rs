//! Timestamp formatting in the configured report timezone.
//!
//! All timestamps handled by the pipeline are either Unix seconds (window
//! bounds, watermarks) or the provider's ISO 8601 strings (record arrival
//! times). Both are rendered through strftime-style format strings taken
//! from operator configuration, so the format string itself is untrusted
//! input and is validated before use.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Timezone used when the configuration does not set one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Amsterdam;

/// Display format used when no profile or global format is configured.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolves an optional IANA zone name to a timezone.
///
/// An unknown zone name logs a warning and falls back to
/// [`DEFAULT_TIMEZONE`] rather than failing the run.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    match name {
        None => DEFAULT_TIMEZONE,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = raw, "unknown timezone name, using default");
            DEFAULT_TIMEZONE
        }),
    }
}

/// Formats a Unix timestamp in the given zone.
pub fn format_unix(ts: i64, format: &str, tz: Tz) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) => format_in_zone(&dt.with_timezone(&tz), format),
        None => {
            tracing::warn!(ts, "timestamp out of range");
            ts.to_string()
        }
    }
}

/// Formats an ISO 8601 timestamp string in the given zone.
///
/// Returns `None` if the input cannot be parsed; the caller decides how to
/// render an unparseable value.
pub fn format_iso(raw: &str, format: &str, tz: Tz) -> Option<String> {
    let dt = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(format_in_zone(&dt.with_timezone(&tz), format))
}

fn format_in_zone(dt: &DateTime<Tz>, format: &str) -> String {
    // chrono panics on rendering an invalid format string, so reject bad
    // specifiers up front and fall back to the default format.
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::warn!(format, "invalid time format string, using default");
        return dt.format(DEFAULT_TIME_FORMAT).to_string();
    }
    dt.format_with_items(items.into_iter()).to_string()
}
