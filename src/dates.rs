use chrono::{DateTime, FixedOffset, Utc};

use crate::diagnostics::{Diagnostic, Diagnostics};

const FEED_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Parses ISO-8601 (Atom) or RFC-2822 style (RSS) timestamps.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();

    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, FEED_DATE_FORMAT))
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
}

/// Like [`parse_timestamp`], but substitutes the current time and records a
/// `timestamp-fallback` diagnostic when nothing matches.
pub fn timestamp_or_now(
    raw: &str,
    field: &'static str,
    diagnostics: &mut Diagnostics,
) -> DateTime<FixedOffset> {
    match parse_timestamp(raw) {
        Some(ts) => ts,
        None => {
            diagnostics.push(Diagnostic::TimestampFallback {
                field,
                raw: raw.to_string(),
            });
            Utc::now().fixed_offset()
        }
    }
}
