//! Time related utils.

use crate::Result;
use chrono::{NaiveDateTime, Utc};

/// DateTime is the alias of `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Compact timestamp format: `20060102T150405Z`.
const COMPACT_DATETIME: &str = "%Y%m%dT%H%M%SZ";

/// The textual date format the remote signer and the storage provider agree
/// on: `Mon, 02 Jan 2006 15:04:05 UTC`.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S UTC";

/// Create a new DateTime that represents the current moment.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format a DateTime into the compact form: `20060102T150405Z`.
pub fn format_compact_datetime(t: DateTime) -> String {
    t.format(COMPACT_DATETIME).to_string()
}

/// Format a DateTime into the provider's textual form:
/// `Mon, 02 Jan 2006 15:04:05 UTC`.
pub fn format_http_date(t: DateTime) -> String {
    t.format(HTTP_DATE).to_string()
}

/// Parse a compact timestamp (`20060102T150405Z`) into a DateTime.
///
/// The pattern is strict: zero-padded UTC fields and the literal trailing
/// `Z`. Anything else, including a missing `Z` or trailing garbage, is a
/// format error, never a panic.
pub fn parse_compact_datetime(s: &str) -> Result<DateTime> {
    let naive = NaiveDateTime::parse_from_str(s, COMPACT_DATETIME)?;
    Ok(naive.and_utc())
}
