//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Parse a publication date as returned by the content API
///
/// Accepts RFC 3339 (`2023-03-15T10:00:00Z`), the offset-without-colon form
/// Prismic emits (`2021-03-25T19:25:28+0000`) and bare dates.
pub fn parse_publication_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(date);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt).into())
}

/// Format a date as `dd MMM yyyy` with pt-BR month abbreviations
///
/// # Examples
/// ```ignore
/// format_date_pt_br(&date) // -> "15 mar 2023"
/// ```
pub fn format_date_pt_br<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format_localized("%d %b %Y", Locale::pt_BR).to_string()
}

/// Format a raw publication date in the given timezone
///
/// Returns `None` when the date is absent or unparseable.
pub fn publication_date(raw: Option<&str>, tz: Tz) -> Option<String> {
    let raw = raw?;
    match parse_publication_date(raw) {
        Some(date) => Some(format_date_pt_br(&date.with_timezone(&tz))),
        None => {
            tracing::warn!("Unparseable publication date {:?}", raw);
            None
        }
    }
}

/// Format a date in ISO 8601 for `<time datetime>` attributes
pub fn date_xml<Tz2: TimeZone>(date: &DateTime<Tz2>) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
