//! Display formats for server timestamps.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// `5 Jan 2026` in local time; the date prefix when unparsable.
pub fn display_date(ts: &str) -> String {
    format_in(ts, &Local, "%-d %b %Y").unwrap_or_else(|| ts.chars().take(10).collect())
}

/// `08:05` in local time; the time part of the raw string when unparsable.
pub fn display_time(ts: &str) -> String {
    format_in(ts, &Local, "%H:%M").unwrap_or_else(|| ts.get(11..16).unwrap_or(ts).to_string())
}

/// Offset-carrying timestamps are converted to `tz`; naive ones are shown as is.
fn format_in<Tz: TimeZone>(ts: &str, tz: &Tz, fmt: &str) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(tz).format(fmt).to_string());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.format(fmt).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn rfc3339_is_converted() {
        assert_eq!(
            format_in("2026-01-05T01:38:46+07:00", &Utc, "%-d %b %Y %H:%M").as_deref(),
            Some("4 Jan 2026 18:38")
        );
    }

    #[test]
    fn naive_timestamps_keep_their_wall_clock() {
        assert_eq!(display_date("2026-03-09T23:10:00.123456"), "9 Mar 2026");
        assert_eq!(display_time("2026-03-09 23:10:00"), "23:10");
    }

    #[test]
    fn garbage_falls_back_to_raw_prefix() {
        assert_eq!(display_date("2026-03-09?bad"), "2026-03-09");
        assert_eq!(display_time("2026-03-09?14:22?x"), "14:22");
        assert_eq!(display_time("soon"), "soon");
    }
}
