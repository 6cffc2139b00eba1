use chrono::{DateTime, Datelike as _, FixedOffset, NaiveDate, TimeZone as _, Utc};
use chrono_tz::Tz;

/// Time zone every publication date is displayed in.
pub const DISPLAY_TZ: Tz = chrono_tz::America::Sao_Paulo;

/// Rendered in place of a date that could not be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const MONTHS_ABBREV: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Display patterns. Listing and detail pages deliberately differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePreset {
    /// `25 março 2021`
    Listing,
    /// `25 mar 2021`
    Detail,
}

/// Formats an ISO-8601 timestamp for display.
///
/// Never fails: unparseable input (including the empty string) yields
/// [`INVALID_DATE`]. Callers holding an optional date should skip formatting
/// when it is absent instead of passing an empty string.
pub fn format_date(iso: &str, preset: DatePreset) -> String {
    let Some(instant) = parse_timestamp(iso) else {
        return INVALID_DATE.to_string();
    };

    let local = instant.with_timezone(&DISPLAY_TZ);
    let month = local.month0() as usize;
    let month_name = match preset {
        DatePreset::Listing => MONTHS[month],
        DatePreset::Detail => MONTHS_ABBREV[month],
    };
    format!("{:02} {} {}", local.day(), month_name, local.year())
}

/// Accepts RFC 3339, the content API's `+0000` offset style, and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(s, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
