//! Trading-date parsing.
//!
//! The historical store keeps `"Date"` as text written by whatever ingestion job loaded
//! it. [`parse_trading_date`] accepts the shapes seen in practice and reduces them to a
//! calendar date on the exchange's local clock:
//!
//! - `"2024-03-08"` -> 2024-03-08
//! - `"2024-03-08 00:00:00"` / `"2024-03-08T16:00:00.000"` -> naive, already exchange-local
//! - `"2024-03-08T21:00:00Z"` -> 2024-03-08 in `America/New_York`
//! - `"2024-03-09T03:00:00+00:00"` -> 2024-03-08 in `America/New_York`
//!
//! Offset-carrying timestamps are converted with [`chrono_tz`] so DST transitions are
//! handled by the tz database rather than a fixed offset.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// Default exchange time zone for US equities.
pub const DEFAULT_EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a stored trading date into a calendar date in `exchange_tz`.
///
/// Returns `None` for anything that is not one of the accepted shapes; the loader
/// treats that as a malformed row.
pub fn parse_trading_date(raw: &str, exchange_tz: Tz) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&exchange_tz).date_naive());
    }
    // "2024-03-08 21:00:00+00:00" is common from pandas; rfc3339 insists on 'T'.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&exchange_tz).date_naive());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Parse an IANA time zone name such as `"America/New_York"`.
pub fn parse_tz(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn plain_iso_date() {
        assert_eq!(
            parse_trading_date("2024-03-08", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
        assert_eq!(
            parse_trading_date(" 2024-03-08 ", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
    }

    #[test]
    fn naive_timestamps_keep_their_calendar_date() {
        assert_eq!(
            parse_trading_date("2024-03-08 00:00:00", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
        assert_eq!(
            parse_trading_date("2024-03-08T23:59:59.500", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
    }

    #[test]
    fn offset_timestamps_are_converted_to_exchange_local() {
        // 03:00 UTC on the 9th is 22:00 on the 8th in New York (EST, -05:00)
        assert_eq!(
            parse_trading_date("2024-03-09T03:00:00+00:00", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
        assert_eq!(
            parse_trading_date("2024-03-09 03:00:00+00:00", DEFAULT_EXCHANGE_TZ),
            Some(d(2024, 3, 8))
        );
        assert_eq!(
            parse_trading_date("2024-03-08T21:00:00Z", chrono_tz::UTC),
            Some(d(2024, 3, 8))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        for raw in ["", "   ", "not a date", "2024-13-01", "2024-02-30", "08/03/2024"] {
            assert_eq!(parse_trading_date(raw, DEFAULT_EXCHANGE_TZ), None, "{raw}");
        }
    }

    #[test]
    fn tz_names() {
        assert_eq!(parse_tz("America/New_York"), Some(DEFAULT_EXCHANGE_TZ));
        assert_eq!(parse_tz("Mars/Olympus_Mons"), None);
    }
}
