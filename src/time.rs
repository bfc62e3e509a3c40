//! Julian date conversions.
//!
//! All conversions treat UTC as a uniform day count (no leap-second bookkeeping),
//! which is far below the precision of the tabulated measurement epochs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::constants::{JD_UNIX_EPOCH, SECONDS_PER_DAY};

/// Julian date of a calendar date at 00:00 UTC.
pub fn date_to_jd(date: NaiveDate) -> Option<f64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(datetime_to_jd(midnight))
}

/// Julian date of a naive UTC timestamp.
pub fn datetime_to_jd(datetime: NaiveDateTime) -> f64 {
    let utc = datetime.and_utc();
    let seconds = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
    seconds / SECONDS_PER_DAY + JD_UNIX_EPOCH
}

/// Convert a decimal year (e.g. `2012.4567`) to a Julian date.
///
/// The fractional part is a fraction of that calendar year's actual length, so
/// leap years are 366 days long: `jd(Jan 1, Y) + frac * (jd(Jan 1, Y+1) - jd(Jan 1, Y))`.
pub fn decimal_year_to_jd(decimal_year: f64) -> Option<f64> {
    if !decimal_year.is_finite() {
        return None;
    }
    let year = decimal_year.floor();
    let year_i32 = i32::try_from(year as i64).ok()?;

    let start = date_to_jd(NaiveDate::from_ymd_opt(year_i32, 1, 1)?)?;
    let end = date_to_jd(NaiveDate::from_ymd_opt(year_i32.checked_add(1)?, 1, 1)?)?;

    Some(start + (decimal_year - year) * (end - start))
}

/// Convert a Julian date to a UTC timestamp.
pub fn jd_to_datetime(jd: f64) -> Option<DateTime<Utc>> {
    if !jd.is_finite() {
        return None;
    }
    let seconds = (jd - JD_UNIX_EPOCH) * SECONDS_PER_DAY;
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Calendar date (UTC) containing the given Julian date.
pub fn jd_to_date(jd: f64) -> Option<NaiveDate> {
    jd_to_datetime(jd).map(|dt| dt.date_naive())
}

/// `YYYY-MM-DD` for a Julian date, or `"-"` if it is out of range.
pub fn format_jd_date(jd: f64) -> String {
    jd_to_date(jd)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j2000_midnight() {
        let jd = date_to_jd(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()).unwrap();
        assert!((jd - 2451544.5).abs() < 1e-9);
    }

    #[test]
    fn decimal_year_uses_actual_year_length() {
        assert!((decimal_year_to_jd(2000.0).unwrap() - 2451544.5).abs() < 1e-9);
        // 2000 is a leap year: half of it is 183 days.
        assert!((decimal_year_to_jd(2000.5).unwrap() - (2451544.5 + 183.0)).abs() < 1e-6);
        // 2001 is not: half of it is 182.5 days.
        assert!((decimal_year_to_jd(2001.5).unwrap() - (2451910.5 + 182.5)).abs() < 1e-6);
    }

    #[test]
    fn decimal_year_rejects_non_finite() {
        assert!(decimal_year_to_jd(f64::NAN).is_none());
        assert!(decimal_year_to_jd(f64::INFINITY).is_none());
    }

    #[test]
    fn jd_to_calendar_date() {
        assert_eq!(jd_to_date(2458849.5), NaiveDate::from_ymd_opt(2020, 1, 1));
        // Noon of the same day is still the same calendar date.
        assert_eq!(jd_to_date(2458850.0), NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(format_jd_date(2451544.5), "2000-01-01");
        assert_eq!(format_jd_date(f64::NAN), "-");
    }
}
