//! Coarse "how long ago" phrases for post timestamps.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Age bucket of a timestamp relative to "now".
///
/// Buckets are ordered from finest to coarsest; see [`RelativeAge::rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeAge {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    Months(i64),
    Years(i64),
}

impl RelativeAge {
    /// Coarseness of the bucket, 0 for "just now" up to 5 for years
    pub fn rank(&self) -> u8 {
        match self {
            RelativeAge::JustNow => 0,
            RelativeAge::Minutes(_) => 1,
            RelativeAge::Hours(_) => 2,
            RelativeAge::Days(_) => 3,
            RelativeAge::Months(_) => 4,
            RelativeAge::Years(_) => 5,
        }
    }
}

impl fmt::Display for RelativeAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, unit) = match *self {
            RelativeAge::JustNow => return f.write_str("just now"),
            RelativeAge::Minutes(n) => (n, "minute"),
            RelativeAge::Hours(n) => (n, "hour"),
            RelativeAge::Days(n) => (n, "day"),
            RelativeAge::Months(n) => (n, "month"),
            RelativeAge::Years(n) => (n, "year"),
        };
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{} {}{} ago", n, unit, plural)
    }
}

/// Last millisecond of `now`'s calendar day, in `now`'s time zone
fn end_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_milli_opt(23, 59, 59, 999)
        .and_then(|eod| now.timezone().from_local_datetime(&eod).latest())
        .map(|eod| eod.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc))
}

/// Bucket `timestamp` relative to `now`.
///
/// The hours bucket only applies while the timestamp falls on `now`'s
/// calendar day: a post from 23:00 yesterday viewed at 00:10 is "1 day ago".
pub fn relative_age<Tz: TimeZone>(timestamp: DateTime<Utc>, now: &DateTime<Tz>) -> RelativeAge {
    let diff_ms = (now.with_timezone(&Utc) - timestamp).num_milliseconds();
    let day_diff = (end_of_day(now) - timestamp)
        .num_milliseconds()
        .div_euclid(DAY_MS);

    if diff_ms < 5 * MINUTE_MS {
        RelativeAge::JustNow
    } else if diff_ms < HOUR_MS {
        RelativeAge::Minutes(diff_ms / MINUTE_MS)
    } else if day_diff < 1 {
        RelativeAge::Hours(diff_ms / HOUR_MS)
    } else if day_diff <= 30 {
        RelativeAge::Days(day_diff)
    } else if day_diff <= 365 {
        RelativeAge::Months(day_diff / 30)
    } else {
        RelativeAge::Years(day_diff / 365)
    }
}

/// Relative phrase for `timestamp` as seen at `now`
pub fn relative_date_at<Tz: TimeZone>(timestamp: DateTime<Utc>, now: &DateTime<Tz>) -> String {
    relative_age(timestamp, now).to_string()
}

/// Relative phrase for `timestamp` as seen right now, in local time
pub fn relative_date(timestamp: DateTime<Utc>) -> String {
    relative_date_at(timestamp, &Local::now())
}

/// Absolute timestamp in `tz`, used next to the relative phrase
pub fn format_timestamp_in<Tz: TimeZone>(timestamp: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    timestamp
        .with_timezone(tz)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    format_timestamp_in(timestamp, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};
    use proptest::prelude::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn ago(now: &DateTime<FixedOffset>, d: Duration) -> DateTime<Utc> {
        now.with_timezone(&Utc) - d
    }

    #[test]
    fn test_just_now() {
        let now = at("2026-10-19T15:00:00+00:00");
        assert_eq!(relative_date_at(ago(&now, Duration::seconds(1)), &now), "just now");
        assert_eq!(relative_date_at(ago(&now, Duration::seconds(299)), &now), "just now");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = at("2026-10-19T15:00:00+00:00");
        let future = now.with_timezone(&Utc) + Duration::hours(3);
        assert_eq!(relative_date_at(future, &now), "just now");
    }

    #[test]
    fn test_minutes() {
        let now = at("2026-10-19T15:00:00+00:00");
        assert_eq!(relative_date_at(ago(&now, Duration::minutes(5)), &now), "5 minutes ago");
        assert_eq!(
            relative_date_at(ago(&now, Duration::seconds(7 * 60 + 30)), &now),
            "7 minutes ago"
        );
        assert_eq!(relative_date_at(ago(&now, Duration::minutes(59)), &now), "59 minutes ago");
    }

    #[test]
    fn test_hours_same_day() {
        let now = at("2026-10-19T15:00:00+00:00");
        assert_eq!(relative_date_at(ago(&now, Duration::hours(2)), &now), "2 hours ago");
        assert_eq!(relative_date_at(ago(&now, Duration::minutes(60)), &now), "1 hour ago");
    }

    #[test]
    fn test_calendar_day_boundary() {
        // 23:00 yesterday, viewed at 00:10 today
        let now = at("2026-10-19T00:10:00+00:00");
        let ts = at("2026-10-18T23:00:00+00:00").with_timezone(&Utc);
        assert_eq!(relative_age(ts, &now), RelativeAge::Days(1));
        assert_eq!(relative_date_at(ts, &now), "1 day ago");
    }

    #[test]
    fn test_boundary_uses_viewer_time_zone() {
        // 10:00 UTC is still "today" for a viewer at UTC-05:00 at 08:00 local
        let now = at("2026-10-19T08:00:00-05:00");
        let ts = at("2026-10-19T10:00:00+00:00").with_timezone(&Utc);
        assert_eq!(relative_age(ts, &now), RelativeAge::Hours(3));
    }

    #[test]
    fn test_days_months_years() {
        let now = at("2026-10-19T15:00:00+00:00");
        assert_eq!(relative_date_at(ago(&now, Duration::days(3)), &now), "3 days ago");
        assert_eq!(relative_date_at(ago(&now, Duration::days(30)), &now), "30 days ago");
        assert_eq!(relative_date_at(ago(&now, Duration::days(40)), &now), "1 month ago");
        assert_eq!(relative_date_at(ago(&now, Duration::days(200)), &now), "6 months ago");
        assert_eq!(relative_date_at(ago(&now, Duration::days(400)), &now), "1 year ago");
        assert_eq!(relative_date_at(ago(&now, Duration::days(800)), &now), "2 years ago");
    }

    #[test]
    fn test_format_timestamp_uses_viewer_offset() {
        let posted = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_timestamp_in(&posted, &cest), "2026-10-01 14:00");
        let pdt = FixedOffset::west_opt(7 * 3600).unwrap();
        assert_eq!(format_timestamp_in(&posted, &pdt), "2026-10-01 05:00");
        assert_eq!(format_timestamp_in(&posted, &Utc), "2026-10-01 12:00");
    }

    #[test]
    fn test_rank_order() {
        let buckets = [
            RelativeAge::JustNow,
            RelativeAge::Minutes(10),
            RelativeAge::Hours(1),
            RelativeAge::Days(1),
            RelativeAge::Months(1),
            RelativeAge::Years(1),
        ];
        for pair in buckets.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
    }

    proptest! {
        // Older timestamps never land in a finer bucket than newer ones
        #[test]
        fn prop_bucket_coarseness_is_monotonic(
            a in 0i64..(3 * 365 * 24 * 3600),
            b in 0i64..(3 * 365 * 24 * 3600),
            hour in 0u32..24,
            minute in 0u32..60,
        ) {
            let now = at(&format!("2026-10-19T{:02}:{:02}:00+02:00", hour, minute));
            let (younger, older) = if a <= b { (a, b) } else { (b, a) };
            let r1 = relative_age(ago(&now, Duration::seconds(younger)), &now).rank();
            let r2 = relative_age(ago(&now, Duration::seconds(older)), &now).rank();
            prop_assert!(r1 <= r2);
        }
    }
}
