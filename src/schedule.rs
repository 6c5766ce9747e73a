//! Publish schedule computation.
//!
//! Pure and deterministic given "now": the next future occurrence of a
//! configured weekday at a fixed local time in the reference timezone,
//! returned as an absolute UTC instant. When today already is the target
//! weekday the date rolls forward a full week; a run never publishes the
//! same day it was produced.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Compute the next publish instant for `weekday_name` (e.g. "Friday") at
/// `publish_time` local to `tz`.
///
/// # Errors
///
/// [`rf_core::Error::InvalidArgument`] for an unrecognized weekday name or
/// a local time skipped by a DST transition.
pub fn next_publish_instant(
    weekday_name: &str,
    publish_time: NaiveTime,
    tz: Tz,
    now: DateTime<Utc>,
) -> rf_core::Result<DateTime<Utc>> {
    let target: Weekday = weekday_name.parse().map_err(|_| {
        rf_core::Error::invalid(format!("'{weekday_name}' is not a weekday name"))
    })?;

    let today = now.with_timezone(&tz).date_naive();
    let mut days_ahead = i64::from(target.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday());
    if days_ahead <= 0 {
        days_ahead += 7;
    }

    let next_day = today + Duration::days(days_ahead);
    let local = next_day.and_time(publish_time);

    local
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            rf_core::Error::invalid(format!("local time {local} does not exist in {tz}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    const PACIFIC: Tz = chrono_tz::US::Pacific;

    #[test]
    fn same_weekday_rolls_a_full_week() {
        // Monday 2025-03-10, 09:00 Pacific.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 16, 0, 0).unwrap();
        let next = next_publish_instant("Monday", noon(), PACIFIC, now).unwrap();
        // Never today: exactly 7 days out, Monday 2025-03-17 noon PDT.
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 17, 19, 0, 0).unwrap());
    }

    #[test]
    fn other_days_land_between_one_and_six_days_ahead() {
        // Wednesday 2025-03-12.
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 16, 0, 0).unwrap();
        for (day, expected_ahead) in [
            ("Thursday", 1),
            ("Friday", 2),
            ("Saturday", 3),
            ("Sunday", 4),
            ("Monday", 5),
            ("Tuesday", 6),
        ] {
            let next = next_publish_instant(day, noon(), PACIFIC, now).unwrap();
            let ahead = (next.with_timezone(&PACIFIC).date_naive()
                - now.with_timezone(&PACIFIC).date_naive())
            .num_days();
            assert_eq!(ahead, expected_ahead, "weekday {day}");
            assert!((1..=6).contains(&ahead));
        }
    }

    #[test]
    fn result_is_always_in_the_future() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 3, 30, 0).unwrap();
        for day in ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"] {
            let next = next_publish_instant(day, noon(), PACIFIC, now).unwrap();
            assert!(next > now, "weekday {day}");
        }
    }

    #[test]
    fn converts_local_noon_to_utc() {
        // Winter (PST, UTC-8): Wednesday 2025-01-08 -> Friday 2025-01-10.
        let now = Utc.with_ymd_and_hms(2025, 1, 8, 16, 0, 0).unwrap();
        let next = next_publish_instant("Friday", noon(), PACIFIC, now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 10, 20, 0, 0).unwrap());
    }

    #[test]
    fn deterministic_given_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 16, 0, 0).unwrap();
        let a = next_publish_instant("Friday", noon(), PACIFIC, now).unwrap();
        let b = next_publish_instant("Friday", noon(), PACIFIC, now).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_weekday_name() {
        let now = Utc::now();
        let err = next_publish_instant("Funday", noon(), PACIFIC, now).unwrap_err();
        assert!(matches!(err, rf_core::Error::InvalidArgument(_)));
    }
}
