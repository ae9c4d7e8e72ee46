use std::fmt;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::constants::{MODEL_UPDATE_HOURS, MODEL_UPDATE_INTERVAL_HOURS, RUN_STAMP_FORMAT};

/// A single GEFS model execution, identified by its UTC initialisation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForecastRun(DateTime<Utc>);

impl ForecastRun {
    /// The previously scheduled run.
    pub fn fallback(self) -> Self {
        Self(self.0 - Duration::hours(MODEL_UPDATE_INTERVAL_HOURS))
    }

    pub fn stamp(&self) -> String {
        self.0.format(RUN_STAMP_FORMAT).to_string()
    }
}

impl fmt::Display for ForecastRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Z", self.stamp())
    }
}

pub fn latest_run(now: DateTime<Utc>) -> ForecastRun {
    let hour = MODEL_UPDATE_HOURS
        .iter()
        .copied()
        .filter(|hour| *hour <= now.hour())
        .max()
        .unwrap_or(0);
    let since_run = Duration::hours(i64::from(now.hour() - hour))
        + Duration::minutes(i64::from(now.minute()))
        + Duration::seconds(i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    ForecastRun(now - since_run)
}

/// Primary run first, then the one scheduled before it.
pub fn run_candidates(now: DateTime<Utc>) -> [ForecastRun; 2] {
    let latest = latest_run(now);
    [latest, latest.fallback()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 17)
            .single()
            .unwrap()
    }

    #[test]
    fn latest_run_is_greatest_update_hour_not_after_now() {
        for hour in 0..24 {
            let now = utc(2025, 6, 29, hour, 42);
            let run = latest_run(now).0;
            assert!(MODEL_UPDATE_HOURS.contains(&run.hour()));
            assert!(run.hour() <= hour);
            assert!(MODEL_UPDATE_HOURS
                .iter()
                .filter(|candidate| **candidate <= hour)
                .all(|candidate| *candidate <= run.hour()));
            assert_eq!((run.minute(), run.second(), run.nanosecond()), (0, 0, 0));
            assert_eq!(run.date_naive(), now.date_naive());
        }
    }

    #[test]
    fn run_hours_are_inclusive() {
        assert_eq!(latest_run(utc(2025, 6, 29, 12, 0)).stamp(), "2025062912");
        assert_eq!(latest_run(utc(2025, 6, 29, 11, 59)).stamp(), "2025062906");
        assert_eq!(latest_run(utc(2025, 6, 29, 23, 59)).stamp(), "2025062918");
    }

    #[test]
    fn fallback_crosses_midnight() {
        let run = latest_run(utc(2025, 1, 1, 3, 0));
        assert_eq!(run.stamp(), "2025010100");
        assert_eq!(run.fallback().stamp(), "2024123118");
    }

    #[test]
    fn candidates_are_primary_then_previous_run() {
        let [primary, fallback] = run_candidates(utc(2025, 6, 29, 14, 5));
        assert_eq!(primary.stamp(), "2025062912");
        assert_eq!(fallback.stamp(), "2025062906");
        assert_eq!(primary.to_string(), "2025062912Z");
    }
}
