use std::collections::HashSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};

/// Send-window predicate, evaluated in the deployment's fixed local timezone
/// rather than UTC: gateway-side abuse detection is time-of-day sensitive.
/// Both bounds of the window are inclusive. A window with `start > end`
/// spans midnight (e.g. 22:00-06:00); the weekday check always applies to
/// the current local day.
#[derive(Debug, Clone)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub weekdays: HashSet<Weekday>,
    pub utc_offset: FixedOffset,
}

impl BusinessHours {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.utc_offset);
        if !self.weekdays.contains(&local.weekday()) {
            return false;
        }
        let time = local.time();
        if self.start <= self.end {
            time >= self.start && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }

    /// Open around the clock, every day. Used by tests and manual runs.
    pub fn always_open(utc_offset: FixedOffset) -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
            weekdays: all_weekdays(),
            utc_offset,
        }
    }
}

pub fn all_weekdays() -> HashSet<Weekday> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours() -> BusinessHours {
        BusinessHours {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            weekdays: [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
                .into_iter()
                .collect(),
            // UTC-3, the fixed Brazilian offset
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
        }
    }

    #[test]
    fn open_inside_window() {
        // 2024-06-12 is a Wednesday; 15:00 UTC is 12:00 local
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap();
        assert!(hours().is_open(now));
    }

    #[test]
    fn bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 6, 12, 11, 0, 0).unwrap(); // 08:00 local
        let end = Utc.with_ymd_and_hms(2024, 6, 12, 23, 0, 0).unwrap(); // 20:00 local
        assert!(hours().is_open(start));
        assert!(hours().is_open(end));
    }

    #[test]
    fn closed_before_and_after_window() {
        let early = Utc.with_ymd_and_hms(2024, 6, 12, 10, 59, 0).unwrap(); // 07:59 local
        let late = Utc.with_ymd_and_hms(2024, 6, 12, 23, 1, 0).unwrap(); // 20:01 local
        assert!(!hours().is_open(early));
        assert!(!hours().is_open(late));
    }

    #[test]
    fn overnight_window_spans_midnight() {
        let mut hours = hours();
        hours.start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        hours.end = NaiveTime::from_hms_opt(6, 0, 0).unwrap();

        // 23:00 local Wednesday
        assert!(hours.is_open(Utc.with_ymd_and_hms(2024, 6, 13, 2, 0, 0).unwrap()));
        // 01:00 local Thursday, past midnight
        assert!(hours.is_open(Utc.with_ymd_and_hms(2024, 6, 13, 4, 0, 0).unwrap()));
        // midday stays closed
        assert!(!hours.is_open(Utc.with_ymd_and_hms(2024, 6, 12, 15, 0, 0).unwrap()));
    }

    #[test]
    fn weekday_checked_in_local_time() {
        // 2024-06-15 is a Saturday
        let saturday = Utc.with_ymd_and_hms(2024, 6, 15, 15, 0, 0).unwrap();
        assert!(!hours().is_open(saturday));

        // 01:00 UTC Saturday is still 22:00 Friday local; weekday passes but
        // the window is already closed
        let friday_night = Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap();
        assert!(!hours().is_open(friday_night));
    }
}
