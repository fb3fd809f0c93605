// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Combined date and time (`YYYY-MM-DDTHH:MM:SS[.fff][Z]`) with duration
//! arithmetic.

use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::data::time::{Date, EebusDuration, Time};
use crate::error::{Error, Result};

/// A calendar timestamp without zone offset (printed as UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub date: Date,
    pub time: Time,
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    pub fn is_valid(&self) -> bool {
        self.date.is_valid() && self.time.is_valid()
    }

    /// Parse `date 'T' time`.
    pub fn parse(s: &str) -> Result<DateTime> {
        let (date_part, time_part) = s.split_once('T').ok_or(Error::Parse)?;
        Ok(DateTime::new(
            Date::parse(date_part)?,
            Time::parse(time_part)?,
        ))
    }

    /// Canonical `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_text(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.date.year,
            self.date.month,
            self.date.day,
            self.time.hour,
            self.time.min,
            self.time.sec
        )
    }

    /// Current wall-clock time (UTC).
    pub fn now() -> DateTime {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        DateTime::from_unix_seconds(secs)
    }

    /// Civil date/time from seconds since the Unix epoch.
    pub(crate) fn from_unix_seconds(secs: i64) -> DateTime {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400) as i32;

        let time = Time::new(rem / 3600, (rem / 60) % 60, rem % 60);

        let mut date = Date::new(1970, 1, 1);
        date.day += days as i32;

        let mut dt = DateTime::new(date, time);
        dt.normalize_days();
        dt
    }

    /// Add a (possibly negative) duration, normalising seconds through
    /// years. Day/month overflow uses the actual days per month.
    pub fn add_duration(&mut self, duration: &EebusDuration) -> Result<()> {
        if !self.is_valid() || !duration.is_valid() {
            return Err(Error::InputArgument);
        }

        self.time.sec += duration.seconds;
        normalize(&mut self.time.sec, &mut self.time.min, 60);
        self.time.min += duration.minutes;
        normalize(&mut self.time.min, &mut self.time.hour, 60);
        self.time.hour += duration.hours;
        normalize(&mut self.time.hour, &mut self.date.day, 24);
        self.date.day += duration.days;
        self.normalize_days();
        self.date.month += duration.months;
        self.normalize_months();
        self.date.year += duration.years;

        Ok(())
    }

    fn normalize_months(&mut self) {
        // Months are 1-based; shift to 0-based for the modulo step.
        self.date.month -= 1;
        normalize(&mut self.date.month, &mut self.date.year, 12);
        self.date.month += 1;
    }

    fn normalize_days(&mut self) {
        self.date.day -= 1;

        if self.date.day >= 0 {
            let mut days_in_month = self.date.days_in_month();
            while self.date.day >= days_in_month {
                self.date.day -= days_in_month;
                self.date.month += 1;
                self.normalize_months();
                days_in_month = self.date.days_in_month();
            }
        } else {
            while self.date.day < 0 {
                self.date.month -= 1;
                self.normalize_months();
                self.date.day += self.date.days_in_month();
            }
        }

        self.date.day += 1;
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(
            self.date
                .cmp(&other.date)
                .then(self.time.cmp(&other.time)),
        )
    }
}

/// Carry `field` into `next` so that `0 <= field < max`, handling negative
/// underflow symmetrically.
fn normalize(field: &mut i32, next: &mut i32, max: i32) {
    let rem = *field % max;
    if *field >= max {
        *next += *field / max;
        *field = rem;
    } else if *field < 0 {
        if rem == 0 {
            *next -= -*field / max;
            *field = 0;
        } else {
            *next -= 1 + -*field / max;
            *field = max + rem;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!(dt("2024-03-01T10:20:30").to_text(), "2024-03-01T10:20:30Z");
        assert_eq!(
            dt("2024-03-01T10:20:30.500Z").to_text(),
            "2024-03-01T10:20:30Z"
        );
        assert!(DateTime::parse("2024-03-01 10:20:30").is_err());
    }

    #[test]
    fn test_add_duration_simple() {
        let mut t = dt("2024-03-01T10:20:30");
        t.add_duration(&EebusDuration::hms(1, 30, 15)).unwrap();
        assert_eq!(t.to_text(), "2024-03-01T11:50:45Z");
    }

    #[test]
    fn test_add_duration_day_overflow() {
        let mut t = dt("2024-01-31T23:30:00");
        t.add_duration(&EebusDuration::hms(1, 0, 0)).unwrap();
        assert_eq!(t.to_text(), "2024-02-01T00:30:00Z");
    }

    #[test]
    fn test_add_duration_leap_year() {
        let mut t = dt("2024-02-28T12:00:00");
        t.add_duration(&EebusDuration {
            days: 1,
            ..EebusDuration::default()
        })
        .unwrap();
        assert_eq!(t.to_text(), "2024-02-29T12:00:00Z");

        let mut t = dt("2023-02-28T12:00:00");
        t.add_duration(&EebusDuration {
            days: 1,
            ..EebusDuration::default()
        })
        .unwrap();
        assert_eq!(t.to_text(), "2023-03-01T12:00:00Z");
    }

    #[test]
    fn test_add_negative_duration_is_inverse() {
        let orig = dt("2024-03-15T08:45:10");
        let d = EebusDuration::parse("P1M2DT3H4M5S").unwrap();

        let mut t = orig;
        t.add_duration(&d).unwrap();
        t.add_duration(&d.inverted()).unwrap();
        assert_eq!(t, orig);
    }

    #[test]
    fn test_add_duration_year_underflow() {
        let mut t = dt("2024-01-01T00:00:00");
        t.add_duration(&EebusDuration::hms(0, 0, -1)).unwrap();
        assert_eq!(t.to_text(), "2023-12-31T23:59:59Z");
    }

    #[test]
    fn test_from_unix_seconds() {
        assert_eq!(
            DateTime::from_unix_seconds(0).to_text(),
            "1970-01-01T00:00:00Z"
        );
        // 2024-02-29T12:00:00Z
        assert_eq!(
            DateTime::from_unix_seconds(1_709_208_000).to_text(),
            "2024-02-29T12:00:00Z"
        );
    }

    #[test]
    fn test_ordering() {
        assert!(dt("2024-03-01T10:00:00") < dt("2024-03-01T10:00:01"));
        assert!(dt("2024-02-29T23:59:59") < dt("2024-03-01T00:00:00"));
    }
}
