// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ISO-8601-like durations (`[-]P[nY][nM][nD][T[nH][nM][nS]]`).

use std::cmp::Ordering;

use crate::error::{Error, Result};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86_400;
// Approximations: 30-day months, 365-day years.
const SECONDS_PER_MONTH: i64 = 2_592_000;
const SECONDS_PER_YEAR: i64 = 31_536_000;

/// A signed calendar duration. Valid durations have all components of the
/// same sign (or zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EebusDuration {
    pub years: i32,
    pub months: i32,
    pub days: i32,
    pub hours: i32,
    pub minutes: i32,
    pub seconds: i32,
}

impl EebusDuration {
    /// Time-only duration.
    pub fn hms(hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            ..Self::default()
        }
    }

    /// Flip the sign of every component.
    pub fn invert_sign(&mut self) {
        self.years = -self.years;
        self.months = -self.months;
        self.days = -self.days;
        self.hours = -self.hours;
        self.minutes = -self.minutes;
        self.seconds = -self.seconds;
    }

    /// The same duration with the opposite sign.
    pub fn inverted(mut self) -> Self {
        self.invert_sign();
        self
    }

    pub fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero()
            && self.years <= 0
            && self.months <= 0
            && self.days <= 0
            && self.hours <= 0
            && self.minutes <= 0
            && self.seconds <= 0
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero()
            && self.years >= 0
            && self.months >= 0
            && self.days >= 0
            && self.hours >= 0
            && self.minutes >= 0
            && self.seconds >= 0
    }

    /// Mixed-sign component sets are invalid.
    pub fn is_valid(&self) -> bool {
        self.is_zero() || self.is_negative() || self.is_positive()
    }

    /// Parse the duration grammar. An optional leading `+`/`-` applies to
    /// every component.
    pub fn parse(s: &str) -> Result<EebusDuration> {
        let mut duration = EebusDuration::default();

        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let mut rest = rest.strip_prefix('P').ok_or(Error::Parse)?;
        let mut in_time = false;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('T') {
                if in_time {
                    return Err(Error::Parse);
                }
                in_time = true;
                rest = after;
                continue;
            }

            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or(Error::Parse)?;
            if digits == 0 {
                return Err(Error::Parse);
            }

            let value = rest[..digits].parse::<i32>().map_err(|_| Error::Parse)?;
            let key = rest.as_bytes()[digits];
            duration.set_component(key, in_time, value)?;
            rest = &rest[digits + 1..];
        }

        if negative {
            duration.invert_sign();
        }

        Ok(duration)
    }

    fn set_component(&mut self, key: u8, in_time: bool, value: i32) -> Result<()> {
        if in_time {
            match key {
                b'H' => self.hours = value,
                b'M' => self.minutes = value,
                b'S' => self.seconds = value,
                _ => return Err(Error::Parse),
            }
        } else {
            match key {
                b'Y' => self.years = value,
                b'M' => self.months = value,
                b'D' => self.days = value,
                _ => return Err(Error::Parse),
            }
        }

        Ok(())
    }

    /// Canonical text: zero components omitted, `PT0S` for the zero
    /// duration, a single leading `-` for negative durations.
    pub fn to_text(&self) -> Result<String> {
        if !self.is_valid() {
            return Err(Error::InputArgument);
        }

        if self.is_zero() {
            return Ok("PT0S".to_owned());
        }

        let mut out = String::new();
        if self.is_negative() {
            out.push('-');
        }
        out.push('P');

        push_component(&mut out, self.years, 'Y');
        push_component(&mut out, self.months, 'M');
        push_component(&mut out, self.days, 'D');

        if self.hours != 0 || self.minutes != 0 || self.seconds != 0 {
            out.push('T');
            push_component(&mut out, self.hours, 'H');
            push_component(&mut out, self.minutes, 'M');
            push_component(&mut out, self.seconds, 'S');
        }

        Ok(out)
    }

    /// Total seconds using the 30-day-month / 365-day-year approximation.
    pub fn to_seconds(&self) -> i64 {
        if !self.is_valid() {
            return 0;
        }

        i64::from(self.years) * SECONDS_PER_YEAR
            + i64::from(self.months) * SECONDS_PER_MONTH
            + i64::from(self.days) * SECONDS_PER_DAY
            + i64::from(self.hours) * SECONDS_PER_HOUR
            + i64::from(self.minutes) * SECONDS_PER_MINUTE
            + i64::from(self.seconds)
    }
}

impl PartialOrd for EebusDuration {
    /// Component-wise ordering by significance. Invalid durations compare
    /// equal to everything, mirroring the lenient original behaviour.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if !self.is_valid() || !other.is_valid() {
            return Some(Ordering::Equal);
        }

        Some(
            self.years
                .cmp(&other.years)
                .then(self.months.cmp(&other.months))
                .then(self.days.cmp(&other.days))
                .then(self.hours.cmp(&other.hours))
                .then(self.minutes.cmp(&other.minutes))
                .then(self.seconds.cmp(&other.seconds)),
        )
    }
}

fn push_component(out: &mut String, value: i32, key: char) {
    if value != 0 {
        out.push_str(&value.abs().to_string());
        // Sign is carried once, in front of 'P'.
        out.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_only() {
        let d = EebusDuration::parse("PT1H30M15S").unwrap();
        assert_eq!(d, EebusDuration::hms(1, 30, 15));
        assert_eq!(d.to_seconds(), 5415);
        assert_eq!(d.to_text().unwrap(), "PT1H30M15S");
    }

    #[test]
    fn test_parse_full_grammar() {
        let d = EebusDuration::parse("P1Y2M3DT4H5M6S").unwrap();
        assert_eq!(
            d,
            EebusDuration {
                years: 1,
                months: 2,
                days: 3,
                hours: 4,
                minutes: 5,
                seconds: 6,
            }
        );
    }

    #[test]
    fn test_parse_negative() {
        let d = EebusDuration::parse("-PT90S").unwrap();
        assert_eq!(d.seconds, -90);
        assert!(d.is_negative());
        assert_eq!(d.to_text().unwrap(), "-PT90S");
    }

    #[test]
    fn test_invert_round_trip() {
        let d = EebusDuration::parse("PT1H30M15S").unwrap();
        assert_eq!(d.inverted().to_text().unwrap(), "-PT1H30M15S");
        assert_eq!(d.inverted().inverted(), d);
    }

    #[test]
    fn test_zero_canonical_form() {
        assert_eq!(EebusDuration::parse("P").unwrap().to_text().unwrap(), "PT0S");
        assert_eq!(EebusDuration::parse("PT0S").unwrap().to_text().unwrap(), "PT0S");
        assert!(!EebusDuration::default().is_negative());
        assert!(!EebusDuration::default().is_positive());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(EebusDuration::parse("1H").is_err());
        assert!(EebusDuration::parse("PT1X").is_err());
        assert!(EebusDuration::parse("PTT1H").is_err());
        assert!(EebusDuration::parse("PT H").is_err());
        assert!(EebusDuration::parse("PT1").is_err());
    }

    #[test]
    fn test_mixed_sign_invalid() {
        let mut d = EebusDuration::hms(1, 0, 0);
        d.days = -1;
        assert!(!d.is_valid());
        assert!(d.to_text().is_err());
        assert_eq!(d.to_seconds(), 0);
    }

    #[test]
    fn test_ordering() {
        let small = EebusDuration::parse("PT30M").unwrap();
        let big = EebusDuration::parse("PT1H").unwrap();
        assert!(small < big);
        assert!(big > small);
    }
}
