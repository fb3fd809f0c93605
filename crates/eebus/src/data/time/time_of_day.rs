// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wall-clock time of day (`HH:MM:SS[.fff][Z]`).

use crate::error::{Error, Result};

/// A time of day. Fractional seconds are accepted on parse and dropped;
/// the canonical print always carries the `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    pub hour: i32,
    pub min: i32,
    pub sec: i32,
}

impl Time {
    pub fn new(hour: i32, min: i32, sec: i32) -> Self {
        Self { hour, min, sec }
    }

    pub fn is_valid(&self) -> bool {
        (0..24).contains(&self.hour) && (0..60).contains(&self.min) && (0..60).contains(&self.sec)
    }

    /// Parse `HH:MM:SS`, optionally followed by `.fff` and/or `Z`.
    pub fn parse(s: &str) -> Result<Time> {
        let mut parts = s.splitn(3, ':');

        let hour = int_field(parts.next())?;
        let min = int_field(parts.next())?;

        let sec_part = parts.next().ok_or(Error::Parse)?;
        let sec_part = sec_part.strip_suffix('Z').unwrap_or(sec_part);
        let sec_digits = match sec_part.split_once('.') {
            Some((whole, frac)) => {
                if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::Parse);
                }
                whole
            }
            None => sec_part,
        };
        let sec = sec_digits.parse::<i32>().map_err(|_| Error::Parse)?;

        let time = Time::new(hour, min, sec);
        if !time.is_valid() {
            return Err(Error::Parse);
        }

        Ok(time)
    }

    /// Canonical `HH:MM:SSZ`.
    pub fn to_text(&self) -> String {
        format!("{:02}:{:02}:{:02}Z", self.hour, self.min, self.sec)
    }
}

fn int_field(part: Option<&str>) -> Result<i32> {
    part.ok_or(Error::Parse)?
        .parse::<i32>()
        .map_err(|_| Error::Parse)
}
