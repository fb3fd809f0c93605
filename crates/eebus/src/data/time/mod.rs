// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Calendar types for the textual data kinds.
//!
//! These follow the EEBUS profile of ISO 8601, not the full standard:
//! canonical prints always carry `Z`, durations omit zero components, and
//! fractional seconds are accepted on parse but dropped.

mod date;
mod date_time;
mod duration;
mod time_of_day;

pub use date::Date;
pub use date_time::DateTime;
pub use duration::EebusDuration;
pub use time_of_day::Time;
