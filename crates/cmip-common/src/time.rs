//! CF time reference handling for climate model output.
//!
//! CMIP5 files encode time as an offset from a reference date
//! (`days since 1850-01-01 00:00:00`) in one of several model calendars.
//! Only the arithmetic needed to categorise timesteps and to re-express
//! offsets against a different reference date is provided here.
//!
//! The `standard` and `gregorian` calendars are treated as proleptic
//! Gregorian. CMIP5 output starts well after 1582 so the Julian/Gregorian
//! switch never comes into play.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CmipError, CmipResult};

const SECONDS_PER_DAY: f64 = 86_400.0;

const CUM_DAYS_NOLEAP: [i64; 13] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365];
const CUM_DAYS_LEAP: [i64; 13] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335, 366];

/// Season labels used for `clim_season` categorisation.
pub const SEASONS: [&str; 4] = ["djf", "mam", "jja", "son"];

/// Model calendar, as named by the CF `calendar` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Calendar {
    Standard,
    Gregorian,
    ProlepticGregorian,
    NoLeap,
    AllLeap,
    Day360,
    Julian,
}

impl Calendar {
    /// CF name of the calendar.
    pub fn as_str(&self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::Gregorian => "gregorian",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
            Calendar::Julian => "julian",
        }
    }

    /// Whether two calendars share the same date arithmetic.
    pub fn is_equivalent(&self, other: &Calendar) -> bool {
        self.family() == other.family()
    }

    fn family(&self) -> u8 {
        match self {
            Calendar::Standard | Calendar::Gregorian | Calendar::ProlepticGregorian => 0,
            Calendar::NoLeap => 1,
            Calendar::AllLeap => 2,
            Calendar::Day360 => 3,
            Calendar::Julian => 4,
        }
    }

    /// Number of days in `month` of `year`, or `None` for a month outside 1-12.
    pub fn days_in_month(&self, year: i32, month: u32) -> Option<u32> {
        if !(1..=12).contains(&month) {
            return None;
        }
        let m = month as usize;
        let month_len = |cum: &[i64; 13]| (cum[m] - cum[m - 1]) as u32;
        let leap = match self {
            Calendar::Day360 => return Some(30),
            Calendar::NoLeap => false,
            Calendar::AllLeap => true,
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::Standard | Calendar::Gregorian | Calendar::ProlepticGregorian => {
                NaiveDate::from_ymd_opt(year, 2, 29).is_some()
            }
        };
        Some(if leap {
            month_len(&CUM_DAYS_LEAP)
        } else {
            month_len(&CUM_DAYS_NOLEAP)
        })
    }

    /// Day number of the given date relative to the calendar's own epoch.
    pub fn day_number(&self, year: i32, month: u32, day: u32) -> CmipResult<i64> {
        let month_len = self.days_in_month(year, month).unwrap_or(0);
        if day == 0 || day > month_len {
            return Err(CmipError::InvalidTimeUnits(format!(
                "invalid {} date {:04}-{:02}-{:02}",
                self, year, month, day
            )));
        }
        let y = year as i64;
        let m = (month - 1) as usize;
        let d = (day - 1) as i64;

        match self {
            Calendar::Standard | Calendar::Gregorian | Calendar::ProlepticGregorian => {
                let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
                    CmipError::InvalidTimeUnits(format!(
                        "invalid {} date {:04}-{:02}-{:02}",
                        self, year, month, day
                    ))
                })?;
                Ok(date.num_days_from_ce() as i64)
            }
            Calendar::NoLeap => Ok(y * 365 + CUM_DAYS_NOLEAP[m] + d),
            Calendar::AllLeap => Ok(y * 366 + CUM_DAYS_LEAP[m] + d),
            Calendar::Day360 => Ok(y * 360 + (m as i64) * 30 + d),
            Calendar::Julian => {
                let cum = if y.rem_euclid(4) == 0 {
                    CUM_DAYS_LEAP
                } else {
                    CUM_DAYS_NOLEAP
                };
                Ok(julian_days_before_year(y) + cum[m] + d)
            }
        }
    }

    /// Inverse of [`Calendar::day_number`].
    pub fn date_from_day_number(&self, days: i64) -> CmipResult<(i32, u32, u32)> {
        match self {
            Calendar::Standard | Calendar::Gregorian | Calendar::ProlepticGregorian => {
                let date = i32::try_from(days)
                    .ok()
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(|| {
                        CmipError::InvalidTimeUnits(format!("day number {} out of range", days))
                    })?;
                Ok((date.year(), date.month(), date.day()))
            }
            Calendar::NoLeap => Ok(split_fixed_year(days, 365, &CUM_DAYS_NOLEAP)),
            Calendar::AllLeap => Ok(split_fixed_year(days, 366, &CUM_DAYS_LEAP)),
            Calendar::Day360 => {
                let year = days.div_euclid(360);
                let rem = days.rem_euclid(360);
                Ok((year as i32, (rem / 30 + 1) as u32, (rem % 30 + 1) as u32))
            }
            Calendar::Julian => {
                let mut year = (days * 4).div_euclid(1461);
                while julian_days_before_year(year + 1) <= days {
                    year += 1;
                }
                while julian_days_before_year(year) > days {
                    year -= 1;
                }
                let rem = days - julian_days_before_year(year);
                let cum = if year.rem_euclid(4) == 0 {
                    &CUM_DAYS_LEAP
                } else {
                    &CUM_DAYS_NOLEAP
                };
                let (month, day) = month_and_day(rem, cum);
                Ok((year as i32, month, day))
            }
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Calendar::Standard
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Calendar {
    type Err = CmipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Calendar::Standard),
            "gregorian" => Ok(Calendar::Gregorian),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            "julian" => Ok(Calendar::Julian),
            other => Err(CmipError::InvalidTimeUnits(format!(
                "unknown calendar '{}'",
                other
            ))),
        }
    }
}

fn julian_days_before_year(year: i64) -> i64 {
    365 * year + (year + 3).div_euclid(4)
}

fn split_fixed_year(days: i64, year_len: i64, cum: &[i64; 13]) -> (i32, u32, u32) {
    let year = days.div_euclid(year_len);
    let (month, day) = month_and_day(days.rem_euclid(year_len), cum);
    (year as i32, month, day)
}

fn month_and_day(day_of_year: i64, cum: &[i64; 13]) -> (u32, u32) {
    let month = (1..=12)
        .find(|&m| day_of_year < cum[m])
        .unwrap_or(12);
    (month as u32, (day_of_year - cum[month - 1] + 1) as u32)
}

/// A date-time in a model calendar.
///
/// Not a chrono type: `360_day` dates such as February 30th are valid here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    pub fn with_time(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = hour;
        self.minute = minute;
        self.second = second;
        self
    }

    fn seconds_of_day(&self) -> f64 {
        f64::from(self.hour) * 3600.0 + f64::from(self.minute) * 60.0 + f64::from(self.second)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Step size of a time reference unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeStep {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeStep {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeStep::Days => SECONDS_PER_DAY,
            TimeStep::Hours => 3600.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Seconds => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeStep::Days => "days",
            TimeStep::Hours => "hours",
            TimeStep::Minutes => "minutes",
            TimeStep::Seconds => "seconds",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "days" | "d" => Some(TimeStep::Days),
            "hour" | "hours" | "hr" | "hrs" | "h" => Some(TimeStep::Hours),
            "minute" | "minutes" | "min" | "mins" => Some(TimeStep::Minutes),
            "second" | "seconds" | "sec" | "secs" | "s" => Some(TimeStep::Seconds),
            _ => None,
        }
    }
}

/// A CF time reference: `<step> since <origin>` in a calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub origin: CalendarDate,
    pub calendar: Calendar,
}

impl TimeUnits {
    pub fn new(step: TimeStep, origin: CalendarDate, calendar: Calendar) -> Self {
        Self {
            step,
            origin,
            calendar,
        }
    }

    /// Parse a CF units string such as `days since 1850-01-01 00:00:00`.
    pub fn parse(units: &str, calendar: Calendar) -> CmipResult<Self> {
        let invalid = || CmipError::InvalidTimeUnits(units.to_string());

        let (step, origin) = units.split_once(" since ").ok_or_else(invalid)?;
        let step = TimeStep::parse(step.trim()).ok_or_else(invalid)?;

        let origin = origin.trim().trim_end_matches('Z').trim_end_matches(" UTC");
        let (date_part, time_part) = match origin.split_once(|c: char| c == ' ' || c == 'T') {
            Some((d, t)) => (d, Some(t.trim())),
            None => (origin, None),
        };

        let mut date_fields = date_part.splitn(3, '-');
        let year: i32 = date_fields
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)?;
        let month: u32 = date_fields
            .next()
            .map(|s| s.parse().ok())
            .unwrap_or(Some(1))
            .ok_or_else(invalid)?;
        let day: u32 = date_fields
            .next()
            .map(|s| s.parse().ok())
            .unwrap_or(Some(1))
            .ok_or_else(invalid)?;

        let mut date = CalendarDate::new(year, month, day);
        if let Some(time) = time_part.filter(|t| !t.is_empty()) {
            let mut hms = time.splitn(3, ':');
            let hour = hms.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
            let minute = hms.next().map(|s| s.parse().ok()).unwrap_or(Some(0)).ok_or_else(invalid)?;
            let second = hms
                .next()
                .map(|s| s.parse::<f64>().ok().map(|v| v as u32))
                .unwrap_or(Some(0))
                .ok_or_else(invalid)?;
            // A leap second (60) is accepted.
            if hour > 23 || minute > 59 || second > 60 {
                return Err(invalid());
            }
            date = date.with_time(hour, minute, second);
        }

        // Reject origins the calendar cannot represent.
        calendar.day_number(date.year, date.month, date.day)?;

        Ok(Self::new(step, date, calendar))
    }

    /// The same reference with a different calendar name.
    pub fn with_calendar(&self, calendar: Calendar) -> Self {
        Self { calendar, ..*self }
    }

    fn origin_seconds(&self) -> CmipResult<f64> {
        let days = self
            .calendar
            .day_number(self.origin.year, self.origin.month, self.origin.day)?;
        Ok(days as f64 * SECONDS_PER_DAY + self.origin.seconds_of_day())
    }

    /// Convert an offset in these units to a calendar date.
    pub fn num2date(&self, value: f64) -> CmipResult<CalendarDate> {
        let total = self.origin_seconds()? + value * self.step.seconds();
        // Round to the nearest second to absorb float noise in stored offsets.
        let total = total.round() as i64;
        let days = total.div_euclid(SECONDS_PER_DAY as i64);
        let secs = total.rem_euclid(SECONDS_PER_DAY as i64) as u32;
        let (year, month, day) = self.calendar.date_from_day_number(days)?;
        Ok(CalendarDate::new(year, month, day).with_time(secs / 3600, (secs % 3600) / 60, secs % 60))
    }

    /// Convert a calendar date to an offset in these units.
    pub fn date2num(&self, date: &CalendarDate) -> CmipResult<f64> {
        let days = self.calendar.day_number(date.year, date.month, date.day)?;
        let seconds = days as f64 * SECONDS_PER_DAY + date.seconds_of_day();
        Ok((seconds - self.origin_seconds()?) / self.step.seconds())
    }

    /// Re-express an offset in these units as an offset in `target` units.
    ///
    /// Both references must use equivalent calendars.
    pub fn convert_to(&self, value: f64, target: &TimeUnits) -> CmipResult<f64> {
        if !self.calendar.is_equivalent(&target.calendar) {
            return Err(CmipError::InvalidTimeUnits(format!(
                "cannot convert between calendars {} and {}",
                self.calendar, target.calendar
            )));
        }
        let seconds = self.origin_seconds()? + value * self.step.seconds();
        Ok((seconds - target.origin_seconds()?) / target.step.seconds())
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} since {}", self.step.as_str(), self.origin)
    }
}

/// Month number (1-12) of a date.
pub fn month_number(date: &CalendarDate) -> i64 {
    date.month as i64
}

/// Season label for a month using [`SEASONS`].
pub fn season_of_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => SEASONS[0],
        3..=5 => SEASONS[1],
        6..=8 => SEASONS[2],
        _ => SEASONS[3],
    }
}

/// Year a date's season is attributed to. December belongs to the
/// following year's DJF.
pub fn season_year(date: &CalendarDate) -> i64 {
    if date.month == 12 {
        date.year as i64 + 1
    } else {
        date.year as i64
    }
}
