//! Day/time windows and the schedule set evaluated by the daemon.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// A weekday, serialized by its full English name (`"Monday"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.name()[..3]
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts full names and three-letter abbreviations, any case.
impl FromStr for Day {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Day::ALL
            .into_iter()
            .find(|day| {
                day.name().eq_ignore_ascii_case(wanted)
                    || day.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| CoreError::UnknownDay {
                input: s.to_string(),
            })
    }
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// A 24-hour wall-clock minute. Always displayed as fixed-width `HH:MM`,
/// so numeric and lexicographic ordering agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(self) -> u8 {
        self.hour
    }

    pub fn minute(self) -> u8 {
        self.minute
    }

    /// Truncate a clock reading to the minute.
    pub fn from_clock(clock: &impl Timelike) -> Self {
        // Timelike guarantees hour < 24 and minute < 60.
        Self {
            hour: clock.hour() as u8,
            minute: clock.minute() as u8,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// `H:MM` or `HH:MM`; minutes are always two digits.
impl FromStr for TimeOfDay {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoreError::MalformedTime {
            input: s.to_string(),
        };
        let (hour, minute) = s.trim().split_once(':').ok_or_else(malformed)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !(1..=2).contains(&hour.len()) || minute.len() != 2 || !digits(hour) || !digits(minute)
        {
            return Err(malformed());
        }
        let hour: u8 = hour.parse().map_err(|_| malformed())?;
        let minute: u8 = minute.parse().map_err(|_| malformed())?;
        TimeOfDay::new(hour, minute).ok_or_else(malformed)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// One blocking window: `[start, end]` inclusive on each of `days`.
///
/// `start > end` is accepted and simply never matches; windows do not wrap
/// past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    #[serde(rename = "start_time")]
    start: TimeOfDay,
    #[serde(rename = "end_time")]
    end: TimeOfDay,
    days: BTreeSet<Day>,
}

impl Schedule {
    /// Build a schedule, rejecting an empty day set.
    pub fn new(
        start: TimeOfDay,
        end: TimeOfDay,
        days: impl IntoIterator<Item = Day>,
    ) -> Result<Self, CoreError> {
        let days: BTreeSet<Day> = days.into_iter().collect();
        if days.is_empty() {
            return Err(CoreError::EmptyDaySet);
        }
        Ok(Self { start, end, days })
    }

    /// Parse both boundaries and build the schedule.
    pub fn parse(
        start: &str,
        end: &str,
        days: impl IntoIterator<Item = Day>,
    ) -> Result<Self, CoreError> {
        Self::new(start.parse()?, end.parse()?, days)
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = Day> + '_ {
        self.days.iter().copied()
    }

    pub fn matches(&self, day: Day, time: TimeOfDay) -> bool {
        self.days.contains(&day) && self.start <= time && time <= self.end
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<&str> = self.days.iter().map(|d| d.short_name()).collect();
        write!(f, "{}-{}: {}", self.start, self.end, days.join(", "))
    }
}

// ---------------------------------------------------------------------------
// ScheduleSet
// ---------------------------------------------------------------------------

/// Ordered schedules. Duplicates are allowed; indices are what callers use
/// to remove entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScheduleSet {
    schedules: Vec<Schedule>,
}

impl ScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, schedule: Schedule) {
        self.schedules.push(schedule);
    }

    pub fn remove(&mut self, index: usize) -> Option<Schedule> {
        (index < self.schedules.len()).then(|| self.schedules.remove(index))
    }

    /// Whether any window covers `(day, time)`. Pure in its inputs.
    pub fn is_active_at(&self, day: Day, time: TimeOfDay) -> bool {
        self.schedules.iter().any(|s| s.matches(day, time))
    }

    /// [`is_active_at`](Self::is_active_at) for a local wall-clock reading.
    pub fn is_active_on(&self, now: &NaiveDateTime) -> bool {
        self.is_active_at(Day::from(now.weekday()), TimeOfDay::from_clock(now))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.iter()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

impl FromIterator<Schedule> for ScheduleSet {
    fn from_iter<I: IntoIterator<Item = Schedule>>(iter: I) -> Self {
        Self {
            schedules: iter.into_iter().collect(),
        }
    }
}
