//! Julian-day calendar arithmetic and record timestamps.
//!
//! Julian day numbers follow the integer algorithm of the ASCAT ground
//! processor. They are one less than the astronomical Julian day number;
//! only differences between them and the round trip through
//! [`julian_to_ymd`] are meaningful.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::io::fields::{read_u16, read_u32};
use crate::types::{ScatError, ScatResult};

/// First Julian day of the Gregorian calendar in this numbering
const GREGORIAN_START_JULIAN: i64 = 2_299_160;

/// Orbital period of MetOp used to advance the header orbit number
pub const NODAL_PERIOD_SECONDS: f64 = 6081.72;

const SECONDS_PER_DAY: i64 = 86_400;

/// Milliseconds of day allowed by CCSDS day-segmented time, leap second included
const MAX_MILLIS_OF_DAY: u32 = 86_401_000;

/// Calendar date and time of day, whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self { year, month, day, hour, minute, second }
    }

    pub fn julian_day(&self) -> i64 {
        ymd_to_julian(self.year, self.month as i32, self.day as i32)
    }

    /// Seconds elapsed since midnight
    pub fn seconds_of_day(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }

    /// Days since 2000-01-01 00:00:00, fractional
    pub fn epoch_2000(&self) -> f64 {
        (self.julian_day() - julian_2000()) as f64 + self.seconds_of_day() as f64 / SECONDS_PER_DAY as f64
    }

    /// UTC instant; second 60 maps onto chrono's leap-second representation
    pub fn to_utc(&self) -> ScatResult<DateTime<Utc>> {
        let (second, millis) = if self.second == 60 { (59, 1000) } else { (self.second, 0) };
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_milli_opt(self.hour, self.minute, second, millis))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(|| ScatError::ParseFailure(format!("invalid calendar time {:?}", self)))
    }
}

impl std::fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Julian day of a calendar date.
///
/// Months outside [1, 12] are carried into the year before conversion; the
/// Gregorian correction applies from 1582-10-15 onwards.
pub fn ymd_to_julian(year: i32, month: i32, day: i32) -> i64 {
    let months_from_january = i64::from(month) - 1;
    let mut year = i64::from(year) + months_from_january.div_euclid(12);
    let mut month = months_from_january.rem_euclid(12) + 1;
    let day = i64::from(day);

    // March-based year
    if month < 3 {
        year -= 1;
        month += 12;
    }

    let mut julian = day + 1_720_994 + 306_001 * (month + 1) / 10_000;
    if year > 0 {
        julian += 1461 * year / 4;
    } else {
        julian += (1461 * year - 3) / 4;
    }

    if year * 10_000 + month * 100 + day > 15_821_014 {
        julian += 2 - year / 100 + year / 400;
    }
    julian
}

/// Calendar date of a Julian day, inverse of [`ymd_to_julian`]
pub fn julian_to_ymd(julian: i64) -> (i32, u32, u32) {
    let b = if julian < GREGORIAN_START_JULIAN {
        julian + 1525
    } else {
        let alpha = (4 * julian - 7_468_861) / 146_097;
        julian + 1526 + alpha - alpha / 4
    };

    let c = (20 * b - 2442) / 7305;
    let d = 1461 * c / 4;
    let e = 10_000 * (b - d) / 306_001;
    let day = b - d - 306_001 * e / 10_000;
    let month = if e < 14 { e - 1 } else { e - 13 };
    let year = if month > 2 { c - 4716 } else { c - 4715 };

    (year as i32, month as u32, day as u32)
}

/// Julian day of the EPS time origin, 2000-01-01
pub fn julian_2000() -> i64 {
    ymd_to_julian(2000, 1, 1)
}

/// Byte offsets of the UTC localisation field in a measurement record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampLayout {
    pub day_offset: usize,
    pub millisecond_offset: usize,
}

impl TimestampLayout {
    /// SZO, SZR and SZF records before format 12
    pub const LEGACY: Self = Self { day_offset: 20, millisecond_offset: 22 };
    /// SZF records from format 12, after the two degradation flags
    pub const FORMAT_12: Self = Self { day_offset: 22, millisecond_offset: 24 };
}

/// Decoded record timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordTime {
    /// Days since 2000-01-01, fractional (whole-second resolution)
    pub epoch: f64,
    pub calendar: CalendarTime,
}

impl RecordTime {
    pub fn decode(buf: &[u8], layout: TimestampLayout) -> ScatResult<Self> {
        let days = read_u16(buf, layout.day_offset)?;
        let millis = read_u32(buf, layout.millisecond_offset)?;
        Self::from_parts(days, millis)
    }

    /// Decode days since 2000-01-01 and milliseconds of day.
    ///
    /// Values in [86 400 000, 86 401 000) are the leap second 23:59:60.
    pub fn from_parts(days: u16, millis: u32) -> ScatResult<Self> {
        if millis >= MAX_MILLIS_OF_DAY {
            return Err(ScatError::BoundsViolation(format!(
                "{} ms exceeds one day and a leap second",
                millis
            )));
        }
        let seconds = i64::from(millis / 1000);

        let (year, month, day) = julian_to_ymd(julian_2000() + i64::from(days));
        let clock = seconds.min(SECONDS_PER_DAY - 1);
        let hour = clock / 3600;
        let minute = clock / 60 - hour * 60;
        let second = seconds - hour * 3600 - minute * 60;

        Ok(Self {
            epoch: f64::from(days) + seconds as f64 / SECONDS_PER_DAY as f64,
            calendar: CalendarTime::new(year, month, day, hour as u32, minute as u32, second as u32),
        })
    }

    pub fn to_utc(&self) -> ScatResult<DateTime<Utc>> {
        self.calendar.to_utc()
    }
}

/// Orbit number at `record_time`, advanced from the header orbit number at
/// the state-vector epoch.
///
/// Records more than one day away from the state vector keep the header
/// orbit number.
pub fn corrected_orbit_number(
    header_orbit: i64,
    state_vector_epoch: &CalendarTime,
    record_time: &CalendarTime,
    nodal_period_seconds: f64,
) -> i64 {
    let day_delta = record_time.julian_day() - state_vector_epoch.julian_day();
    let delta_seconds = if day_delta.abs() <= 1 {
        day_delta * SECONDS_PER_DAY + record_time.seconds_of_day() - state_vector_epoch.seconds_of_day()
    } else {
        0
    };
    header_orbit + (delta_seconds as f64 / nodal_period_seconds).floor() as i64
}

/// Ascending pass test on the sub-satellite track angle (degrees)
pub fn is_ascending(track: f64) -> bool {
    let track = if track < 0.0 { track + 360.0 } else { track };
    !(track > 90.0 && track < 270.0)
}
