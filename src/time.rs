//! Start-time reconstruction for every supported format.
//!
//! All timestamps are `chrono::DateTime<Utc>` with at least millisecond
//! precision. [`TimeBase`] carries the first-frame start and, for framed
//! formats, the fixed step between frames.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::{DataloggerError, Result};

/// Absolute start instant plus an optional per-frame increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub start: DateTime<Utc>,
    pub frame_step: Option<TimeDelta>,
}

impl TimeBase {
    /// A time base shared by every channel of a single-frame file.
    pub fn fixed(start: DateTime<Utc>) -> Self {
        Self {
            start,
            frame_step: None,
        }
    }

    /// A time base that advances by `step` per frame.
    pub fn framed(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            start,
            frame_step: Some(step),
        }
    }

    /// Start of frame `n` (0-based). Single-frame bases ignore `n`.
    pub fn at_frame(&self, n: usize) -> DateTime<Utc> {
        match self.frame_step {
            Some(step) => self.start + step * n as i32,
            None => self.start,
        }
    }
}

/// Build a UTC instant from broken-down calendar fields.
pub fn calendar(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_milli_opt(hour, minute, second, millisecond))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            DataloggerError::malformed(format!(
                "invalid calendar time {year:04}-{month:02}-{day:02} \
                 {hour:02}:{minute:02}:{second:02}.{millisecond:03}"
            ))
        })
}

/// Midnight of the given date plus a fractional number of seconds.
pub fn date_plus_seconds(year: i32, month: u32, day: u32, seconds: f64) -> Result<DateTime<Utc>> {
    let midnight = calendar(year, month, day, 0, 0, 0, 0)?;
    Ok(midnight + seconds_delta(seconds)?)
}

/// Convert fractional seconds since the Unix epoch into a UTC instant.
pub fn from_epoch_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    Ok(DateTime::UNIX_EPOCH + seconds_delta(seconds)?)
}

fn seconds_delta(seconds: f64) -> Result<TimeDelta> {
    if !seconds.is_finite() || seconds.abs() > 1.0e11 {
        return Err(DataloggerError::malformed(format!(
            "time offset {seconds} s out of range"
        )));
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1.0e9).round() as i64;
    Ok(TimeDelta::seconds(whole as i64) + TimeDelta::nanoseconds(nanos))
}

/// Epoch seconds from a split time-channel record.
///
/// The logger stores the integer second as a high and a low word next to a
/// millisecond count and a correction indicator. A correction above
/// `threshold` means the second counter already rolled over and one second
/// must be taken back.
pub fn split_word_seconds(
    sec_hi: i32,
    sec_low: i32,
    millis: i32,
    correction: i32,
    threshold: i32,
) -> f64 {
    let mut seconds = ((sec_hi as i64) << 16) as f64 + sec_low as f64 + millis as f64 / 1000.0;
    if correction > threshold {
        seconds -= 1.0;
    }
    seconds
}

/// Parse a frame nominal time.
///
/// Accepts ordinal dates (`2015062 12:00:00.000`, `2015-062 ...`) and
/// calendar dates (`2015-03-03 12:00:00.000`), separated from the time of
/// day by a space or `T`.
pub fn parse_nominal_time(text: &str) -> Result<DateTime<Utc>> {
    let bad = || DataloggerError::malformed(format!("invalid nominal time {text:?}"));

    let normalized = text.trim().replacen('T', " ", 1);
    let (date_part, time_part) = normalized.split_once(' ').ok_or_else(bad)?;

    let date = match date_part.split('-').collect::<Vec<_>>().as_slice() {
        [ymd] if ymd.len() == 7 && ymd.is_ascii() => {
            let year = ymd[..4].parse().map_err(|_| bad())?;
            let ordinal = ymd[4..].parse().map_err(|_| bad())?;
            NaiveDate::from_yo_opt(year, ordinal)
        }
        [y, o] => NaiveDate::from_yo_opt(
            y.parse().map_err(|_| bad())?,
            o.parse().map_err(|_| bad())?,
        ),
        [y, m, d] => NaiveDate::from_ymd_opt(
            y.parse().map_err(|_| bad())?,
            m.parse().map_err(|_| bad())?,
            d.parse().map_err(|_| bad())?,
        ),
        _ => None,
    }
    .ok_or_else(bad)?;

    let time = NaiveTime::parse_from_str(time_part.trim(), "%H:%M:%S%.f").map_err(|_| bad())?;
    Ok(date.and_time(time).and_utc())
}
