//! Absolute timestamps and their textual forms.
//!
//! Timestamps are microseconds since the Unix epoch, limited to the range
//! the `time` crate can render (years -9999 through 9999). Text is always
//! rendered in UTC as `YYYY-MM-DD HH:MM:SS[.ffffff]+00`.

use std::fmt;
use std::str::FromStr;

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::{Error, Result};

pub const MICROS_PER_SEC: i64 = 1_000_000;
const SECS_PER_DAY: i64 = 86_400;

/// -9999-01-01 00:00:00 UTC.
const MIN_MICROS: i64 = -377_705_116_800 * MICROS_PER_SEC;
/// 9999-12-31 23:59:59.999999 UTC.
const MAX_MICROS: i64 = 253_402_300_799 * MICROS_PER_SEC + (MICROS_PER_SEC - 1);

const EPOCH_LITERAL: &str = "epoch";

/// A point in time with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);
    pub const MIN: Timestamp = Timestamp(MIN_MICROS);
    pub const MAX: Timestamp = Timestamp(MAX_MICROS);

    /// Build a timestamp from microseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// - `Error::TimestampOutOfRange`: outside years -9999..=9999
    pub fn from_micros(micros: i64) -> Result<Self> {
        if !(MIN_MICROS..=MAX_MICROS).contains(&micros) {
            return Err(Error::TimestampOutOfRange);
        }
        Ok(Self(micros))
    }

    pub fn from_unix_seconds(seconds: i64) -> Result<Self> {
        let micros = seconds
            .checked_mul(MICROS_PER_SEC)
            .ok_or(Error::TimestampOutOfRange)?;
        Self::from_micros(micros)
    }

    /// Sub-microsecond precision is truncated toward the past.
    pub fn from_datetime(dt: OffsetDateTime) -> Result<Self> {
        let micros = dt.unix_timestamp_nanos().div_euclid(1_000);
        let micros = i64::try_from(micros).map_err(|_| Error::TimestampOutOfRange)?;
        Self::from_micros(micros)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> Result<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0) * 1_000)
            .map_err(|_| Error::TimestampOutOfRange)
    }

    /// Shift by a signed number of microseconds.
    pub fn checked_add_micros(self, delta: i64) -> Result<Self> {
        let micros = self.0.checked_add(delta).ok_or(Error::TimestampOutOfRange)?;
        Self::from_micros(micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Range is enforced by every constructor.
        let dt = self.to_datetime().map_err(|_| fmt::Error)?;
        let date = dt.date();
        if date.year() < 0 {
            f.write_str("-")?;
        }
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            date.year().unsigned_abs(),
            date.month() as u8,
            date.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        )?;
        let micros = dt.microsecond();
        if micros != 0 {
            let fraction = format!("{micros:06}");
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }
        f.write_str("+00")
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_timestamp(s)
    }
}

/// Parse an absolute timestamp or the `epoch` literal.
///
/// Leading whitespace is skipped. Anything after the timestamp token,
/// trailing whitespace included, is rejected.
///
/// # Errors
///
/// - `Error::InvalidFormat`: unknown token, trailing content, or a date
///   that cannot be represented
pub fn parse_timestamp(text: &str) -> Result<Timestamp> {
    let token = text.trim_start();
    if token.eq_ignore_ascii_case(EPOCH_LITERAL) {
        return Ok(Timestamp::EPOCH);
    }
    let invalid = || Error::InvalidFormat(text.to_string());
    let dt = Scanner::new(token).datetime().ok_or_else(invalid)?;
    Timestamp::from_datetime(dt).map_err(|_| invalid())
}

/// Render a slice length in seconds the way intervals are conventionally
/// shown: `[N day[s] ]HH:MM:SS`.
pub fn format_interval(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let days = total / SECS_PER_DAY as u64;
    let rem = total % SECS_PER_DAY as u64;
    let clock = format!(
        "{sign}{:02}:{:02}:{:02}",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    );
    match days {
        0 => clock,
        1 => format!("{sign}1 day {clock}"),
        n => format!("{sign}{n} days {clock}"),
    }
}

/// Byte cursor over `[-]YYYY-MM-DD[( |T)HH:MM[:SS[.ffffff]]][Z|(+|-)HH[[:]MM]]`.
struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn datetime(mut self) -> Option<OffsetDateTime> {
        let date = self.date()?;
        let time = if self.eat(b' ') || self.eat(b'T') || self.eat(b't') {
            self.time()?
        } else {
            Time::MIDNIGHT
        };
        let offset = self.offset()?;
        if self.pos != self.bytes.len() {
            return None;
        }
        Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
    }

    fn date(&mut self) -> Option<Date> {
        let negative = self.eat(b'-');
        let year = i32::try_from(self.number(4, 5)?).ok()?;
        let year = if negative { -year } else { year };
        self.expect(b'-')?;
        let month = self.number(2, 2)?;
        self.expect(b'-')?;
        let day = self.number(2, 2)?;
        let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
        Date::from_calendar_date(year, month, u8::try_from(day).ok()?).ok()
    }

    fn time(&mut self) -> Option<Time> {
        let hour = self.number(2, 2)?;
        self.expect(b':')?;
        let minute = self.number(2, 2)?;
        let mut second = 0;
        let mut micros = 0;
        if self.eat(b':') {
            second = self.number(2, 2)?;
            if self.eat(b'.') {
                let start = self.pos;
                let digits = self.number(1, 6)?;
                let width = self.pos - start;
                micros = digits * 10u32.pow(6 - width as u32);
            }
        }
        Time::from_hms_micro(
            u8::try_from(hour).ok()?,
            u8::try_from(minute).ok()?,
            u8::try_from(second).ok()?,
            micros,
        )
        .ok()
    }

    fn offset(&mut self) -> Option<UtcOffset> {
        if self.pos == self.bytes.len() {
            return Some(UtcOffset::UTC);
        }
        if self.eat(b'Z') || self.eat(b'z') {
            return Some(UtcOffset::UTC);
        }
        let negative = if self.eat(b'+') {
            false
        } else if self.eat(b'-') {
            true
        } else {
            return None;
        };
        let hours = i8::try_from(self.number(2, 2)?).ok()?;
        let minutes = if self.pos == self.bytes.len() {
            0
        } else {
            self.eat(b':');
            i8::try_from(self.number(2, 2)?).ok()?
        };
        let (hours, minutes) = if negative {
            (-hours, -minutes)
        } else {
            (hours, minutes)
        };
        UtcOffset::from_hms(hours, minutes, 0).ok()
    }

    fn number(&mut self, min_width: usize, max_width: usize) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while self.pos < self.bytes.len() && self.pos - start < max_width {
            let byte = self.bytes[self.pos];
            if !byte.is_ascii_digit() {
                break;
            }
            value = value * 10 + u32::from(byte - b'0');
            self.pos += 1;
        }
        if self.pos - start < min_width {
            return None;
        }
        Some(value)
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        self.eat(byte).then_some(())
    }
}
