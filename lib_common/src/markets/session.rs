//! # Trading Session Clock
//!
//! Decides whether an instant falls inside the configured trading window
//! (Monday to Friday, inclusive time-of-day range in a fixed zone) and exposes
//! the hour-of-day used to de-duplicate hourly alerts.
//!
//! The window is checked at minute resolution: with a 21:00 close, 21:00:59 is
//! still open and 21:01 is not.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

/// Default window opening, 09:30 New York expressed in UTC during daylight time.
pub const DEFAULT_OPEN: (u32, u32) = (14, 30);
/// Default window close.
pub const DEFAULT_CLOSE: (u32, u32) = (21, 0);

/// A weekday time-of-day window in a fixed zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionClock {
    open: NaiveTime,
    close: NaiveTime,
    tz: Tz,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(DEFAULT_OPEN.0, DEFAULT_OPEN.1, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(DEFAULT_CLOSE.0, DEFAULT_CLOSE.1, 0).unwrap_or(NaiveTime::MIN),
            tz: Tz::UTC,
        }
    }
}

impl SessionClock {
    /// Creates a window from `open` to `close` inclusive, evaluated in `tz`.
    ///
    /// Seconds are ignored. When `close` is earlier than `open` the window spans
    /// midnight.
    pub fn new(open: NaiveTime, close: NaiveTime, tz: Tz) -> Self {
        Self {
            open: truncate_to_minute(open),
            close: truncate_to_minute(close),
            tz,
        }
    }

    /// Zone the window and hour buckets are evaluated in.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Window opening time.
    pub fn open(&self) -> NaiveTime {
        self.open
    }

    /// Window closing time.
    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// True on Monday to Friday while the local time is inside the window.
    pub fn is_session_open<T: TimeZone>(&self, now: &DateTime<T>) -> bool {
        let local = now.with_timezone(&self.tz);

        if local.weekday().num_days_from_monday() >= 5 {
            return false;
        }

        let t = truncate_to_minute(local.time());
        if self.open <= self.close {
            t >= self.open && t <= self.close
        } else {
            t >= self.open || t <= self.close
        }
    }

    /// Hour of day (0-23) of `now` in the window's zone.
    pub fn hour_bucket<T: TimeZone>(&self, now: &DateTime<T>) -> u32 {
        now.with_timezone(&self.tz).hour()
    }
}

fn truncate_to_minute(t: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(t.hour(), t.minute(), 0).unwrap_or(t)
}
