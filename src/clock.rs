//! The clock the ledger reads the current time from.

use std::sync::{Arc, Mutex};

use time::{Duration, OffsetDateTime};

use crate::{Error, timezone::get_local_offset};

/// Returns the current time in the ledger's timezone.
pub trait Clock: Send + Sync {
    /// The current time, with the offset of the ledger's timezone.
    fn now(&self) -> OffsetDateTime;
}

/// Reads the system time and shifts it into a canonical timezone.
#[derive(Debug, Clone)]
pub struct SystemClock {
    timezone: String,
}

impl SystemClock {
    /// Create a clock for the canonical timezone name, e.g. "Asia/Tashkent".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if `timezone` is not a known timezone.
    pub fn new(timezone: &str) -> Result<Self, Error> {
        match get_local_offset(timezone) {
            Some(_) => Ok(Self {
                timezone: timezone.to_owned(),
            }),
            None => Err(Error::InvalidTimezone(timezone.to_owned())),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();

        // The name was validated in `new`, the lookup only fails if the
        // timezone database changes underneath us.
        match get_local_offset(&self.timezone) {
            Some(offset) => now.to_offset(offset),
            None => {
                tracing::warn!("timezone {} disappeared, falling back to UTC", self.timezone);
                now
            }
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl FixedClock {
    /// Create a clock stopped at `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: OffsetDateTime) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut current) = self.now.lock() {
            *current += duration;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
