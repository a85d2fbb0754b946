// src/clock.rs

//! Injectable source of "now".
//!
//! Nothing in the engine reads wall-clock time directly; everything that
//! needs today's date or a timestamp goes through a [`Clock`].

use std::fmt::Debug;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

pub trait Clock: Send + Sync + Debug {
    /// Current instant, used for status history entries.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day in local time, used for day arithmetic.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to a single day (midnight UTC), for tests and `--today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    today: NaiveDate,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.today.and_time(NaiveTime::MIN))
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}
