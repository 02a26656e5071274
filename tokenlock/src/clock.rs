//! Wall clock access.

use std::fmt::Debug;
use log::warn;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Something that knows the current date and time, or knows that it doesn't.
pub trait Clock: Debug {
    /// Current local date and time, truncated to whole seconds.
    ///
    /// `None` if the clock is not valid.
    fn now(&self) -> Option<PrimitiveDateTime>;
}

/// The system clock, in local time.
///
/// A board without a battery backed RTC boots at the epoch until it gets time
/// from the network, so any year before `min_year` is treated as invalid.
#[derive(Debug)]
pub struct SystemClock {
    pub min_year: i32,
}

impl SystemClock {
    pub fn new(min_year: i32) -> Self {
        SystemClock { min_year }
    }

    /// Checks a reading against the plausibility rules and strips sub-seconds.
    fn validate(&self, now: OffsetDateTime) -> Option<PrimitiveDateTime> {
        if now.year() < self.min_year {
            warn!("System clock reads {}, before {}.", now.year(), self.min_year);
            return None;
        }
        let time = now.time().replace_nanosecond(0).ok()?;
        Some(PrimitiveDateTime::new(now.date(), time))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Option<PrimitiveDateTime> {
        match OffsetDateTime::now_local() {
            Ok(now) => self.validate(now),
            Err(e) => {
                warn!("Local time is unavailable: {}", e);
                None
            }
        }
    }
}
