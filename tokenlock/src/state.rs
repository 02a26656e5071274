//! Access state derivation.
//!
//! The state is never stored. It is recomputed before every decision from the
//! clock and the most recent usage record, so asking twice without an access in
//! between always gives the same answer.

use thiserror::Error;
use time::{Duration, PrimitiveDateTime};
use crate::usage::UsageRecord;

/// What the lock is allowed to do right now.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccessState {
    /// Every access costs a token.
    Ready,
    /// An access happened recently; recognized users get in for free.
    Activated,
    /// Something is broken. The lock fails open until restarted.
    Problem,
}

/// Why the state machine ended up in [AccessState::Problem].
#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum StateFault {
    #[error("RTC date is not valid")]
    ClockInvalid,
    #[error("date in stored log isn't valid, see the registry file")]
    InvalidRecordDate,
}

/// The outcome of [assess], before any side effect is applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Assessment {
    Ready,
    Activated,
    /// A new month or year started since the last access. Tokens must be
    /// renewed, after which the state is [AccessState::Ready].
    RenewalDue,
    Problem(StateFault),
}

impl Assessment {
    /// The state the lock is in once the assessment has been acted upon.
    pub fn state(&self) -> AccessState {
        match self {
            Assessment::Ready | Assessment::RenewalDue => AccessState::Ready,
            Assessment::Activated => AccessState::Activated,
            Assessment::Problem(_) => AccessState::Problem,
        }
    }
}

/// Derives the access state.
///
/// `now` is `None` when the clock can't be trusted. The rules are checked in
/// order and the first match wins:
/// 1. invalid clock: problem,
/// 2. no previous access: ready,
/// 3. previous access without a valid date: problem,
/// 4. previous access within `activation_window` of `now`: activated,
/// 5. previous access in an earlier month or an earlier year: renewal,
/// 6. otherwise ready.
///
/// Rule 5 compares the month numbers and the years separately, so e.g. an access
/// in December 2023 seen in November 2024 renews through the year check only.
pub fn assess(
    now: Option<PrimitiveDateTime>,
    most_recent: Option<&UsageRecord>,
    activation_window: Duration,
) -> Assessment {
    let Some(now) = now else {
        return Assessment::Problem(StateFault::ClockInvalid);
    };
    let Some(record) = most_recent else {
        return Assessment::Ready;
    };
    let Some(last) = record.timestamp else {
        return Assessment::Problem(StateFault::InvalidRecordDate);
    };

    let activated = last
        .checked_add(activation_window)
        .is_some_and(|until| until >= now);
    if activated {
        return Assessment::Activated;
    }

    if u8::from(last.month()) < u8::from(now.month()) || last.year() < now.year() {
        return Assessment::RenewalDue;
    }

    Assessment::Ready
}
