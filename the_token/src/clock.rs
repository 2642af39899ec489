//! Timestamps and durations used in token claims
//!
//! Token issuance never consults a clock; claim times come from the
//! credential itself. A [`Clock`] is only needed to ask whether an already
//! issued token is still valid.

use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Unix time
///
/// Unix time as represented by the number of seconds elapsed since the
/// beginning of the Unix epoch on 1970/01/01 at 00:00:00 UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// Converts a calendar timestamp into Unix time
    ///
    /// Returns `None` for instants before the Unix epoch. Sub-second
    /// precision is truncated.
    #[must_use]
    pub fn from_datetime(t: OffsetDateTime) -> Option<Self> {
        u64::try_from(t.unix_timestamp()).ok().map(Self)
    }

    /// Converts back into a UTC calendar timestamp
    #[must_use]
    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        let secs = i64::try_from(self.0).ok()?;
        OffsetDateTime::from_unix_timestamp(secs).ok()
    }

    /// Offsets this time by a signed lifetime
    ///
    /// Returns `None` if the result would fall before the epoch or overflow.
    #[must_use]
    pub fn checked_add(self, lifetime: Lifetime) -> Option<Self> {
        self.0.checked_add_signed(lifetime.0).map(Self)
    }
}

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        let time = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        UnixTime(time)
    }
}

/// A signed span of time, in seconds
///
/// Kept signed so that a misconfigured, negative lifetime survives long
/// enough to be rejected when a token is signed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lifetime(pub i64);

impl Lifetime {
    const SECS_PER_DAY: i64 = 24 * 60 * 60;

    /// A lifetime of the given number of whole days
    ///
    /// Saturates rather than overflowing for absurd values.
    #[must_use]
    pub const fn from_days(days: i64) -> Self {
        Self(days.saturating_mul(Self::SECS_PER_DAY))
    }

    /// The lifetime in seconds
    #[inline]
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// Whether the lifetime runs backwards in time
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 % Self::SECS_PER_DAY == 0 {
            write!(f, "{}d", self.0 / Self::SECS_PER_DAY)
        } else {
            write!(f, "{}s", self.0)
        }
    }
}

/// Represents a clock, which can tell the current time
pub trait Clock {
    /// Gets the current time according to this clock
    fn now(&self) -> UnixTime;
}

/// The system clock as provided by `std::time::SystemTime`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A test clock which maintains the current time as internal state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixTime);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}

impl TestClock {
    /// Creates a new test clock with the specified time
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Updates the clock's current time to `val`
    pub fn set(&mut self, val: UnixTime) {
        self.0 = val;
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn ten_years_of_days_from_new_year_2022() {
        let created = UnixTime::from_datetime(datetime!(2022-01-01 00:00:00 UTC)).unwrap();
        assert_eq!(created, UnixTime(1_640_995_200));

        let expiry = created.checked_add(Lifetime::from_days(3650)).unwrap();
        assert_eq!(expiry, UnixTime(1_956_355_200));
        assert_eq!(
            expiry.to_datetime().unwrap(),
            datetime!(2031-12-30 00:00:00 UTC)
        );
    }

    #[test]
    fn pre_epoch_instants_are_not_representable() {
        assert_eq!(
            UnixTime::from_datetime(datetime!(1969-12-31 23:59:59 UTC)),
            None
        );
    }

    #[test]
    fn negative_lifetime_can_underflow() {
        assert!(Lifetime::from_days(-1).is_negative());
        assert_eq!(UnixTime(10).checked_add(Lifetime(-20)), None);
        assert_eq!(UnixTime(10).checked_add(Lifetime(-5)), Some(UnixTime(5)));
    }

    #[test]
    fn lifetime_displays_in_days_when_whole() {
        assert_eq!(Lifetime::from_days(3650).to_string(), "3650d");
        assert_eq!(Lifetime(90).to_string(), "90s");
    }
}
