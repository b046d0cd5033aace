use chrono::{Datelike, Timelike};
use core::fmt;
use serde::{Serialize, Serializer};

/// Identifier attached to each transmitted request as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u128);

impl MessageId {
    pub const fn value(self) -> u128 {
        self.0
    }
}

impl From<u128> for MessageId {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source of base values for message IDs.
pub trait Clock {
    fn stamp(&self) -> u128;
}

impl<F: Fn() -> u128> Clock for F {
    fn stamp(&self) -> u128 {
        self()
    }
}

/// Local wall-clock time as a 17-digit `YYYYMMDDhhmmssSSS` number.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn stamp(&self) -> u128 {
        timestamp_digits(&chrono::Local::now())
    }
}

/// Packs a calendar time into `YYYYMMDDhhmmssSSS` digits.
pub fn timestamp_digits<T: Datelike + Timelike>(t: &T) -> u128 {
    // Leap seconds report nanoseconds past 1e9.
    let millis = (t.nanosecond() / 1_000_000).min(999);
    let mut v = u128::from(t.year().max(0) as u32);
    for (part, width) in [
        (t.month(), 100),
        (t.day(), 100),
        (t.hour(), 100),
        (t.minute(), 100),
        (t.second(), 100),
        (millis, 1000),
    ] {
        v = v * width + u128::from(part);
    }
    v
}

/// Issues strictly increasing message IDs.
///
/// The clock supplies the base value; whenever it fails to move past the
/// last issued ID (same millisecond, or the clock stepped backwards) the
/// previous ID plus one is issued instead.
#[derive(Debug)]
pub struct MessageIdGenerator<C = SystemClock> {
    clock: C,
    last: u128,
}

impl MessageIdGenerator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MessageIdGenerator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MessageIdGenerator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, last: 0 }
    }

    pub fn next_id(&mut self) -> MessageId {
        let base = self.clock.stamp();
        self.last = if base <= self.last {
            self.last + 1
        } else {
            base
        };
        MessageId(self.last)
    }

    /// The last issued ID, or zero before the first call.
    pub fn watermark(&self) -> u128 {
        self.last
    }
}
