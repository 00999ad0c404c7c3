// Symphonia
// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `units` module provides definitions for common units.

use std::fmt;

/// A `Duration` indicates a positive span of time in `TimeBase` units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a new `Duration` from a tick count.
    pub const fn new(ticks: u64) -> Self {
        Duration(ticks)
    }

    /// Get the number of ticks this `Duration` spans.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Add two durations, saturating at [`u64::MAX`] on overflow.
    pub const fn saturating_add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }

    /// Subtract two durations, saturating at `0` on underflow.
    pub const fn saturating_sub(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }

    /// Add two durations, returning `None` on overflow.
    pub const fn checked_add(self, rhs: Duration) -> Option<Duration> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Duration(v)),
            None => None,
        }
    }

    /// Round this duration down to the nearest multiple of `align`. If `align` is zero, the
    /// duration is returned unchanged.
    pub const fn align_down(self, align: Duration) -> Duration {
        if align.0 == 0 {
            self
        }
        else {
            Duration(self.0 - (self.0 % align.0))
        }
    }
}

impl From<u8> for Duration {
    fn from(ticks: u8) -> Self {
        Duration(u64::from(ticks))
    }
}

impl From<u16> for Duration {
    fn from(ticks: u16) -> Self {
        Duration(u64::from(ticks))
    }
}

impl From<u32> for Duration {
    fn from(ticks: u32) -> Self {
        Duration(u64::from(ticks))
    }
}

impl From<u64> for Duration {
    fn from(ticks: u64) -> Self {
        Duration(ticks)
    }
}

impl From<Duration> for u64 {
    fn from(dur: Duration) -> Self {
        dur.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A `Timestamp` represents an instantaneous instant in time, in `TimeBase` units, relative to an
/// arbitrary epoch (usually the start of a track).
///
/// Timestamps may be negative. A negative timestamp generally indicates an encoder delay frame
/// that precedes the first frame that should be presented to the user.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The timestamp of the epoch.
    pub const ZERO: Timestamp = Timestamp(0);

    /// The smallest representable timestamp.
    pub const MIN: Timestamp = Timestamp(i64::MIN);

    /// The largest representable timestamp.
    pub const MAX: Timestamp = Timestamp(i64::MAX);

    /// Create a new `Timestamp` from a signed tick count.
    pub const fn new(ts: i64) -> Self {
        Timestamp(ts)
    }

    /// Get the signed tick count of this `Timestamp`.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Add a `Duration` to this `Timestamp`, returning `None` on overflow.
    pub fn checked_add(self, dur: Duration) -> Option<Timestamp> {
        i64::try_from(dur.get()).ok().and_then(|d| self.0.checked_add(d)).map(Timestamp)
    }

    /// Add a `Duration` to this `Timestamp`, saturating at [`Timestamp::MAX`] on overflow.
    pub fn saturating_add(self, dur: Duration) -> Timestamp {
        self.checked_add(dur).unwrap_or(Timestamp::MAX)
    }

    /// Subtract a `Duration` from this `Timestamp`, returning `None` on overflow.
    pub fn checked_sub(self, dur: Duration) -> Option<Timestamp> {
        i64::try_from(dur.get()).ok().and_then(|d| self.0.checked_sub(d)).map(Timestamp)
    }

    /// The duration spanning from this timestamp up-to (and excluding) `to`. Returns `None` if
    /// `to` is before this timestamp.
    pub fn duration_to(self, to: Timestamp) -> Option<Duration> {
        (to.0 >= self.0).then(|| Duration((to.0 - self.0) as u64))
    }

    /// The duration spanning from `from` up-to (and excluding) this timestamp. Returns `None` if
    /// this timestamp is before `from`.
    pub fn duration_from(self, from: Timestamp) -> Option<Duration> {
        from.duration_to(self)
    }
}

impl From<i64> for Timestamp {
    fn from(ts: i64) -> Self {
        Timestamp(ts)
    }
}

impl From<u32> for Timestamp {
    fn from(ts: u32) -> Self {
        Timestamp(i64::from(ts))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// `Time` represents a duration of time in seconds, or the number of seconds since an arbitrary
/// epoch. `Time` is stored as an integer number of seconds plus any remaining fraction of a second
/// as a floating point value.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Time {
    pub seconds: u64,
    pub frac: f64,
}

impl Time {
    const SECONDS_PER_MINUTE: u64 = 60;
    const SECONDS_PER_HOUR: u64 = 60 * 60;
    const NANOSECONDS_PER_SECOND: u32 = 1_000_000_000;
    const NANOSECONDS_PER_SECOND_INV: f64 = 1.0 / 1_000_000_000.0;

    pub fn new(seconds: u64, frac: f64) -> Self {
        Time { seconds, frac }
    }

    pub fn from_ss(s: u8, ns: u32) -> Option<Time> {
        if s > 59 || ns >= Time::NANOSECONDS_PER_SECOND {
            return None;
        }

        let seconds = u64::from(s);
        let frac = Time::NANOSECONDS_PER_SECOND_INV * f64::from(ns);

        Some(Time { seconds, frac })
    }

    pub fn from_mmss(m: u8, s: u8, ns: u32) -> Option<Time> {
        if m > 59 || s > 59 || ns >= Time::NANOSECONDS_PER_SECOND {
            return None;
        }

        let seconds = (Time::SECONDS_PER_MINUTE * u64::from(m)) + u64::from(s);
        let frac = Time::NANOSECONDS_PER_SECOND_INV * f64::from(ns);

        Some(Time { seconds, frac })
    }

    pub fn from_hhmmss(h: u32, m: u8, s: u8, ns: u32) -> Option<Time> {
        if m > 59 || s > 59 || ns >= Time::NANOSECONDS_PER_SECOND {
            return None;
        }

        let seconds = (Time::SECONDS_PER_HOUR * u64::from(h))
            + (Time::SECONDS_PER_MINUTE * u64::from(m))
            + u64::from(s);

        let frac = Time::NANOSECONDS_PER_SECOND_INV * f64::from(ns);

        Some(Time { seconds, frac })
    }
}

impl From<u8> for Time {
    fn from(seconds: u8) -> Self {
        Time::new(u64::from(seconds), 0.0)
    }
}

impl From<u16> for Time {
    fn from(seconds: u16) -> Self {
        Time::new(u64::from(seconds), 0.0)
    }
}

impl From<u32> for Time {
    fn from(seconds: u32) -> Self {
        Time::new(u64::from(seconds), 0.0)
    }
}

impl From<u64> for Time {
    fn from(seconds: u64) -> Self {
        Time::new(seconds, 0.0)
    }
}

impl From<f32> for Time {
    fn from(seconds: f32) -> Self {
        if seconds >= 0.0 {
            Time::new(seconds.trunc() as u64, f64::from(seconds.fract()))
        }
        else {
            Time::new(0, 0.0)
        }
    }
}

impl From<f64> for Time {
    fn from(seconds: f64) -> Self {
        if seconds >= 0.0 {
            Time::new(seconds.trunc() as u64, seconds.fract())
        }
        else {
            Time::new(0, 0.0)
        }
    }
}

impl From<std::time::Duration> for Time {
    fn from(duration: std::time::Duration) -> Self {
        Time::new(duration.as_secs(), f64::from(duration.subsec_nanos()) / 1_000_000_000.0)
    }
}

impl From<Time> for std::time::Duration {
    fn from(time: Time) -> Self {
        std::time::Duration::new(time.seconds, (1_000_000_000.0 * time.frac) as u32)
    }
}

/// A `TimeBase` is the conversion factor between time, expressed in seconds, and a `Timestamp` or
/// `Duration`.
///
/// In other words, a `TimeBase` is the length in seconds of one tick of a `Timestamp` or
/// `Duration`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeBase {
    /// The numerator.
    pub numer: u32,
    /// The denominator.
    pub denom: u32,
}

impl TimeBase {
    /// Creates a new `TimeBase`. Panics if either the numerator or denominator is 0.
    pub fn new(numer: u32, denom: u32) -> Self {
        if numer == 0 || denom == 0 {
            panic!("TimeBase cannot have 0 numerator or denominator");
        }

        TimeBase { numer, denom }
    }

    /// Creates a new `TimeBase` that is the reciprocal of `rate` (i.e. `1 / rate`). Returns `None`
    /// if `rate` is zero.
    ///
    /// This is a convenience used to derive a timebase directly from a sample or frame rate.
    pub fn try_from_recip(rate: u32) -> Option<TimeBase> {
        (rate > 0).then(|| TimeBase { numer: 1, denom: rate })
    }

    /// Accurately calculates a `Time` using the `TimeBase` and the provided `Timestamp`. Negative
    /// timestamps calculate a `Time` relative to, and prior to, the epoch; callers that do not
    /// expect negative timestamps should check the sign first.
    pub fn calc_time(&self, ts: Timestamp) -> Time {
        assert!(self.numer > 0 && self.denom > 0, "TimeBase numerator or denominator are 0.");

        let magnitude = ts.get().unsigned_abs();

        // The dividend requires up-to 96-bits (32-bit timebase numerator * 64-bit timestamp).
        let dividend = u128::from(magnitude) * u128::from(self.numer);

        // For an accurate floating point division, both the dividend and divisor must have an
        // accurate floating point representation. A 64-bit floating point value has a mantissa of
        // 52 bits and can therefore accurately represent a 52-bit integer. The divisor (the
        // denominator of the timebase) is limited to 32-bits. Therefore, if the dividend
        // requires less than 52-bits, a straight-forward floating point division can be used to
        // calculate the time.
        if dividend < (1 << 52) {
            let seconds = (dividend as f64) / f64::from(self.denom);

            Time::new(seconds.trunc() as u64, seconds.fract())
        }
        else {
            // If the dividend requires more than 52 bits, calculate the integer portion using
            // integer arithmetic, then calculate the fractional part separately.
            let quotient = dividend / u128::from(self.denom);

            // The remainder is the fractional portion before being divided by the divisor (the
            // denominator). The remainder will never equal or exceed the divisor (or else the
            // fractional part would be >= 1.0), so the remainder must fit within a u32.
            let rem = (dividend - (quotient * u128::from(self.denom))) as u32;

            // Calculate the fractional portion. Since both the remainder and denominator are 32-bit
            // integers now, 64-bit floating point division will provide enough accuracy.
            let frac = f64::from(rem) / f64::from(self.denom);

            Time::new(quotient as u64, frac)
        }
    }

    /// Accurately calculates a `Timestamp` from the given `Time` using the `TimeBase` as the
    /// conversion factor. On overflow, the `Timestamp` saturates.
    pub fn calc_timestamp(&self, time: Time) -> Timestamp {
        assert!(self.numer > 0 && self.denom > 0, "TimeBase numerator or denominator are 0.");
        assert!(time.frac >= 0.0 && time.frac < 1.0, "Invalid range for Time fractional part.");

        // The dividing factor.
        let k = 1.0 / f64::from(self.numer);

        // Multiplying seconds by the denominator requires up-to 96-bits (32-bit timebase
        // denominator * 64-bit timestamp).
        let product = u128::from(time.seconds) * u128::from(self.denom);

        // Like calc_time, a 64-bit floating-point value only has 52-bits of integer precision.
        // If the product requires more than 52-bits, split the product into upper and lower parts
        // and multiply by k separately, before adding back together.
        let a = if product > (1 << 52) {
            // Split the 96-bit product into 48-bit halves.
            let u = ((product & !0xffff_ffff_ffff) >> 48) as u64;
            let l = (product & 0xffff_ffff_ffff) as u64;

            let uk = (u as f64) * k;
            let ul = (l as f64) * k;

            // Add the upper and lower halves.
            ((uk as u64) << 48).wrapping_add(ul as u64)
        }
        else {
            ((product as f64) * k) as u64
        };

        // The fractional portion can be calculate directly using floating point arithemtic.
        let b = (k * f64::from(self.denom) * time.frac) as u64;

        Timestamp::new(a.wrapping_add(b) as i64)
    }
}

impl From<TimeBase> for f64 {
    fn from(timebase: TimeBase) -> Self {
        f64::from(timebase.numer) / f64::from(timebase.denom)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, Time, TimeBase, Timestamp};
    use std::time::Duration as StdDuration;

    #[test]
    fn verify_timebase() {
        // Verify accuracy of timestamp -> time
        let tb1 = TimeBase::new(1, 320);

        assert_eq!(tb1.calc_time(Timestamp::new(0)), Time::new(0, 0.0));
        assert_eq!(tb1.calc_time(Timestamp::new(12_345)), Time::new(38, 0.578125));

        // Verify accuracy of time -> timestamp
        assert_eq!(tb1.calc_timestamp(Time::new(0, 0.0)), Timestamp::new(0));
        assert_eq!(tb1.calc_timestamp(Time::new(38, 0.578125)), Timestamp::new(12_345));
    }

    #[test]
    fn verify_duration_to_time() {
        // Verify accuracy of Duration -> Time
        let dur1 = StdDuration::from_secs_f64(38.578125);
        let time1 = Time::from(dur1);

        assert_eq!(time1.seconds, 38);
        assert_eq!(time1.frac, 0.578125);
    }

    #[test]
    fn verify_time_to_duration() {
        // Verify accuracy of Time -> Duration
        let time1 = Time::new(38, 0.578125);
        let dur1 = StdDuration::from(time1);

        let seconds = dur1.as_secs_f64();

        assert_eq!(seconds.trunc(), 38.0);
        assert_eq!(seconds.fract(), 0.578125);
    }

    #[test]
    fn verify_timestamp_duration_arithmetic() {
        let a = Timestamp::new(-100);
        let b = Timestamp::new(50);

        assert_eq!(a.duration_to(b), Some(Duration::new(150)));
        assert_eq!(b.duration_to(a), None);
        assert_eq!(b.duration_from(a), Some(Duration::new(150)));

        assert_eq!(a.checked_add(Duration::new(150)), Some(b));
    }

    #[test]
    fn verify_duration_align_down() {
        assert_eq!(Duration::new(1792).align_down(Duration::new(512)), Duration::new(1536));
        assert_eq!(Duration::new(1536).align_down(Duration::new(512)), Duration::new(1536));
    }
}
