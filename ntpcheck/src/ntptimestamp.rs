//! NTP 32.32 fixed-point timestamps and their conversion to wall-clock time.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, TimeZone, Utc};

use crate::NSEC_IN_SEC;

/// Seconds between 1900-01-01T00:00:00Z and the Unix epoch.
pub const NTP_TIMESTAMP_DELTA: u32 = 2_208_988_800u32;

/// Length of one NTP era in seconds.
const ERA_SECONDS: i64 = 1 << 32;

/// One second in 32.32 fixed point.
pub(crate) const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// Point on the NTP timescale: seconds since 1900 plus a 2^-32 s fraction.
///
/// The two halves only mean something together. Arithmetic between
/// timestamps goes through [`NtpTimestamp::signed_diff`], which works on the
/// full 64-bit value with wrapping semantics so that an era rollover between
/// two readings does not corrupt the interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NtpTimestamp {
    seconds: u32,
    fraction: u32,
}

impl NtpTimestamp {
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        NtpTimestamp { seconds, fraction }
    }

    /// Current wall-clock time.
    ///
    /// A system clock set before 1970 is reported as the Unix epoch.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        NtpTimestamp::from_unix(since_epoch.as_secs() as i64, since_epoch.subsec_nanos())
    }

    /// Builds a timestamp from Unix seconds and nanoseconds.
    ///
    /// Seconds outside era 0 fold into the 32-bit field; the fraction is
    /// rounded to the nearest 2^-32 s.
    pub fn from_unix(secs: i64, nsec: u32) -> Self {
        let residue = nsec / NSEC_IN_SEC;
        let nsec = nsec % NSEC_IN_SEC;
        let secs = secs.wrapping_add(i64::from(residue));

        let seconds = secs.wrapping_add(i64::from(NTP_TIMESTAMP_DELTA)) as u32;
        let scaled = (u64::from(nsec) << 32) + u64::from(NSEC_IN_SEC / 2);
        let fraction = (scaled / u64::from(NSEC_IN_SEC)) as u32;

        NtpTimestamp { seconds, fraction }
    }

    pub const fn from_u64(raw: u64) -> Self {
        NtpTimestamp {
            seconds: (raw >> 32) as u32,
            fraction: raw as u32,
        }
    }

    pub const fn as_u64(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    pub const fn seconds(self) -> u32 {
        self.seconds
    }

    pub const fn fraction(self) -> u32 {
        self.fraction
    }

    /// Unix seconds and fractional seconds.
    ///
    /// Values with the high bit clear are taken to be in era 1 (from
    /// 2036-02-07T06:28:16Z), so the representable range runs from 1968 to
    /// 2104.
    pub fn to_unix(self) -> (i64, f64) {
        (self.unix_seconds(), f64::from(self.fraction) / FRACTION_SCALE)
    }

    /// Nanoseconds of the fraction, truncated.
    pub fn subsec_nanos(self) -> u32 {
        ((u64::from(self.fraction) * u64::from(NSEC_IN_SEC)) >> 32) as u32
    }

    /// `self - earlier` as signed 32.32 fixed point.
    ///
    /// Exact for any two timestamps less than half an era apart, whichever
    /// era each one falls in.
    pub fn signed_diff(self, earlier: NtpTimestamp) -> i64 {
        self.as_u64().wrapping_sub(earlier.as_u64()) as i64
    }

    /// Moves the timestamp by a signed 32.32 fixed-point interval.
    pub fn offset_by(self, interval: i64) -> Self {
        NtpTimestamp::from_u64(self.as_u64().wrapping_add(interval as u64))
    }

    /// Wall-clock date of the timestamp.
    ///
    /// Every timestamp falls between 1968 and 2104, well inside the range
    /// of nanoseconds an `i64` can count from the Unix epoch.
    pub fn to_datetime(self) -> DateTime<Utc> {
        let nanos =
            self.unix_seconds() * i64::from(NSEC_IN_SEC) + i64::from(self.subsec_nanos());
        Utc.timestamp_nanos(nanos)
    }

    fn unix_seconds(self) -> i64 {
        let seconds = i64::from(self.seconds);
        let seconds = if self.seconds & 0x8000_0000 == 0 {
            seconds + ERA_SECONDS
        } else {
            seconds
        };

        seconds - i64::from(NTP_TIMESTAMP_DELTA)
    }
}

impl fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}.{:08x}", self.seconds, self.fraction)
    }
}

/// Converts a signed 32.32 fixed-point interval to seconds.
pub(crate) fn fixed_to_secs(interval: i128) -> f64 {
    interval as f64 / FRACTION_SCALE
}
