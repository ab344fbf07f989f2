//! Clock offset and round-trip delay from the four exchange timestamps.

use crate::ntptimestamp::{fixed_to_secs, NtpTimestamp};

/// T1 and T4 come from the local clock, T2 and T3 from the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeTimestamps {
    /// Local send time.
    pub t1: NtpTimestamp,
    /// Server receive time.
    pub t2: NtpTimestamp,
    /// Server transmit time.
    pub t3: NtpTimestamp,
    /// Local receive time.
    pub t4: NtpTimestamp,
}

impl ExchangeTimestamps {
    pub fn new(t1: NtpTimestamp, t2: NtpTimestamp, t3: NtpTimestamp, t4: NtpTimestamp) -> Self {
        ExchangeTimestamps { t1, t2, t3, t4 }
    }
}

/// Delay and offset in seconds. Either can be negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    pub delay: f64,
    pub offset: f64,
    delay_fixed: i64,
}

impl Measurement {
    /// Half the round-trip delay in 32.32 fixed point.
    pub(crate) fn one_way_fixed(&self) -> i64 {
        self.delay_fixed / 2
    }
}

/// `delay = (T4 - T1) - (T3 - T2)`, `offset = ((T2 - T1) + (T3 - T4)) / 2`.
///
/// The intervals are taken in 32.32 fixed point and only the final values
/// are converted to floating point, so fixtures on exact binary fractions
/// come out exact.
pub fn compute(ts: &ExchangeTimestamps) -> Measurement {
    let round_trip = i128::from(ts.t4.signed_diff(ts.t1));
    let server_hold = i128::from(ts.t3.signed_diff(ts.t2));
    let outbound = i128::from(ts.t2.signed_diff(ts.t1));
    let inbound = i128::from(ts.t3.signed_diff(ts.t4));

    let delay = round_trip - server_hold;
    let offset = outbound + inbound;

    Measurement {
        delay: fixed_to_secs(delay),
        offset: fixed_to_secs(offset) / 2.0,
        delay_fixed: delay.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
    }
}
