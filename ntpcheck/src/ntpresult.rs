use std::fmt::Debug;
use std::fmt::Formatter;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Failure;
use crate::ntppacket::LeapIndicator;
use crate::offset::{compute, ExchangeTimestamps};
use crate::transport::{Exchange, Target};

/// Layout used for both clock readings in the report.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Outcome of a successful server test
#[derive(Clone, PartialEq)]
pub struct SyncResult {
    target: Target,
    version: u8,
    stratum: u8,
    leap: LeapIndicator,
    delay: f64,
    offset: f64,
    remote_time: DateTime<Utc>,
    local_time: DateTime<Utc>,
}

impl SyncResult {
    /// Server address that was tested
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// NTP version reported by the server
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Server stratum, 1 for a primary reference
    pub fn stratum(&self) -> u8 {
        self.stratum
    }

    pub fn leap(&self) -> LeapIndicator {
        self.leap
    }

    /// Round-trip delay in seconds, negative values included
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Local clock offset in seconds; positive when the local clock is behind
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Round-trip delay rounded to the nearest millisecond
    pub fn delay_ms(&self) -> i64 {
        (self.delay * 1000.0).round() as i64
    }

    /// Clock offset in milliseconds, kept to the microsecond
    pub fn offset_ms(&self) -> f64 {
        (self.offset * 1_000_000.0).round() / 1000.0
    }

    /// Server transmit time advanced by half the round trip
    pub fn remote_time(&self) -> DateTime<Utc> {
        self.remote_time
    }

    /// Local clock when the reply arrived
    pub fn local_time(&self) -> DateTime<Utc> {
        self.local_time
    }
}

impl Debug for SyncResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncResult")
            .field("target", &self.target.to_string())
            .field("version", &self.version)
            .field("stratum", &self.stratum)
            .field("leap", &self.leap)
            .field("delay", &self.delay)
            .field("offset", &self.offset)
            .field("remote_time", &self.remote_time)
            .field("local_time", &self.local_time)
            .finish()
    }
}

/// Builds the result record from a completed exchange.
pub fn report(target: Target, exchange: &Exchange) -> SyncResult {
    let response = &exchange.response;
    let timestamps = ExchangeTimestamps::new(
        exchange.t1,
        response.receive(),
        response.transmit(),
        exchange.t4,
    );
    let measurement = compute(&timestamps);

    let remote_time = response
        .transmit()
        .offset_by(measurement.one_way_fixed())
        .to_datetime();
    let local_time = exchange.t4.to_datetime();

    SyncResult {
        target,
        version: response.version(),
        stratum: response.stratum(),
        leap: response.leap(),
        delay: measurement.delay,
        offset: measurement.offset,
        remote_time,
        local_time,
    }
}

/// JSON document handed to the web layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Report {
    Success {
        message: String,
        server: String,
        version: u8,
        stratum: u8,
        delay_ms: i64,
        offset_ms: f64,
        remote_time: String,
        local_time: String,
    },
    Error {
        message: String,
    },
}

impl From<&SyncResult> for Report {
    fn from(result: &SyncResult) -> Self {
        Report::Success {
            message: "Server tested GOOD".to_owned(),
            server: result.target().to_string(),
            version: result.version(),
            stratum: result.stratum(),
            delay_ms: result.delay_ms(),
            offset_ms: result.offset_ms(),
            remote_time: result.remote_time().format(TIME_FORMAT).to_string(),
            local_time: result.local_time().format(TIME_FORMAT).to_string(),
        }
    }
}

impl From<&Failure> for Report {
    fn from(failure: &Failure) -> Self {
        Report::Error {
            message: failure.to_string(),
        }
    }
}

impl From<&Result<SyncResult, Failure>> for Report {
    fn from(outcome: &Result<SyncResult, Failure>) -> Self {
        match outcome {
            Ok(result) => Report::from(result),
            Err(failure) => Report::from(failure),
        }
    }
}
