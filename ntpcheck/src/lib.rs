//! Single-shot SNTP probe.
//!
//! Sends one version 3 client request to a server, waits a bounded time for
//! the reply and reports the server's version and stratum together with the
//! round-trip delay and the local clock offset.
//!
//! ```no_run
//! use ntpcheck::{test_server, DEFAULT_TIMEOUT};
//!
//! match test_server("192.168.1.1", DEFAULT_TIMEOUT) {
//!     Ok(result) => println!("offset {} ms", result.offset_ms()),
//!     Err(failure) => eprintln!("{}", failure),
//! }
//! ```

use std::time::Duration;

use log::{info, warn};

pub mod config;
pub mod error;
pub mod ntppacket;
pub mod ntpresult;
pub mod ntptimestamp;
pub mod offset;
pub mod transport;

pub use crate::error::Failure;
pub use crate::ntpresult::{Report, SyncResult};
pub use crate::ntptimestamp::NtpTimestamp;
pub use crate::transport::Target;

pub const NSEC_IN_SEC: u32 = 1_000_000_000;

/// Well-known NTP server port.
pub const NTP_PORT: u16 = 123;

/// Size of an NTP header without extension fields.
pub const NTP_PACKET_SIZE: usize = 48;

/// Read deadline applied when the caller does not choose one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Tests `target` with a single request/response exchange.
///
/// `target` is an IP address, an `ip:port` pair or a host name. The call
/// blocks for at most `timeout` waiting for the reply and never retries.
pub fn test_server(target: &str, timeout: Duration) -> Result<SyncResult, Failure> {
    let outcome = Target::parse(target).and_then(|target| {
        let exchange = transport::exchange(&target, timeout)?;
        Ok(ntpresult::report(target, &exchange))
    });

    match &outcome {
        Ok(result) => info!(
            "{}: version {} stratum {} delay {} ms offset {} ms",
            result.target(),
            result.version(),
            result.stratum(),
            result.delay_ms(),
            result.offset_ms()
        ),
        Err(failure) => warn!("{}: {} ({})", target, failure, failure.kind()),
    }

    outcome
}
