use thiserror::Error;

/// Every way a single server test can fail.
///
/// I/O errors are kept as their rendered message so that the enum stays
/// `Clone` and comparable in tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    /// The caller supplied an empty or unparseable address.
    #[error("Invalid IP Address")]
    InvalidTarget(String),

    /// A zero read deadline was requested.
    #[error("Invalid timeout: the deadline must be greater than zero")]
    InvalidTimeout,

    /// The UDP association to the server could not be established.
    #[error("Could not connect to NTP server: {0}")]
    ConnectFailed(String),

    /// The request could not be written in full.
    #[error("Could not send NTP request: {0}")]
    SendFailed(String),

    /// No datagram arrived before the deadline.
    #[error("Could not reach NTP server.")]
    Timeout,

    /// A datagram arrived but was not a 48 byte NTP header.
    #[error("Invalid NTP response length: expected 48 bytes, got {0}")]
    BadLength(usize),

    /// The datagram had the right size but could not be interpreted.
    #[error("Invalid NTP response: {0}")]
    DecodeError(String),
}

impl Failure {
    /// Short machine-friendly tag of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::InvalidTarget(_) => "invalid_target",
            Failure::InvalidTimeout => "invalid_timeout",
            Failure::ConnectFailed(_) => "connect_failed",
            Failure::SendFailed(_) => "send_failed",
            Failure::Timeout => "timeout",
            Failure::BadLength(_) => "bad_length",
            Failure::DecodeError(_) => "decode_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_user_facing() {
        assert_eq!(Failure::Timeout.to_string(), "Could not reach NTP server.");
    }

    #[test]
    fn invalid_target_hides_raw_input() {
        let failure = Failure::InvalidTarget("not an ip".into());
        assert_eq!(failure.to_string(), "Invalid IP Address");
        assert_eq!(failure.kind(), "invalid_target");
    }

    #[test]
    fn bad_length_reports_size() {
        assert_eq!(
            Failure::BadLength(10).to_string(),
            "Invalid NTP response length: expected 48 bytes, got 10"
        );
    }
}
