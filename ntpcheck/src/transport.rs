//! One UDP request/response exchange with a deadline.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use log::{debug, warn};

use crate::error::Failure;
use crate::ntppacket::{decode_response, encode_request, ResponsePacket};
use crate::ntptimestamp::NtpTimestamp;
use crate::{NTP_PACKET_SIZE, NTP_PORT};

/// Room for oversized replies so they can be told apart from exact ones.
const RECV_BUFFER_SIZE: usize = 1024;

/// A resolved server address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Target {
    addr: SocketAddr,
}

impl Target {
    /// Accepts a bare IP address (port 123 is implied), an explicit socket
    /// address, or a host name resolved against port 123.
    pub fn parse(input: &str) -> Result<Target, Failure> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Failure::InvalidTarget(input.to_owned()));
        }

        if let Ok(ip) = input.parse::<IpAddr>() {
            return Ok(Target::from(SocketAddr::new(ip, NTP_PORT)));
        }
        if let Ok(addr) = input.parse::<SocketAddr>() {
            return Ok(Target::from(addr));
        }
        if !is_host_name(input) {
            return Err(Failure::InvalidTarget(input.to_owned()));
        }

        let mut addrs = (input, NTP_PORT)
            .to_socket_addrs()
            .map_err(|e| Failure::ConnectFailed(format!("{}: {}", input, e)))?;
        addrs
            .next()
            .map(Target::from)
            .ok_or_else(|| Failure::ConnectFailed(format!("{}: no addresses found", input)))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn bind_addr(&self) -> SocketAddr {
        match self.addr {
            SocketAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            SocketAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
        }
    }
}

impl From<SocketAddr> for Target {
    fn from(addr: SocketAddr) -> Self {
        Target { addr }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.addr.port() == NTP_PORT {
            write!(f, "{}", self.addr.ip())
        } else {
            write!(f, "{}", self.addr)
        }
    }
}

fn is_host_name(input: &str) -> bool {
    input.len() <= 253
        && input.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// The datagram operations an exchange needs from a connected socket.
pub trait NtpSocket {
    fn send(&self, buf: &[u8]) -> io::Result<usize>;
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

impl NtpSocket for UdpSocket {
    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, buf)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buf)
    }
}

/// What a completed exchange hands to the offset calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Exchange {
    pub response: ResponsePacket,
    /// Local send time, as stamped into the request.
    pub t1: NtpTimestamp,
    /// Local receive time, captured before decoding.
    pub t4: NtpTimestamp,
}

/// Sends one request to `target` and waits at most `timeout` for the reply.
///
/// The socket lives only for the duration of the call.
pub fn exchange(target: &Target, timeout: Duration) -> Result<Exchange, Failure> {
    if timeout == Duration::from_secs(0) {
        return Err(Failure::InvalidTimeout);
    }

    let connect_failed = |e: io::Error| Failure::ConnectFailed(format!("{}: {}", target, e));

    let socket = UdpSocket::bind(target.bind_addr()).map_err(connect_failed)?;
    socket.connect(target.addr()).map_err(connect_failed)?;
    socket
        .set_read_timeout(Some(timeout))
        .map_err(connect_failed)?;
    socket
        .set_write_timeout(Some(timeout))
        .map_err(connect_failed)?;

    debug!(
        "querying {} from {:?} with {:?} deadline",
        target.addr(),
        socket.local_addr().ok(),
        timeout
    );

    exchange_over(&socket)
}

/// Runs the request/response exchange over an already connected socket.
pub fn exchange_over<S: NtpSocket>(socket: &S) -> Result<Exchange, Failure> {
    let t1 = NtpTimestamp::now();
    let request = encode_request(t1);

    let sent = socket
        .send(&request)
        .map_err(|e| Failure::SendFailed(e.to_string()))?;
    if sent != request.len() {
        return Err(Failure::SendFailed(format!(
            "wrote {} of {} bytes",
            sent,
            request.len()
        )));
    }

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let received = socket.recv(&mut buf);
    let t4 = NtpTimestamp::now();

    let len = match received {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
            return Err(Failure::Timeout);
        }
        Err(e) => return Err(Failure::ConnectFailed(e.to_string())),
    };

    if len != NTP_PACKET_SIZE {
        return Err(Failure::BadLength(len));
    }

    let response = decode_response(&buf[..len])?;
    if response.originate() != t1 {
        warn!(
            "originate timestamp {} does not echo request {}",
            response.originate(),
            t1
        );
    }

    Ok(Exchange { response, t1, t4 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct ScriptedSocket {
        sent: RefCell<Vec<Vec<u8>>>,
        send_result: Option<usize>,
        send_error: Option<io::ErrorKind>,
        reply: io::Result<Vec<u8>>,
    }

    impl ScriptedSocket {
        fn replying(reply: Vec<u8>) -> Self {
            ScriptedSocket {
                sent: RefCell::new(Vec::new()),
                send_result: None,
                send_error: None,
                reply: Ok(reply),
            }
        }

        fn failing(kind: io::ErrorKind) -> Self {
            ScriptedSocket {
                sent: RefCell::new(Vec::new()),
                send_result: None,
                send_error: None,
                reply: Err(io::Error::new(kind, "scripted")),
            }
        }
    }

    impl NtpSocket for ScriptedSocket {
        fn send(&self, buf: &[u8]) -> io::Result<usize> {
            if let Some(kind) = self.send_error {
                return Err(io::Error::new(kind, "scripted send"));
            }
            self.sent.borrow_mut().push(buf.to_vec());
            Ok(self.send_result.unwrap_or(buf.len()))
        }

        fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            match &self.reply {
                Ok(reply) => {
                    buf[..reply.len()].copy_from_slice(reply);
                    Ok(reply.len())
                }
                Err(e) => Err(io::Error::new(e.kind(), "scripted")),
            }
        }
    }

    fn server_reply() -> Vec<u8> {
        let mut reply = vec![0u8; NTP_PACKET_SIZE];
        reply[0] = 0x1C;
        reply[1] = 1;
        reply
    }

    #[test]
    fn sends_one_request_and_keeps_t1() {
        let socket = ScriptedSocket::replying(server_reply());
        let exchange = exchange_over(&socket).unwrap();

        let sent = socket.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), NTP_PACKET_SIZE);
        assert_eq!(sent[0][0], 0x1B);
        assert_eq!(&sent[0][40..48], &exchange.t1.as_u64().to_be_bytes());
        assert!(exchange.t4.signed_diff(exchange.t1) >= 0);
        assert_eq!(exchange.response.stratum(), 1);
    }

    #[test]
    fn short_datagram_is_bad_length() {
        let socket = ScriptedSocket::replying(vec![0u8; 10]);
        assert_eq!(exchange_over(&socket), Err(Failure::BadLength(10)));
    }

    #[test]
    fn long_datagram_is_bad_length() {
        let socket = ScriptedSocket::replying(vec![0u8; 49]);
        assert_eq!(exchange_over(&socket), Err(Failure::BadLength(49)));
    }

    #[test]
    fn empty_datagram_is_bad_length() {
        let socket = ScriptedSocket::replying(Vec::new());
        assert_eq!(exchange_over(&socket), Err(Failure::BadLength(0)));
    }

    #[test]
    fn would_block_and_timed_out_are_timeouts() {
        for kind in &[io::ErrorKind::WouldBlock, io::ErrorKind::TimedOut] {
            let socket = ScriptedSocket::failing(*kind);
            assert_eq!(exchange_over(&socket), Err(Failure::Timeout));
        }
    }

    #[test]
    fn refused_is_connect_failure() {
        let socket = ScriptedSocket::failing(io::ErrorKind::ConnectionRefused);
        assert!(matches!(
            exchange_over(&socket),
            Err(Failure::ConnectFailed(_))
        ));
    }

    #[test]
    fn partial_write_is_send_failure() {
        let mut socket = ScriptedSocket::replying(server_reply());
        socket.send_result = Some(20);
        assert!(matches!(exchange_over(&socket), Err(Failure::SendFailed(_))));
    }

    #[test]
    fn send_error_is_send_failure() {
        let mut socket = ScriptedSocket::replying(server_reply());
        socket.send_error = Some(io::ErrorKind::PermissionDenied);

        assert_eq!(
            exchange_over(&socket),
            Err(Failure::SendFailed("scripted send".to_owned()))
        );
        assert!(socket.sent.borrow().is_empty());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let target = Target::parse("127.0.0.1").unwrap();
        assert_eq!(
            exchange(&target, Duration::from_secs(0)),
            Err(Failure::InvalidTimeout)
        );
    }

    #[test]
    fn parses_bare_ips_with_default_port() {
        let v4 = Target::parse(" 192.168.1.10 ").unwrap();
        assert_eq!(v4.addr(), "192.168.1.10:123".parse::<SocketAddr>().unwrap());
        assert_eq!(v4.to_string(), "192.168.1.10");

        let v6 = Target::parse("::1").unwrap();
        assert_eq!(v6.addr(), "[::1]:123".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn parses_explicit_socket_addresses() {
        let target = Target::parse("127.0.0.1:10123").unwrap();
        assert_eq!(target.addr().port(), 10123);
        assert_eq!(target.to_string(), "127.0.0.1:10123");
    }

    #[test]
    fn rejects_empty_and_garbage() {
        for input in &["", "   ", "not an ip", "10.0.0.1/24", "-bad.example"] {
            assert!(
                matches!(Target::parse(input), Err(Failure::InvalidTarget(_))),
                "{:?}",
                input
            );
        }
    }
}
