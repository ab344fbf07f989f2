//! Loopback UDP servers for integration tests.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ntpcheck::NtpTimestamp;

/// Answers exactly one request with whatever `reply` builds from it.
pub fn one_shot_server<F>(reply: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(&[u8]) -> Vec<u8> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = socket.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 512];
        let (len, peer) = socket.recv_from(&mut buf).unwrap();
        let response = reply(&buf[..len]);
        socket.send_to(&response, peer).unwrap();
    });

    (addr, handle)
}

/// Well-formed stratum 1 server reply echoing the request's transmit time.
pub fn server_reply(request: &[u8]) -> Vec<u8> {
    let now = NtpTimestamp::now().as_u64().to_be_bytes();

    let mut reply = vec![0u8; 48];
    reply[0] = 0b00_011_100;
    reply[1] = 1;
    reply[12..16].copy_from_slice(b"GPS\0");
    reply[24..32].copy_from_slice(&request[40..48]);
    reply[32..40].copy_from_slice(&now);
    reply[40..48].copy_from_slice(&now);
    reply
}
