use arrayref::{array_ref, array_refs};
use log::{debug, warn};

use crate::error::Failure;
use crate::ntptimestamp::NtpTimestamp;
use crate::NTP_PACKET_SIZE;

/// Leap second warning carried in the top two bits of the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeapIndicator {
    NoWarning,
    AddSecond,
    DelSecond,
    Unknown,
}

impl From<u8> for LeapIndicator {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddSecond,
            2 => LeapIndicator::DelSecond,
            _ => LeapIndicator::Unknown,
        }
    }
}

/// Association mode carried in the low three bits of the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Reserved,
    SymmetricActive,
    SymmetricPassive,
    Client,
    Server,
    Broadcast,
    Control,
    Private,
}

impl From<u8> for Mode {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::Control,
            _ => Mode::Private,
        }
    }
}

/// The fixed 48 byte NTP header with every field named.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NtpPacket {
    pub li_vn_mode: u8,
    pub stratum: u8,
    pub poll: i8,
    pub precision: i8,
    pub root_delay: u32,
    pub root_dispersion: u32,
    pub ref_id: u32,
    pub ref_timestamp: NtpTimestamp,
    pub origin_timestamp: NtpTimestamp,
    pub recv_timestamp: NtpTimestamp,
    pub tx_timestamp: NtpTimestamp,
}

impl NtpPacket {
    const SNTP_CLIENT_MODE: u8 = 3;
    const SNTP_VERSION: u8 = 3 << 3;
    const LI_SHIFT: u8 = 6;
    const VN_SHIFT: u8 = 3;
    const VN_MASK: u8 = 0b0000_0111;
    const MODE_MASK: u8 = 0b0000_0111;

    /// Client request stamped with `tx_timestamp`; every other field is zero.
    pub fn request(tx_timestamp: NtpTimestamp) -> NtpPacket {
        debug!("request transmit timestamp {}", tx_timestamp);

        NtpPacket {
            li_vn_mode: NtpPacket::SNTP_CLIENT_MODE | NtpPacket::SNTP_VERSION,
            tx_timestamp,
            ..NtpPacket::default()
        }
    }

    pub fn leap(&self) -> LeapIndicator {
        LeapIndicator::from(self.li_vn_mode >> NtpPacket::LI_SHIFT)
    }

    pub fn version(&self) -> u8 {
        (self.li_vn_mode >> NtpPacket::VN_SHIFT) & NtpPacket::VN_MASK
    }

    pub fn mode(&self) -> Mode {
        Mode::from(self.li_vn_mode & NtpPacket::MODE_MASK)
    }

    pub fn to_bytes(&self) -> [u8; NTP_PACKET_SIZE] {
        let mut buf = [0u8; NTP_PACKET_SIZE];

        buf[0] = self.li_vn_mode;
        buf[1] = self.stratum;
        buf[2] = self.poll as u8;
        buf[3] = self.precision as u8;
        buf[4..8].copy_from_slice(&self.root_delay.to_be_bytes());
        buf[8..12].copy_from_slice(&self.root_dispersion.to_be_bytes());
        buf[12..16].copy_from_slice(&self.ref_id.to_be_bytes());
        buf[16..24].copy_from_slice(&self.ref_timestamp.as_u64().to_be_bytes());
        buf[24..32].copy_from_slice(&self.origin_timestamp.as_u64().to_be_bytes());
        buf[32..40].copy_from_slice(&self.recv_timestamp.as_u64().to_be_bytes());
        buf[40..48].copy_from_slice(&self.tx_timestamp.as_u64().to_be_bytes());

        buf
    }

    pub fn from_bytes(buf: &[u8; NTP_PACKET_SIZE]) -> NtpPacket {
        NtpPacket {
            li_vn_mode: buf[0],
            stratum: buf[1],
            poll: buf[2] as i8,
            precision: buf[3] as i8,
            root_delay: u32::from_be_bytes(*array_ref![buf, 4, 4]),
            root_dispersion: u32::from_be_bytes(*array_ref![buf, 8, 4]),
            ref_id: u32::from_be_bytes(*array_ref![buf, 12, 4]),
            ref_timestamp: read_timestamp(array_ref![buf, 16, 8]),
            origin_timestamp: read_timestamp(array_ref![buf, 24, 8]),
            recv_timestamp: read_timestamp(array_ref![buf, 32, 8]),
            tx_timestamp: read_timestamp(array_ref![buf, 40, 8]),
        }
    }
}

fn read_timestamp(src: &[u8; 8]) -> NtpTimestamp {
    let (seconds, fraction) = array_refs![src, 4, 4];
    NtpTimestamp::new(u32::from_be_bytes(*seconds), u32::from_be_bytes(*fraction))
}

/// Decoded server reply. Read-only once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponsePacket {
    packet: NtpPacket,
}

impl ResponsePacket {
    pub fn leap(&self) -> LeapIndicator {
        self.packet.leap()
    }

    pub fn version(&self) -> u8 {
        self.packet.version()
    }

    pub fn mode(&self) -> Mode {
        self.packet.mode()
    }

    pub fn stratum(&self) -> u8 {
        self.packet.stratum
    }

    /// Echo of the request's transmit timestamp.
    pub fn originate(&self) -> NtpTimestamp {
        self.packet.origin_timestamp
    }

    /// T2, when the request reached the server.
    pub fn receive(&self) -> NtpTimestamp {
        self.packet.recv_timestamp
    }

    /// T3, when the server sent the reply.
    pub fn transmit(&self) -> NtpTimestamp {
        self.packet.tx_timestamp
    }
}

/// Serializes a version 3 client request carrying `send_time` as T1.
pub fn encode_request(send_time: NtpTimestamp) -> [u8; NTP_PACKET_SIZE] {
    NtpPacket::request(send_time).to_bytes()
}

/// Parses a server reply. Anything but exactly 48 bytes is rejected.
///
/// A mode other than server is tolerated, since lenient SNTP servers still
/// return usable timestamps, but it is logged.
pub fn decode_response(buf: &[u8]) -> Result<ResponsePacket, Failure> {
    if buf.len() != NTP_PACKET_SIZE {
        return Err(Failure::DecodeError(format!(
            "expected {} bytes, got {}",
            NTP_PACKET_SIZE,
            buf.len()
        )));
    }

    let packet = NtpPacket::from_bytes(array_ref![buf, 0, NTP_PACKET_SIZE]);
    debug!(
        "response li={:?} vn={} mode={:?} stratum={} rx={} tx={}",
        packet.leap(),
        packet.version(),
        packet.mode(),
        packet.stratum,
        packet.recv_timestamp,
        packet.tx_timestamp
    );

    if packet.mode() != Mode::Server {
        warn!("response mode is {:?}, expected Server", packet.mode());
    }

    Ok(ResponsePacket { packet })
}
