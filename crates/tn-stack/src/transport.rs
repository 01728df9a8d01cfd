//! TCP and UDP fixed header codec.

use std::fmt::Debug;

use crate::error::StackError;
use crate::wire::{IP_PROTO_TCP, IP_PROTO_UDP, Ipv4Header, checksum};

pub const SIZE_TCP_HEADER: usize = 20;
pub const SIZE_UDP_HEADER: usize = 8;

/// Fixed part of a transport header stored in a [`PacketBuffer`](crate::PacketBuffer).
pub trait TransportHeader: Debug + Clone + Default {
    /// Size of the fixed header, options excluded.
    const SIZE: usize;
    /// IPv4 protocol number.
    const PROTOCOL: u8;

    fn decode(buf: &[u8]) -> Result<Self, StackError>;

    /// Writes the fixed header into the first `SIZE` bytes of `buf`. Panics if `buf` is shorter.
    fn put(&self, buf: &mut [u8]);

    /// Header length including options, as announced by the header itself.
    fn offset_in_bytes(&self) -> usize;

    fn source_port(&self) -> u16;
    fn destination_port(&self) -> u16;
}

pub const TCP_SYN: u16 = 0x002;
pub const TCP_PSH: u16 = 0x008;
pub const TCP_ACK: u16 = 0x010;

/// TCP header without options (20 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub seq: u32,
    pub ack: u32,
    /// Data offset (upper 4 bits) and flags (lower 9 bits).
    pub offset_flags: u16,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
}

/// What the control block sees of an incoming or outgoing TCP segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    pub seq: u32,
    pub ack: u32,
    pub window: u16,
    pub flags: u16,
    pub data_len: usize,
}

impl TcpHeader {
    pub fn flags(&self) -> u16 {
        self.offset_flags & 0x01ff
    }

    /// Data offset in 32-bit words.
    pub fn data_offset(&self) -> u8 {
        (self.offset_flags >> 12) as u8
    }

    pub fn set_offset_flags(&mut self, words: u8, flags: u16) {
        self.offset_flags = ((words as u16 & 0x0f) << 12) | (flags & 0x01ff);
    }

    pub fn segment(&self, payload_len: usize) -> Segment {
        Segment {
            seq: self.seq,
            ack: self.ack,
            window: self.window,
            flags: self.flags(),
            data_len: payload_len,
        }
    }
}

impl TransportHeader for TcpHeader {
    const SIZE: usize = SIZE_TCP_HEADER;
    const PROTOCOL: u8 = IP_PROTO_TCP;

    fn decode(buf: &[u8]) -> Result<Self, StackError> {
        if buf.len() < SIZE_TCP_HEADER {
            return Err(StackError::ShortFrame(buf.len()));
        }
        Ok(Self {
            source_port: u16::from_be_bytes([buf[0], buf[1]]),
            destination_port: u16::from_be_bytes([buf[2], buf[3]]),
            seq: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            ack: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            offset_flags: u16::from_be_bytes([buf[12], buf[13]]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            checksum: u16::from_be_bytes([buf[16], buf[17]]),
            urgent: u16::from_be_bytes([buf[18], buf[19]]),
        })
    }

    fn put(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seq.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ack.to_be_bytes());
        buf[12..14].copy_from_slice(&self.offset_flags.to_be_bytes());
        buf[14..16].copy_from_slice(&self.window.to_be_bytes());
        buf[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        buf[18..20].copy_from_slice(&self.urgent.to_be_bytes());
    }

    fn offset_in_bytes(&self) -> usize {
        4 * self.data_offset() as usize
    }

    fn source_port(&self) -> u16 {
        self.source_port
    }

    fn destination_port(&self) -> u16 {
        self.destination_port
    }
}

/// UDP header (8 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    /// Checksum over the IPv4 pseudo-header, this header and `payload`.
    /// `self.length` must already hold the final datagram length.
    pub fn calculate_checksum_ipv4(&self, ip: &Ipv4Header, payload: &[u8]) -> u16 {
        let mut hdr = [0u8; SIZE_UDP_HEADER];
        let mut zeroed = self.clone();
        zeroed.checksum = 0;
        zeroed.put(&mut hdr);

        let mut sum = ip.pseudo_header_sum(IP_PROTO_UDP, self.length);
        for pair in hdr.chunks(2) {
            sum += u16::from_be_bytes([pair[0], pair[1]]) as u32;
        }
        // An all-zero result is transmitted as all ones (RFC 768).
        match checksum(payload, sum) {
            0 => 0xffff,
            sum => sum,
        }
    }
}

impl TransportHeader for UdpHeader {
    const SIZE: usize = SIZE_UDP_HEADER;
    const PROTOCOL: u8 = IP_PROTO_UDP;

    fn decode(buf: &[u8]) -> Result<Self, StackError> {
        if buf.len() < SIZE_UDP_HEADER {
            return Err(StackError::ShortFrame(buf.len()));
        }
        Ok(Self {
            source_port: u16::from_be_bytes([buf[0], buf[1]]),
            destination_port: u16::from_be_bytes([buf[2], buf[3]]),
            length: u16::from_be_bytes([buf[4], buf[5]]),
            checksum: u16::from_be_bytes([buf[6], buf[7]]),
        })
    }

    fn put(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.source_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.destination_port.to_be_bytes());
        buf[4..6].copy_from_slice(&self.length.to_be_bytes());
        buf[6..8].copy_from_slice(&self.checksum.to_be_bytes());
    }

    fn offset_in_bytes(&self) -> usize {
        SIZE_UDP_HEADER
    }

    fn source_port(&self) -> u16 {
        self.source_port
    }

    fn destination_port(&self) -> u16 {
        self.destination_port
    }
}
