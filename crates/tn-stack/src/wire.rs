//! Fixed Ethernet and IPv4 header codec (RFC 894, RFC 791).
//! Options are never parsed here; they stay as raw bytes in the packet data region.

use std::net::Ipv4Addr;

use crate::error::StackError;

pub const SIZE_ETHERNET_HEADER: usize = 14;
pub const SIZE_IPV4_HEADER: usize = 20;

pub const ETHERTYPE_IPV4: u16 = 0x0800;

pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

pub const BROADCAST_MAC: [u8; 6] = [0xff; 6];

/// Ethernet II header (14 bytes)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: [u8; 6],
    pub source: [u8; 6],
    pub ether_type: u16,
}

impl EthernetHeader {
    pub fn decode(buf: &[u8]) -> Result<Self, StackError> {
        if buf.len() < SIZE_ETHERNET_HEADER {
            return Err(StackError::ShortFrame(buf.len()));
        }
        let mut destination = [0u8; 6];
        destination.copy_from_slice(&buf[0..6]);
        let mut source = [0u8; 6];
        source.copy_from_slice(&buf[6..12]);
        Ok(Self {
            destination,
            source,
            ether_type: u16::from_be_bytes([buf[12], buf[13]]),
        })
    }

    /// Writes the header into the first 14 bytes of `buf`. Panics if `buf` is shorter.
    pub fn put(&self, buf: &mut [u8]) {
        buf[0..6].copy_from_slice(&self.destination);
        buf[6..12].copy_from_slice(&self.source);
        buf[12..14].copy_from_slice(&self.ether_type.to_be_bytes());
    }
}

/// IPv4 header without options (20 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version_ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub id: u16,
    pub flags: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Self {
            version_ihl: 0x45,
            tos: 0,
            total_length: 0,
            id: 0,
            flags: 0,
            ttl: 0,
            protocol: 0,
            checksum: 0,
            source: Ipv4Addr::UNSPECIFIED,
            destination: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl Ipv4Header {
    pub fn decode(buf: &[u8]) -> Result<Self, StackError> {
        if buf.len() < SIZE_IPV4_HEADER {
            return Err(StackError::ShortFrame(buf.len()));
        }
        Ok(Self {
            version_ihl: buf[0],
            tos: buf[1],
            total_length: u16::from_be_bytes([buf[2], buf[3]]),
            id: u16::from_be_bytes([buf[4], buf[5]]),
            flags: u16::from_be_bytes([buf[6], buf[7]]),
            ttl: buf[8],
            protocol: buf[9],
            checksum: u16::from_be_bytes([buf[10], buf[11]]),
            source: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            destination: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
        })
    }

    /// Header length in 32-bit words
    pub fn ihl(&self) -> u8 {
        self.version_ihl & 0x0f
    }

    /// Sets the header length in words. Version is always written as 4.
    pub fn set_ihl(&mut self, words: u8) {
        self.version_ihl = 0x40 | (words & 0x0f);
    }

    /// Writes the header into the first 20 bytes of `buf`. Panics if `buf` is shorter.
    pub fn put(&self, buf: &mut [u8]) {
        buf[0] = 0x40 | self.ihl();
        buf[1] = self.tos;
        buf[2..4].copy_from_slice(&self.total_length.to_be_bytes());
        buf[4..6].copy_from_slice(&self.id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_be_bytes());
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        buf[10..12].copy_from_slice(&self.checksum.to_be_bytes());
        buf[12..16].copy_from_slice(&self.source.octets());
        buf[16..20].copy_from_slice(&self.destination.octets());
    }

    /// Header checksum computed with the checksum field taken as zero.
    pub fn calculate_checksum(&self) -> u16 {
        let mut buf = [0u8; SIZE_IPV4_HEADER];
        let mut hdr = self.clone();
        hdr.checksum = 0;
        hdr.put(&mut buf);
        checksum(&buf, 0)
    }

    /// Partial sum of the pseudo-header used by TCP and UDP checksums.
    pub fn pseudo_header_sum(&self, protocol: u8, length: u16) -> u32 {
        let mut sum = 0u32;
        for pair in self.source.octets().chunks(2).chain(self.destination.octets().chunks(2)) {
            sum += u16::from_be_bytes([pair[0], pair[1]]) as u32;
        }
        sum + protocol as u32 + length as u32
    }
}

/// RFC 1071 internet checksum over `data`, starting from a partial `initial` sum.
pub fn checksum(data: &[u8], initial: u32) -> u16 {
    let mut sum = initial;
    let mut chunks = data.chunks_exact(2);
    for pair in &mut chunks {
        sum += u16::from_be_bytes([pair[0], pair[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
