//! DHCPv4 fixed header and on-wire layout (RFC 2131)

use std::net::Ipv4Addr;
use thiserror::Error;

use tn_stack::StackError;

/// Fixed BOOTP/DHCP header: op through chaddr.
pub const SIZE_DHCP_HEADER: usize = 44;
/// Legacy server host name field.
pub const SIZE_SNAME: usize = 64;
/// Legacy boot file name field.
pub const SIZE_FILE: usize = 128;
/// Options area of a minimum-size DHCP message, cookie included.
pub const SIZE_OPTIONS: usize = 312;
/// Offset of the magic cookie from the start of the DHCP message.
pub const COOKIE_OFFSET: usize = SIZE_DHCP_HEADER + SIZE_SNAME + SIZE_FILE;
/// Offset of the first option from the start of the DHCP message.
pub const OPTIONS_OFFSET: usize = COOKIE_OFFSET + 4;
/// Total size of the DHCP messages this server emits.
pub const SIZE_DHCP_TOTAL: usize = SIZE_DHCP_HEADER + SIZE_SNAME + SIZE_FILE + SIZE_OPTIONS;

/// DHCP magic cookie
pub const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

pub const BOOTREQUEST: u8 = 1;
pub const BOOTREPLY: u8 = 2;

#[derive(Error, Debug)]
pub enum DhcpError {
    #[error("Packet too short: {0} bytes (minimum 44)")]
    TooShort(usize),
    #[error("Packet too short to hold DHCP options")]
    MissingOptions,
    #[error("Invalid magic cookie")]
    InvalidMagic,
    #[error("Buffer too short: need {need} bytes, got {got}")]
    ShortBuffer { need: usize, got: usize },
    #[error("Option tag {0} is reserved for padding or the end marker")]
    ReservedTag(u8),
    #[error("Option {tag} data too long: {len} bytes")]
    OptionTooLong { tag: u8, len: usize },
    #[error("Unexpected DHCP message type {msg_type} in state {state}")]
    UnexpectedMessage { msg_type: u8, state: &'static str },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Fixed part of a DHCP message. `sname`, `file` and options are handled separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpHeader {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
}

impl DhcpHeader {
    pub fn decode(data: &[u8]) -> Result<Self, DhcpError> {
        if data.len() < SIZE_DHCP_HEADER {
            return Err(DhcpError::TooShort(data.len()));
        }
        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&data[28..44]);

        Ok(DhcpHeader {
            op: data[0],
            htype: data[1],
            hlen: data[2],
            hops: data[3],
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            secs: u16::from_be_bytes([data[8], data[9]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            yiaddr: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            siaddr: Ipv4Addr::new(data[20], data[21], data[22], data[23]),
            giaddr: Ipv4Addr::new(data[24], data[25], data[26], data[27]),
            chaddr,
        })
    }

    /// Writes the header into the first 44 bytes of `buf`. Panics if `buf` is shorter.
    pub fn put(&self, buf: &mut [u8]) {
        buf[0] = self.op;
        buf[1] = self.htype;
        buf[2] = self.hlen;
        buf[3] = self.hops;
        buf[4..8].copy_from_slice(&self.xid.to_be_bytes());
        buf[8..10].copy_from_slice(&self.secs.to_be_bytes());
        buf[10..12].copy_from_slice(&self.flags.to_be_bytes());
        buf[12..16].copy_from_slice(&self.ciaddr.octets());
        buf[16..20].copy_from_slice(&self.yiaddr.octets());
        buf[20..24].copy_from_slice(&self.siaddr.octets());
        buf[24..28].copy_from_slice(&self.giaddr.octets());
        buf[28..44].copy_from_slice(&self.chaddr);
    }
}

/// Format a MAC address as aa:bb:cc:dd:ee:ff
pub fn mac_str(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(COOKIE_OFFSET, 236);
        assert_eq!(OPTIONS_OFFSET, 240);
        assert_eq!(SIZE_DHCP_TOTAL, 548);
    }

    #[test]
    fn test_decode_put() {
        let mut raw = [0u8; SIZE_DHCP_HEADER];
        raw[0] = BOOTREQUEST;
        raw[1] = 1;
        raw[2] = 6;
        raw[4..8].copy_from_slice(&0x12345678u32.to_be_bytes());
        raw[10] = 0x80;
        raw[20..24].copy_from_slice(&[192, 168, 1, 1]);
        raw[28..34].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

        let hdr = DhcpHeader::decode(&raw).unwrap();
        assert_eq!(hdr.op, BOOTREQUEST);
        assert_eq!(hdr.xid, 0x12345678);
        assert_eq!(hdr.flags, 0x8000);
        assert_eq!(hdr.siaddr, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(mac_str(&hdr.chaddr[..6]), "aa:bb:cc:dd:ee:ff");

        let mut out = [0u8; SIZE_DHCP_HEADER];
        hdr.put(&mut out);
        assert_eq!(out, raw);
    }

    #[test]
    fn test_decode_short() {
        assert!(matches!(DhcpHeader::decode(&[0u8; 43]), Err(DhcpError::TooShort(43))));
    }
}
