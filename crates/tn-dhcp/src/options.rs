use std::net::Ipv4Addr;

use crate::packet::{COOKIE_OFFSET, DhcpError, DhcpHeader, MAGIC_COOKIE, OPTIONS_OFFSET};

/// DHCP option codes (RFC 2132)
pub const OPT_PAD: u8 = 0;
pub const OPT_SUBNET_MASK: u8 = 1;
pub const OPT_ROUTER: u8 = 3;
pub const OPT_REQUESTED_IP: u8 = 50;
pub const OPT_LEASE_TIME: u8 = 51;
pub const OPT_MSG_TYPE: u8 = 53;
pub const OPT_SERVER_ID: u8 = 54;
pub const OPT_PARAM_REQUEST: u8 = 55;
pub const OPT_END: u8 = 255;

/// DHCP message types
pub const DHCPDISCOVER: u8 = 1;
pub const DHCPOFFER: u8 = 2;
pub const DHCPREQUEST: u8 = 3;
pub const DHCPACK: u8 = 5;

/// A DHCP option borrowing its data from a packet or from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhcpOption<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

impl<'a> DhcpOption<'a> {
    pub fn new(tag: u8, data: &'a [u8]) -> Self {
        Self { tag, data }
    }

    /// Extract IPv4 address from option data
    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        let octets: [u8; 4] = self.data.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Extract u8 from option data. Only accepts single-byte options.
    pub fn as_u8(&self) -> Option<u8> {
        match self.data {
            [b] => Some(*b),
            _ => None,
        }
    }
}

/// Parse a full DHCP message: decodes the fixed header and calls `visit` for each
/// option after the magic cookie.
///
/// Scanning stops at the end marker, or silently at an option whose length byte or
/// data would run past the end of `buf`. An error from `visit` aborts the scan.
pub fn parse<'a, F>(buf: &'a [u8], mut visit: F) -> Result<DhcpHeader, DhcpError>
where
    F: FnMut(DhcpOption<'a>) -> Result<(), DhcpError>,
{
    let header = DhcpHeader::decode(buf)?;
    if buf.len() <= OPTIONS_OFFSET {
        return Err(DhcpError::MissingOptions);
    }
    if buf[COOKIE_OFFSET..OPTIONS_OFFSET] != MAGIC_COOKIE {
        return Err(DhcpError::InvalidMagic);
    }

    let mut i = OPTIONS_OFFSET;
    while i < buf.len() {
        let tag = buf[i];
        if tag == OPT_END {
            break;
        }
        if tag == OPT_PAD {
            i += 1;
            continue;
        }
        let Some(&len) = buf.get(i + 1) else {
            break;
        };
        let start = i + 2;
        let end = start + len as usize;
        if end > buf.len() {
            break;
        }
        visit(DhcpOption::new(tag, &buf[start..end]))?;
        i = end;
    }

    Ok(header)
}

/// Encode options as tag, length, data starting at `dst[0]`. The caller writes the
/// magic cookie before and the end marker after. Returns the number of bytes written.
///
/// Pad and end tags have no length byte on the wire, so they are rejected with
/// [`DhcpError::ReservedTag`] before anything is written.
pub fn encode(dst: &mut [u8], options: &[DhcpOption<'_>]) -> Result<usize, DhcpError> {
    if let Some(opt) = options.iter().find(|o| o.tag == OPT_PAD || o.tag == OPT_END) {
        return Err(DhcpError::ReservedTag(opt.tag));
    }
    let mut ptr = 0;
    for opt in options {
        let len = u8::try_from(opt.data.len()).map_err(|_| DhcpError::OptionTooLong {
            tag: opt.tag,
            len: opt.data.len(),
        })?;
        let end = ptr + 2 + opt.data.len();
        if end > dst.len() {
            return Err(DhcpError::ShortBuffer {
                need: end,
                got: dst.len(),
            });
        }
        dst[ptr] = opt.tag;
        dst[ptr + 1] = len;
        dst[ptr + 2..end].copy_from_slice(opt.data);
        ptr = end;
    }
    Ok(ptr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{BOOTREQUEST, SIZE_DHCP_TOTAL};

    fn make_message(options: &[u8]) -> Vec<u8> {
        let mut pkt = vec![0u8; OPTIONS_OFFSET];
        pkt[0] = BOOTREQUEST;
        pkt[1] = 1;
        pkt[2] = 6;
        pkt[COOKIE_OFFSET..OPTIONS_OFFSET].copy_from_slice(&MAGIC_COOKIE);
        pkt.extend_from_slice(options);
        pkt
    }

    fn collect(buf: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, DhcpError> {
        let mut seen = Vec::new();
        parse(buf, |opt| {
            seen.push((opt.tag, opt.data.to_vec()));
            Ok(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_parse_discover_options() {
        let pkt = make_message(&[53, 1, 1, 55, 3, 1, 3, 6, 50, 4, 10, 0, 0, 7, 255]);
        let seen = collect(&pkt).unwrap();
        assert_eq!(
            seen,
            vec![
                (OPT_MSG_TYPE, vec![DHCPDISCOVER]),
                (OPT_PARAM_REQUEST, vec![1, 3, 6]),
                (OPT_REQUESTED_IP, vec![10, 0, 0, 7]),
            ]
        );
    }

    #[test]
    fn test_parse_stops_at_end_marker() {
        let pkt = make_message(&[53, 1, 3, 255, 54, 4, 1, 2, 3, 4]);
        assert_eq!(collect(&pkt).unwrap(), vec![(OPT_MSG_TYPE, vec![DHCPREQUEST])]);
    }

    #[test]
    fn test_parse_skips_pad() {
        let pkt = make_message(&[0, 0, 53, 1, 1, 0, 255]);
        assert_eq!(collect(&pkt).unwrap(), vec![(OPT_MSG_TYPE, vec![DHCPDISCOVER])]);
    }

    #[test]
    fn test_parse_truncated_option_stops_silently() {
        // Length runs past the end.
        let pkt = make_message(&[53, 1, 1, 50, 4, 10, 0]);
        assert_eq!(collect(&pkt).unwrap(), vec![(OPT_MSG_TYPE, vec![DHCPDISCOVER])]);
        // Length byte itself missing.
        let pkt = make_message(&[53, 1, 1, 50]);
        assert_eq!(collect(&pkt).unwrap(), vec![(OPT_MSG_TYPE, vec![DHCPDISCOVER])]);
    }

    #[test]
    fn test_parse_rejects_short() {
        assert!(matches!(collect(&[0u8; 20]), Err(DhcpError::TooShort(20))));
        assert!(matches!(collect(&[0u8; 100]), Err(DhcpError::MissingOptions)));
        assert!(matches!(collect(&make_message(&[])), Err(DhcpError::MissingOptions)));
    }

    #[test]
    fn test_parse_rejects_bad_cookie() {
        let mut pkt = make_message(&[53, 1, 1, 255]);
        pkt[COOKIE_OFFSET] = 0;
        assert!(matches!(collect(&pkt), Err(DhcpError::InvalidMagic)));
    }

    #[test]
    fn test_visit_error_aborts() {
        let pkt = make_message(&[53, 1, 1, 55, 1, 1, 255]);
        let mut calls = 0;
        let result = parse(&pkt, |_| {
            calls += 1;
            Err(DhcpError::MissingOptions)
        });
        assert!(matches!(result, Err(DhcpError::MissingOptions)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_parse_returns_header() {
        let mut pkt = make_message(&[255]);
        pkt[4..8].copy_from_slice(&0xdeadbeefu32.to_be_bytes());
        let hdr = parse(&pkt, |_| Ok(())).unwrap();
        assert_eq!(hdr.xid, 0xdeadbeef);
    }

    #[test]
    fn test_encode() {
        let opts = [
            DhcpOption::new(OPT_MSG_TYPE, &[DHCPOFFER]),
            DhcpOption::new(OPT_SERVER_ID, &[192, 168, 1, 1]),
        ];
        let mut buf = [0u8; 16];
        let n = encode(&mut buf, &opts).unwrap();
        assert_eq!(n, 9);
        assert_eq!(&buf[..n], &[53, 1, 2, 54, 4, 192, 168, 1, 1]);
    }

    #[test]
    fn test_encode_errors() {
        let mut buf = [0u8; 4];
        assert!(matches!(
            encode(&mut buf, &[DhcpOption::new(OPT_SERVER_ID, &[1, 2, 3, 4])]),
            Err(DhcpError::ShortBuffer { need: 6, got: 4 })
        ));
        let big = [0u8; 256];
        let mut buf = [0u8; SIZE_DHCP_TOTAL];
        assert!(matches!(
            encode(&mut buf, &[DhcpOption::new(12, &big)]),
            Err(DhcpError::OptionTooLong { tag: 12, len: 256 })
        ));
    }

    #[test]
    fn test_encode_rejects_reserved_tags() {
        let mut buf = [0xeeu8; 16];
        let opts = [
            DhcpOption::new(12, &[1, 2]),
            DhcpOption::new(OPT_PAD, &[53, 1, 7]),
        ];
        assert!(matches!(encode(&mut buf, &opts), Err(DhcpError::ReservedTag(OPT_PAD))));
        assert!(buf.iter().all(|&b| b == 0xee));

        let opts = [DhcpOption::new(OPT_END, &[1]), DhcpOption::new(12, &[1, 2])];
        assert!(matches!(encode(&mut buf, &opts), Err(DhcpError::ReservedTag(OPT_END))));
        assert!(buf.iter().all(|&b| b == 0xee));
    }

    #[test]
    fn test_option_accessors() {
        assert_eq!(
            DhcpOption::new(OPT_REQUESTED_IP, &[10, 0, 0, 5]).as_ipv4(),
            Some(Ipv4Addr::new(10, 0, 0, 5))
        );
        assert_eq!(DhcpOption::new(OPT_REQUESTED_IP, &[10, 0, 0]).as_ipv4(), None);
        assert_eq!(DhcpOption::new(OPT_MSG_TYPE, &[3]).as_u8(), Some(3));
        assert_eq!(DhcpOption::new(OPT_MSG_TYPE, &[3, 1]).as_u8(), None);
    }
}
