//! Offsets of IP options, transport options and payload inside a packet's data region.
//!
//! The data region starts right after the fixed IPv4 and transport headers and holds,
//! in order, IP options, transport options and payload. All inputs come straight from
//! untrusted header fields, so [`resolve`] works in wide signed arithmetic and never
//! indexes anything.

use crate::wire::SIZE_IPV4_HEADER;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderGeometry {
    pub options_start: usize,
    pub payload_start: usize,
    pub payload_end: usize,
}

impl HeaderGeometry {
    pub fn ip_options(&self) -> std::ops::Range<usize> {
        0..self.options_start
    }

    pub fn transport_options(&self) -> std::ops::Range<usize> {
        self.options_start..self.payload_start
    }

    pub fn payload(&self) -> std::ops::Range<usize> {
        self.payload_start..self.payload_end
    }
}

/// Resolves the data region layout, or `None` if the header fields are inconsistent
/// with each other or with `capacity`.
///
/// * `ihl`: IPv4 header length in 32-bit words.
/// * `transport_offset`: transport header length in bytes, options included.
/// * `transport_size`: fixed transport header size.
/// * `total_length`: IPv4 total length.
pub fn resolve(
    ihl: u8,
    transport_offset: usize,
    transport_size: usize,
    total_length: u16,
    capacity: usize,
) -> Option<HeaderGeometry> {
    let ip_size = SIZE_IPV4_HEADER as i128;
    let transport_size = transport_size as i128;

    let options_start = 4 * ihl as i128 - ip_size;
    let payload_start = options_start + transport_offset as i128 - transport_size;
    let payload_end = total_length as i128 - options_start - transport_size - ip_size;

    if options_start < 0
        || payload_start < options_start
        || payload_end < payload_start
        || payload_end > capacity as i128
    {
        return None;
    }

    Some(HeaderGeometry {
        options_start: options_start as usize,
        payload_start: payload_start as usize,
        payload_end: payload_end as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{SIZE_TCP_HEADER, SIZE_UDP_HEADER};

    #[test]
    fn test_plain_tcp_segment() {
        // 20 IP + 20 TCP + 100 payload, no options.
        let g = resolve(5, 20, SIZE_TCP_HEADER, 140, 1446).unwrap();
        assert_eq!(g, HeaderGeometry { options_start: 0, payload_start: 0, payload_end: 100 });
        assert!(g.ip_options().is_empty());
        assert!(g.transport_options().is_empty());
        assert_eq!(g.payload().len(), 100);
    }

    #[test]
    fn test_tcp_options() {
        // MSS + window scale etc: 12 bytes of TCP options.
        let g = resolve(5, 32, SIZE_TCP_HEADER, 52 + 10, 1446).unwrap();
        assert_eq!(g.options_start, 0);
        assert_eq!(g.payload_start, 12);
        assert_eq!(g.payload_end, 22);
    }

    #[test]
    fn test_ip_options_shift_everything() {
        let g = resolve(6, 20, SIZE_TCP_HEADER, 80, 1446).unwrap();
        assert_eq!(g.options_start, 4);
        assert_eq!(g.payload_start, 4);
        assert_eq!(g.payload_end, 36);
    }

    #[test]
    fn test_udp() {
        let g = resolve(5, SIZE_UDP_HEADER, SIZE_UDP_HEADER, 28 + 548, 1458).unwrap();
        assert_eq!(g.payload(), 0..548);
    }

    #[test]
    fn test_invalid_ihl() {
        assert!(resolve(0, 20, SIZE_TCP_HEADER, 40, 1446).is_none());
        assert!(resolve(4, 20, SIZE_TCP_HEADER, 40, 1446).is_none());
    }

    #[test]
    fn test_invalid_data_offset() {
        assert!(resolve(5, 16, SIZE_TCP_HEADER, 40, 1446).is_none());
        assert!(resolve(5, 0, SIZE_TCP_HEADER, 40, 1446).is_none());
    }

    #[test]
    fn test_total_length_too_small() {
        assert!(resolve(5, 20, SIZE_TCP_HEADER, 39, 1446).is_none());
        // Options announced but total length leaves no room for them.
        assert!(resolve(5, 60, SIZE_TCP_HEADER, 50, 1446).is_none());
    }

    #[test]
    fn test_payload_beyond_capacity() {
        assert!(resolve(5, 20, SIZE_TCP_HEADER, 40 + 101, 100).is_none());
        assert!(resolve(5, 20, SIZE_TCP_HEADER, 40 + 100, 100).is_some());
        assert!(resolve(15, 60, SIZE_TCP_HEADER, u16::MAX, 0).is_none());
    }
}
