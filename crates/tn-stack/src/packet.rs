//! Fixed-capacity packet buffer shared by the receive and transmit paths.
//!
//! A [`PacketBuffer`] holds the decoded fixed headers of one frame plus a data region
//! sized to the MTU minus those headers. The same storage is reused in place to build
//! the response, so handlers mutate the headers and then call
//! [`PacketBuffer::write_headers`].

use std::fmt;
use std::time::Instant;

use crate::error::StackError;
use crate::geometry::{self, HeaderGeometry};
use crate::transport::TransportHeader;
use crate::wire::{
    ETHERTYPE_IPV4, EthernetHeader, Ipv4Header, SIZE_ETHERNET_HEADER, SIZE_IPV4_HEADER,
};

/// Largest frame handled by the stack, Ethernet header included.
pub const MTU: usize = 1500;

/// What the single slot of a packet buffer currently represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Empty,
    /// A real frame decoded at the given instant.
    Received { at: Instant },
    /// Synthetic trigger asking the handler to send without having received anything.
    Forced,
}

pub struct PacketBuffer<T> {
    pub slot: SlotState,
    pub eth: EthernetHeader,
    pub ip: Ipv4Header,
    pub transport: T,
    /// IP options, transport options and payload, in that order.
    data: Box<[u8]>,
}

impl<T: TransportHeader> PacketBuffer<T> {
    /// Size of the Ethernet, IPv4 and transport fixed headers together.
    pub const HEADERS_SIZE: usize = SIZE_ETHERNET_HEADER + SIZE_IPV4_HEADER + T::SIZE;
    /// Capacity of the data region.
    pub const CAPACITY: usize = MTU - Self::HEADERS_SIZE;

    pub fn new() -> Self {
        Self {
            slot: SlotState::Empty,
            eth: EthernetHeader::default(),
            ip: Ipv4Header::default(),
            transport: T::default(),
            data: vec![0u8; Self::CAPACITY].into_boxed_slice(),
        }
    }

    /// True if the slot holds a real received frame (not empty, not forced).
    pub fn has_packet(&self) -> bool {
        matches!(self.slot, SlotState::Received { .. })
    }

    pub fn received_at(&self) -> Option<Instant> {
        match self.slot {
            SlotState::Received { at } => Some(at),
            _ => None,
        }
    }

    /// Layout of the data region according to the current headers.
    pub fn geometry(&self) -> Option<HeaderGeometry> {
        geometry::resolve(
            self.ip.ihl(),
            self.transport.offset_in_bytes(),
            T::SIZE,
            self.ip.total_length,
            self.data.len(),
        )
    }

    /// Transport payload, or `None` with no real packet or bad header values.
    pub fn payload(&self) -> Option<&[u8]> {
        self.view(HeaderGeometry::payload)
    }

    pub fn transport_options(&self) -> Option<&[u8]> {
        self.view(HeaderGeometry::transport_options)
    }

    pub fn ip_options(&self) -> Option<&[u8]> {
        self.view(HeaderGeometry::ip_options)
    }

    fn view(&self, range: fn(&HeaderGeometry) -> std::ops::Range<usize>) -> Option<&[u8]> {
        if !self.has_packet() {
            return None;
        }
        let geometry = self.geometry()?;
        self.data.get(range(&geometry))
    }

    /// Raw data region, regardless of slot state.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decodes a raw Ethernet frame into this buffer and marks it received at `at`.
    ///
    /// Bytes past the frame are zeroed so a lying total-length field cannot expose
    /// leftovers from an earlier frame.
    pub fn decode(&mut self, frame: &[u8], at: Instant) -> Result<(), StackError> {
        if frame.len() < Self::HEADERS_SIZE {
            return Err(StackError::ShortFrame(frame.len()));
        }
        let eth = EthernetHeader::decode(frame)?;
        if eth.ether_type != ETHERTYPE_IPV4 {
            return Err(StackError::EtherType(eth.ether_type));
        }
        let ip = Ipv4Header::decode(&frame[SIZE_ETHERNET_HEADER..])?;
        if ip.protocol != T::PROTOCOL {
            return Err(StackError::Protocol(ip.protocol));
        }
        let transport = T::decode(&frame[SIZE_ETHERNET_HEADER + SIZE_IPV4_HEADER..])?;

        let rest = &frame[Self::HEADERS_SIZE..];
        if rest.len() > self.data.len() {
            return Err(StackError::ShortBuffer {
                need: rest.len(),
                got: self.data.len(),
            });
        }
        self.data[..rest.len()].copy_from_slice(rest);
        self.data[rest.len()..].fill(0);

        self.eth = eth;
        self.ip = ip;
        self.transport = transport;
        self.slot = SlotState::Received { at };
        Ok(())
    }

    /// Writes the Ethernet, IPv4 and transport fixed headers into `dst`. Options are
    /// not written. Returns the number of bytes written.
    pub fn write_headers(&self, dst: &mut [u8]) -> Result<usize, StackError> {
        if dst.len() < Self::HEADERS_SIZE {
            return Err(StackError::ShortBuffer {
                need: Self::HEADERS_SIZE,
                got: dst.len(),
            });
        }
        self.eth.put(dst);
        self.ip.put(&mut dst[SIZE_ETHERNET_HEADER..]);
        self.transport.put(&mut dst[SIZE_ETHERNET_HEADER + SIZE_IPV4_HEADER..]);
        Ok(Self::HEADERS_SIZE)
    }

    /// Like [`write_headers`](Self::write_headers) but including IP and transport options.
    pub fn write_headers_with_options(&self, dst: &mut [u8]) -> Result<usize, StackError> {
        if dst.len() < Self::HEADERS_SIZE {
            return Err(StackError::ShortBuffer {
                need: Self::HEADERS_SIZE,
                got: dst.len(),
            });
        }
        Err(StackError::Unsupported("writing header options"))
    }
}

impl<T: TransportHeader> Default for PacketBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TransportHeader> fmt::Display for PacketBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x?} -> {:02x?} {} -> {} proto={} ports {} -> {}",
            self.eth.source,
            self.eth.destination,
            self.ip.source,
            self.ip.destination,
            self.ip.protocol,
            self.transport.source_port(),
            self.transport.destination_port(),
        )?;
        match self.payload() {
            Some(payload) => write!(f, " payload={}B", payload.len()),
            None => write!(f, " payload=none"),
        }
    }
}

impl<T: TransportHeader> fmt::Debug for PacketBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("slot", &self.slot)
            .field("eth", &self.eth)
            .field("ip", &self.ip)
            .field("transport", &self.transport)
            .field("capacity", &self.data.len())
            .finish()
    }
}
