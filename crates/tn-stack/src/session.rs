//! Per-socket protocol logic run on a received packet before its handler is invoked.

use crate::error::StackError;
use crate::packet::PacketBuffer;
use crate::transport::{Segment, TcpHeader, TransportHeader, UdpHeader};

/// Consumes a received packet and reports whether a response is ready to be written.
pub trait Session<T: TransportHeader> {
    fn recv(&mut self, packet: &PacketBuffer<T>) -> Result<bool, StackError>;
}

/// TCP sequence/window engine for one connection.
pub trait ControlBlock {
    /// Feeds an incoming segment. An error means the segment was rejected.
    fn recv(&mut self, segment: &Segment) -> Result<(), StackError>;

    /// Segment the control block wants to send, if any, carrying `payload_len` bytes.
    fn pending_segment(&self, payload_len: usize) -> Option<Segment>;
}

impl<C: ControlBlock> Session<TcpHeader> for C {
    fn recv(&mut self, packet: &PacketBuffer<TcpHeader>) -> Result<bool, StackError> {
        let payload_len = packet.payload().map_or(0, <[u8]>::len);
        let incoming = packet.transport.segment(payload_len);
        ControlBlock::recv(self, &incoming)?;
        Ok(self.pending_segment(0).is_some())
    }
}

/// UDP has no connection state: every datagram is handed to the handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Datagram;

impl Session<UdpHeader> for Datagram {
    fn recv(&mut self, _packet: &PacketBuffer<UdpHeader>) -> Result<bool, StackError> {
        Ok(true)
    }
}
