//! Single-slot socket binding a port to a handler.
//!
//! A socket holds exactly one [`PacketBuffer`]. While that slot is pending (a real frame
//! or a forced trigger), further frames are refused with [`StackError::Busy`] and the
//! caller decides whether to drop or stall. "Pending" and "full" are the same condition.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::StackError;
use crate::packet::{PacketBuffer, SlotState};
use crate::session::Session;
use crate::transport::TransportHeader;

/// Produces the bytes a socket sends.
///
/// `dst` is the whole outgoing frame. `packet` is the socket's slot: the received
/// frame when there is one, otherwise a buffer whose headers the handler may fill to
/// build an unsolicited frame. Returning `Ok(0)` means there is nothing to send.
pub trait Handler<T> {
    fn handle(&mut self, dst: &mut [u8], packet: &mut PacketBuffer<T>) -> anyhow::Result<usize>;
}

pub struct Socket<T, S, H> {
    port: u16,
    handler: Option<H>,
    session: S,
    packet: PacketBuffer<T>,
    last_received: Option<Instant>,
}

impl<T, S, H> Socket<T, S, H>
where
    T: TransportHeader,
    S: Session<T>,
    H: Handler<T>,
{
    /// A closed socket using `session` once opened.
    pub fn new(session: S) -> Self {
        Self {
            port: 0,
            handler: None,
            session,
            packet: PacketBuffer::new(),
            last_received: None,
        }
    }

    /// Binds `port` to `handler`. Any pending slot is discarded.
    ///
    /// # Panics
    /// If `port` is zero.
    pub fn open(&mut self, port: u16, handler: H) {
        if port == 0 {
            panic!("cannot open socket on port 0");
        }
        self.handler = Some(handler);
        self.port = port;
        self.packet.slot = SlotState::Empty;
    }

    /// Closes the socket, handing back its handler. Buffer contents are left as they are.
    pub fn close(&mut self) -> Option<H> {
        self.port = 0;
        self.handler.take()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_open(&self) -> bool {
        self.port != 0
    }

    pub fn last_received(&self) -> Option<Instant> {
        self.last_received
    }

    pub fn packet(&self) -> &PacketBuffer<T> {
        &self.packet
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut H> {
        self.handler.as_mut()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// True if a real frame or a forced trigger waits in the slot.
    pub fn is_pending_handling(&self) -> bool {
        self.port != 0 && self.packet.slot != SlotState::Empty
    }

    /// True if the socket must be dispatched before it can admit another frame.
    pub fn needs_handling(&self) -> bool {
        self.is_pending_handling()
    }

    /// Requests a handler invocation without a received frame. Returns false if the
    /// socket is closed or something is already pending.
    pub fn mark_pending_handling(&mut self) -> bool {
        if !self.is_open() || self.is_pending_handling() {
            return false;
        }
        self.packet.slot = SlotState::Forced;
        true
    }

    /// Decodes `frame` into the slot.
    pub fn receive(&mut self, frame: &[u8], at: Instant) -> Result<(), StackError> {
        if !self.is_open() {
            return Err(StackError::Closed);
        }
        if self.needs_handling() {
            warn!("Dropping frame on port {}: packet already pending", self.port);
            return Err(StackError::Busy(self.port));
        }
        self.packet.decode(frame, at)?;
        let dst_port = self.packet.transport.destination_port();
        if dst_port != self.port {
            self.packet.slot = SlotState::Empty;
            return Err(StackError::PortMismatch {
                want: self.port,
                got: dst_port,
            });
        }
        self.last_received = Some(at);
        Ok(())
    }

    /// Runs the socket once, writing any response into `dst`.
    ///
    /// With a received frame, the session decides whether the handler runs. With an
    /// empty or forced slot the handler always runs. The slot is emptied afterwards
    /// whatever the outcome, so a frame is never handled twice.
    ///
    /// # Panics
    /// If the socket has no handler (never opened or closed).
    pub fn dispatch(&mut self, dst: &mut [u8]) -> Result<usize, StackError> {
        let port = self.port;
        let Some(handler) = self.handler.as_mut() else {
            panic!("nil handler on port {port}");
        };

        let result = if self.packet.has_packet() {
            match self.session.recv(&self.packet) {
                Ok(true) => handler.handle(dst, &mut self.packet).map_err(StackError::from),
                Ok(false) => Ok(0),
                Err(e) => {
                    debug!("Session on port {} rejected packet: {}", port, e);
                    Err(e)
                }
            }
        } else {
            handler.handle(dst, &mut self.packet).map_err(StackError::from)
        };

        self.packet.slot = SlotState::Empty;
        result
    }
}
