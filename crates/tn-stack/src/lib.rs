pub mod error;
pub mod geometry;
pub mod packet;
pub mod session;
pub mod socket;
pub mod transport;
pub mod wire;

pub use error::StackError;
pub use geometry::HeaderGeometry;
pub use packet::{MTU, PacketBuffer, SlotState};
pub use session::{ControlBlock, Datagram, Session};
pub use socket::{Handler, Socket};
pub use transport::{Segment, TcpHeader, TransportHeader, UdpHeader};
pub use wire::{EthernetHeader, Ipv4Header};

pub type TcpPacket = PacketBuffer<TcpHeader>;
pub type UdpPacket = PacketBuffer<UdpHeader>;
