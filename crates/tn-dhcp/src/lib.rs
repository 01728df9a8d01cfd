//! DHCP lease negotiation on top of the `tn-stack` socket and packet buffer model.
//!
//! [`DhcpServer`] is a [`Handler`](tn_stack::Handler) for a UDP socket: each
//! dispatch parses the DHCP message in the socket slot, advances the per-client
//! state machine and writes the complete reply frame into the output buffer.

pub mod client_table;
pub mod config;
pub mod options;
pub mod packet;
pub mod server;
pub mod state_machine;

pub use client_table::ClientTable;
pub use config::{DhcpServerConfig, ServerSettings};
pub use options::DhcpOption;
pub use packet::{DhcpError, DhcpHeader};
pub use server::{DhcpServer, DhcpStats};
pub use state_machine::{Client, ClientState};
