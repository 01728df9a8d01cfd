//! DHCP responder running as the handler of a UDP socket.
//!
//! The response is built in place: the received packet's headers are rewritten into
//! the reply's and serialized into the front of the output frame, with the DHCP
//! message right behind them.

use std::net::Ipv4Addr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use tn_stack::socket::Handler;
use tn_stack::transport::SIZE_UDP_HEADER;
use tn_stack::wire::{BROADCAST_MAC, ETHERTYPE_IPV4, IP_PROTO_UDP, SIZE_IPV4_HEADER};
use tn_stack::{PacketBuffer, UdpHeader, UdpPacket};

use crate::client_table::ClientTable;
use crate::config::{DhcpServerConfig, ServerSettings};
use crate::options::{
    self, DHCPDISCOVER, DHCPOFFER, DhcpOption, OPT_END, OPT_LEASE_TIME, OPT_MSG_TYPE,
    OPT_PARAM_REQUEST, OPT_REQUESTED_IP, OPT_ROUTER, OPT_SERVER_ID, OPT_SUBNET_MASK,
};
use crate::packet::{
    BOOTREPLY, COOKIE_OFFSET, DhcpError, MAGIC_COOKIE, OPTIONS_OFFSET, SIZE_DHCP_HEADER,
    SIZE_DHCP_TOTAL, mac_str,
};
use crate::state_machine::{self, Client, ClientState};

/// Offset of the DHCP message inside an outgoing frame.
pub const DHCP_OFFSET: usize = PacketBuffer::<UdpHeader>::HEADERS_SIZE;
/// Size of every frame the server writes.
pub const RESPONSE_SIZE: usize = DHCP_OFFSET + SIZE_DHCP_TOTAL;

const IP_HEADER_WORDS: u8 = 5;
const RESPONSE_TTL: u8 = 64;
/// Clients tested against this server fail the handshake with any other ToS.
const RESPONSE_TOS: u8 = 192;

/// Counters of what the server did with the messages it saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DhcpStats {
    pub offers: u64,
    pub acks: u64,
    /// Messages out of order for the client's state.
    pub dropped: u64,
    /// Messages addressed to another server.
    pub foreign: u64,
}

pub struct DhcpServer {
    settings: ServerSettings,
    clients: ClientTable,
    stats: DhcpStats,
    rng: StdRng,
}

impl DhcpServer {
    /// Server listening on `port`, answering as `mac` / `server_ip`, with defaults
    /// for everything else.
    pub fn new(port: u16, mac: [u8; 6], server_ip: Ipv4Addr) -> Self {
        Self::with_settings(ServerSettings {
            port,
            mac,
            server_ip,
            ..ServerSettings::default()
        })
    }

    pub fn from_config(config: &DhcpServerConfig) -> Result<Self, DhcpError> {
        Ok(Self::with_settings(config.validate()?))
    }

    pub fn with_settings(settings: ServerSettings) -> Self {
        Self {
            clients: ClientTable::new(settings.max_clients),
            settings,
            stats: DhcpStats::default(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seed the IP identifier generator, for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn port(&self) -> u16 {
        self.settings.port
    }

    pub fn client(&self, mac: &[u8; 6]) -> Option<&Client> {
        self.clients.get(mac)
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    pub fn stats(&self) -> DhcpStats {
        self.stats
    }

    /// Process the packet in the socket slot and write the reply frame into `dst`.
    ///
    /// Returns `Ok(0)` when there is nothing to send: no packet, a message for another
    /// server, or a message out of order for the client's state.
    pub fn respond(&mut self, dst: &mut [u8], packet: &mut UdpPacket) -> Result<usize, DhcpError> {
        if dst.len() < RESPONSE_SIZE {
            return Err(DhcpError::ShortBuffer {
                need: RESPONSE_SIZE,
                got: dst.len(),
            });
        }
        if !packet.has_packet() {
            return Ok(0);
        }
        let payload = packet.payload().unwrap_or_default();
        if payload.len() < SIZE_DHCP_HEADER {
            return Err(DhcpError::TooShort(payload.len()));
        }

        let mac = packet.eth.source;
        let mut client = self.clients.lookup(&mac);
        let mut msg_type = 0;
        let mut header = options::parse(payload, |opt| {
            match opt.tag {
                OPT_MSG_TYPE => {
                    if let Some(t) = opt.as_u8() {
                        msg_type = t;
                    }
                }
                OPT_PARAM_REQUEST => client.set_request_list(opt.data),
                OPT_REQUESTED_IP => {
                    if let Some(ip) = opt.as_ipv4() {
                        if client.state == ClientState::None {
                            client.assigned = ip;
                        }
                    }
                }
                _ => {}
            }
            Ok(())
        })?;

        if msg_type != DHCPDISCOVER && header.siaddr != self.settings.server_ip {
            debug!(
                "DHCP message {} from {} for server {}, ignoring",
                msg_type,
                mac_str(&mac),
                header.siaddr
            );
            self.stats.foreign += 1;
            return Ok(0);
        }

        let client_port = packet.transport.source_port;
        let reply_type = match state_machine::transition(
            &mut client,
            msg_type,
            client_port,
            self.settings.fallback_ip,
        ) {
            Ok(t) => t,
            Err(e) => {
                debug!("Dropping DHCP message from {}: {}", mac_str(&mac), e);
                self.stats.dropped += 1;
                return Ok(0);
            }
        };
        self.clients.commit(mac, client);

        if reply_type == DHCPOFFER {
            info!("DHCPOFFER {} to {}", client.assigned, mac_str(&mac));
            self.stats.offers += 1;
        } else {
            info!("DHCPACK {} to {}", client.assigned, mac_str(&mac));
            self.stats.acks += 1;
        }

        header.op = BOOTREPLY;
        header.hops = 0;
        header.secs = 0;
        header.yiaddr = client.assigned;
        header.siaddr = self.settings.server_ip;

        let message = &mut dst[DHCP_OFFSET..RESPONSE_SIZE];
        message.fill(0);
        header.put(message);
        message[COOKIE_OFFSET..OPTIONS_OFFSET].copy_from_slice(&MAGIC_COOKIE);

        let server_id = self.settings.server_ip.octets();
        let lease_time = self.settings.lease_time_secs.to_be_bytes();
        let netmask = self.settings.netmask.map(|m| m.octets());
        let router = self.settings.router.map(|r| r.octets());
        let reply_type = [reply_type];
        let mut opts = vec![
            DhcpOption::new(OPT_MSG_TYPE, &reply_type),
            DhcpOption::new(OPT_SERVER_ID, &server_id),
            DhcpOption::new(OPT_LEASE_TIME, &lease_time),
        ];
        if let Some(mask) = netmask.as_ref().filter(|_| client.requested(OPT_SUBNET_MASK)) {
            opts.push(DhcpOption::new(OPT_SUBNET_MASK, mask));
        }
        if let Some(gw) = router.as_ref().filter(|_| client.requested(OPT_ROUTER)) {
            opts.push(DhcpOption::new(OPT_ROUTER, gw));
        }
        // Leave room for the end marker.
        let area = &mut message[OPTIONS_OFFSET..SIZE_DHCP_TOTAL - 1];
        let written = options::encode(area, &opts)?;
        message[OPTIONS_OFFSET + written] = OPT_END;

        self.set_response_headers(packet, client.port, &dst[DHCP_OFFSET..RESPONSE_SIZE]);
        packet.write_headers(dst)?;
        Ok(RESPONSE_SIZE)
    }

    fn set_response_headers(&mut self, packet: &mut UdpPacket, client_port: u16, payload: &[u8]) {
        packet.eth.destination = BROADCAST_MAC;
        packet.eth.source = self.settings.mac;
        packet.eth.ether_type = ETHERTYPE_IPV4;

        let udp_length = (SIZE_UDP_HEADER + payload.len()) as u16;
        let ip = &mut packet.ip;
        ip.set_ihl(IP_HEADER_WORDS);
        ip.tos = RESPONSE_TOS;
        ip.total_length = (SIZE_IPV4_HEADER as u16) + udp_length;
        ip.id = self.rng.random();
        ip.flags = 0;
        ip.ttl = RESPONSE_TTL;
        ip.protocol = IP_PROTO_UDP;
        ip.source = self.settings.server_ip;
        ip.destination = Ipv4Addr::UNSPECIFIED;
        ip.checksum = ip.calculate_checksum();

        let udp = &mut packet.transport;
        udp.destination_port = client_port;
        udp.source_port = self.settings.port;
        udp.length = udp_length;
        udp.checksum = udp.calculate_checksum_ipv4(&packet.ip, payload);
    }
}

impl Handler<UdpHeader> for DhcpServer {
    fn handle(&mut self, dst: &mut [u8], packet: &mut UdpPacket) -> anyhow::Result<usize> {
        Ok(self.respond(dst, packet)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tn_stack::SlotState;

    fn server() -> DhcpServer {
        DhcpServer::new(67, [2, 0, 0, 0, 0, 1], Ipv4Addr::new(192, 168, 1, 1)).with_seed(1)
    }

    #[test]
    fn test_response_size() {
        assert_eq!(DHCP_OFFSET, 42);
        assert_eq!(RESPONSE_SIZE, 590);
    }

    #[test]
    fn test_short_destination() {
        let mut srv = server();
        let mut packet = UdpPacket::new();
        let mut dst = [0u8; RESPONSE_SIZE - 1];
        assert!(matches!(
            srv.respond(&mut dst, &mut packet),
            Err(DhcpError::ShortBuffer { need: 590, got: 589 })
        ));
    }

    #[test]
    fn test_forced_trigger_sends_nothing() {
        let mut srv = server();
        let mut packet = UdpPacket::new();
        packet.slot = SlotState::Forced;
        let mut dst = [0u8; RESPONSE_SIZE];
        assert_eq!(srv.respond(&mut dst, &mut packet).unwrap(), 0);
        assert!(dst.iter().all(|&b| b == 0));
        assert!(srv.clients().is_empty());
    }

    #[test]
    fn test_new_uses_defaults() {
        let srv = server();
        assert_eq!(srv.port(), 67);
        assert_eq!(srv.settings().fallback_ip, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(srv.settings().lease_time_secs, 86400);
        assert_eq!(srv.stats(), DhcpStats::default());
    }

    #[test]
    fn test_new_matches_default_config() {
        let from_config = DhcpServer::from_config(&DhcpServerConfig::default()).unwrap();
        let direct = DhcpServer::new(67, [2, 0, 0, 0, 0, 1], Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(direct.settings(), from_config.settings());
    }

    #[test]
    fn test_from_config_rejects_bad_mac() {
        let config = DhcpServerConfig {
            server_mac: "nope".to_string(),
            ..Default::default()
        };
        assert!(matches!(DhcpServer::from_config(&config), Err(DhcpError::InvalidConfig(_))));
    }
}
