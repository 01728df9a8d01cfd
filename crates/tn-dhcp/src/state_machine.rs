use std::net::Ipv4Addr;

use crate::options::{DHCPACK, DHCPDISCOVER, DHCPOFFER, DHCPREQUEST};
use crate::packet::DhcpError;

/// Maximum number of parameter request list entries remembered per client.
pub const REQUEST_LIST_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientState {
    #[default]
    None,
    WaitingForOffer,
}

impl ClientState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientState::None => "None",
            ClientState::WaitingForOffer => "WaitingForOffer",
        }
    }
}

/// What the server remembers about one client hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Client {
    /// UNSPECIFIED until an address has been requested or assigned.
    pub assigned: Ipv4Addr,
    pub state: ClientState,
    /// UDP port replies are sent to.
    pub port: u16,
    pub(crate) request_list: [u8; REQUEST_LIST_LEN],
    pub(crate) request_len: u8,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            assigned: Ipv4Addr::UNSPECIFIED,
            state: ClientState::None,
            port: 0,
            request_list: [0; REQUEST_LIST_LEN],
            request_len: 0,
        }
    }
}

impl Client {
    /// Option tags the client asked for in its last parameter request list.
    pub fn request_list(&self) -> &[u8] {
        &self.request_list[..self.request_len as usize]
    }

    /// Replaces the parameter request list, keeping at most the first ten tags.
    pub fn set_request_list(&mut self, tags: &[u8]) {
        let len = tags.len().min(REQUEST_LIST_LEN);
        self.request_list = [0; REQUEST_LIST_LEN];
        self.request_list[..len].copy_from_slice(&tags[..len]);
        self.request_len = len as u8;
    }

    pub fn requested(&self, tag: u8) -> bool {
        self.request_list().contains(&tag)
    }
}

/// Advance `client` on an incoming message and return the message type to reply with.
///
/// * DISCOVER in `None`: assigns the requested address, or `fallback` when none was
///   requested, remembers `client_port` and moves to `WaitingForOffer`. Replies OFFER.
/// * REQUEST in `WaitingForOffer`: replies ACK and stays put, so renewals keep working.
///
/// Anything else is [`DhcpError::UnexpectedMessage`] and leaves `client` unchanged.
pub fn transition(
    client: &mut Client,
    msg_type: u8,
    client_port: u16,
    fallback: Ipv4Addr,
) -> Result<u8, DhcpError> {
    match (msg_type, client.state) {
        (DHCPDISCOVER, ClientState::None) => {
            if client.assigned.is_unspecified() {
                client.assigned = fallback;
            }
            client.port = client_port;
            client.state = ClientState::WaitingForOffer;
            Ok(DHCPOFFER)
        }
        (DHCPREQUEST, ClientState::WaitingForOffer) => Ok(DHCPACK),
        (msg_type, state) => Err(DhcpError::UnexpectedMessage {
            msg_type,
            state: state.as_str(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);

    #[test]
    fn test_discover_assigns_fallback() {
        let mut client = Client::default();
        assert_eq!(transition(&mut client, DHCPDISCOVER, 68, FALLBACK).unwrap(), DHCPOFFER);
        assert_eq!(client.assigned, FALLBACK);
        assert_eq!(client.port, 68);
        assert_eq!(client.state, ClientState::WaitingForOffer);
    }

    #[test]
    fn test_discover_keeps_requested() {
        let mut client = Client {
            assigned: Ipv4Addr::new(192, 168, 1, 50),
            ..Default::default()
        };
        transition(&mut client, DHCPDISCOVER, 68, FALLBACK).unwrap();
        assert_eq!(client.assigned, Ipv4Addr::new(192, 168, 1, 50));
    }

    #[test]
    fn test_request_after_discover() {
        let mut client = Client::default();
        transition(&mut client, DHCPDISCOVER, 68, FALLBACK).unwrap();
        assert_eq!(transition(&mut client, DHCPREQUEST, 68, FALLBACK).unwrap(), DHCPACK);
        assert_eq!(client.state, ClientState::WaitingForOffer);
        // Renewal: a second request is acknowledged again.
        assert_eq!(transition(&mut client, DHCPREQUEST, 68, FALLBACK).unwrap(), DHCPACK);
    }

    #[test]
    fn test_request_before_discover() {
        let mut client = Client::default();
        let err = transition(&mut client, DHCPREQUEST, 68, FALLBACK).unwrap_err();
        assert!(matches!(err, DhcpError::UnexpectedMessage { msg_type: DHCPREQUEST, state: "None" }));
        assert_eq!(client, Client::default());
    }

    #[test]
    fn test_repeated_discover_rejected() {
        let mut client = Client::default();
        transition(&mut client, DHCPDISCOVER, 68, FALLBACK).unwrap();
        let before = client;
        assert!(transition(&mut client, DHCPDISCOVER, 68, FALLBACK).is_err());
        assert_eq!(client, before);
    }

    #[test]
    fn test_unknown_message_type() {
        let mut client = Client::default();
        assert!(transition(&mut client, 0, 68, FALLBACK).is_err());
        assert!(transition(&mut client, 7, 68, FALLBACK).is_err());
    }

    #[test]
    fn test_request_list_truncated() {
        let mut client = Client::default();
        client.set_request_list(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(client.request_list(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        client.set_request_list(&[3]);
        assert_eq!(client.request_list(), &[3]);
        assert!(client.requested(3));
        assert!(!client.requested(1));
    }
}
