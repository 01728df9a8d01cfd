use std::collections::HashMap;

use tracing::warn;

use crate::packet::mac_str;
use crate::state_machine::Client;

struct Entry {
    client: Client,
    last_seen: u64,
}

/// Clients keyed by hardware address, bounded to `capacity` entries.
///
/// Inserting a new address into a full table evicts the least recently seen client.
pub struct ClientTable {
    clients: HashMap<[u8; 6], Entry>,
    capacity: usize,
    tick: u64,
}

impl ClientTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            clients: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    pub fn get(&self, mac: &[u8; 6]) -> Option<&Client> {
        self.clients.get(mac).map(|e| &e.client)
    }

    /// Copy of the stored record, or a fresh one for an unseen address.
    pub fn lookup(&self, mac: &[u8; 6]) -> Client {
        self.get(mac).copied().unwrap_or_default()
    }

    /// Store `client` for `mac` and mark it as the most recently seen.
    pub fn commit(&mut self, mac: [u8; 6], client: Client) {
        self.tick += 1;
        if !self.clients.contains_key(&mac) && self.clients.len() >= self.capacity {
            if let Some(oldest) = self
                .clients
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(k, _)| *k)
            {
                warn!("Client table full, evicting {}", mac_str(&oldest));
                self.clients.remove(&oldest);
            }
        }
        self.clients.insert(
            mac,
            Entry {
                client,
                last_seen: self.tick,
            },
        );
    }

    pub fn remove(&mut self, mac: &[u8; 6]) -> Option<Client> {
        self.clients.remove(mac).map(|e| e.client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8; 6], &Client)> {
        self.clients.iter().map(|(k, e)| (k, &e.client))
    }
}
