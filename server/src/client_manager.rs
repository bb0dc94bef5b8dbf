//! Client connection management and owner-update queuing for the server
//!
//! This module handles the server-side bookkeeping for connected clients, including:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - The player entity each client owns and may write to
//! - Buffering owner updates so they are applied in sequence order
//! - Acknowledgement tracking so clients know which updates have landed
//!
//! The client manager is the server's answer to "who sent this packet and what are
//! they allowed to touch".

use log::info;
use shared::entity::EntityId;
use shared::protocol::OwnerState;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One owner-writable state update waiting for the next tick
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub sequence: u32,
    pub timestamp: u64,
    pub state: OwnerState,
}

/// Represents a connected client and their queued updates
///
/// Each client maintains:
/// - Connection metadata (ID, address, last activity)
/// - The player entity it owns once spawned
/// - Acknowledgement tracking for processed updates
/// - Buffered updates waiting for processing in sequence order
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Player entity owned by this client
    pub entity: Option<EntityId>,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Highest update sequence number we've applied
    pub last_processed: u32,
    /// Buffered updates waiting to be applied
    pub pending_updates: Vec<PendingUpdate>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            entity: None,
            last_seen: Instant::now(),
            last_processed: 0,
            pending_updates: Vec::new(),
        }
    }

    /// Queues an update, keeping the buffer in sequence order
    ///
    /// Updates older than the last processed one are stale and dropped, as are
    /// duplicates of a sequence already queued.
    pub fn add_update(&mut self, update: PendingUpdate) -> bool {
        self.last_seen = Instant::now();
        if update.sequence <= self.last_processed
            || self
                .pending_updates
                .iter()
                .any(|pending| pending.sequence == update.sequence)
        {
            return false;
        }
        self.pending_updates.push(update);
        self.pending_updates.sort_by_key(|pending| pending.sequence);
        true
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients and their owner updates
///
/// The ClientManager enforces the server's capacity limit, maps addresses to
/// clients and clients to the entities they own, and hands queued updates to the
/// simulation one tick at a time.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a client, returning the entity it owned
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Option<EntityId>> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client.entity)
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Records the player entity a client owns
    pub fn assign_entity(&mut self, client_id: u32, entity: EntityId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.entity = Some(entity);
                true
            }
            None => false,
        }
    }

    pub fn entity_of(&self, client_id: u32) -> Option<EntityId> {
        self.clients.get(&client_id).and_then(|client| client.entity)
    }

    /// Whether `client_id` may write the owner fields of `entity`
    pub fn owns(&self, client_id: u32, entity: EntityId) -> bool {
        self.entity_of(client_id) == Some(entity)
    }

    /// Marks any packet from the client as proof of life
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Buffers an owner update. Returns false for unknown clients and stale updates.
    pub fn add_update(&mut self, client_id: u32, update: PendingUpdate) -> bool {
        self.clients
            .get_mut(&client_id)
            .map_or(false, |client| client.add_update(update))
    }

    /// Drains every queued update, each client's in sequence order
    ///
    /// Updates from different clients touch different entities, so only the
    /// per-client order matters. The result is sorted by timestamp for
    /// reproducible application order.
    pub fn take_pending_updates(&mut self) -> Vec<(u32, PendingUpdate)> {
        let mut all_updates = Vec::new();
        for (client_id, client) in self.clients.iter_mut() {
            for update in client.pending_updates.drain(..) {
                client.last_processed = client.last_processed.max(update.sequence);
                all_updates.push((*client_id, update));
            }
        }
        all_updates
            .sort_by_key(|(client_id, update)| (update.timestamp, *client_id, update.sequence));
        all_updates
    }

    /// Highest applied update sequence per client, sent back in snapshots
    pub fn get_last_processed(&self) -> HashMap<u32, u32> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.last_processed))
            .collect()
    }

    /// Removes clients silent for longer than `timeout`
    ///
    /// Returns the removed client IDs with the entities they owned so the world
    /// can despawn them.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<(u32, Option<EntityId>)> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|client_id| {
                self.remove_client(&client_id)
                    .map(|entity| (client_id, entity))
            })
            .collect()
    }

    /// All client IDs and their addresses, for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
